//! Analytical store access.
//!
//! # Data Flow
//! ```text
//! startup:  ping → count_tables → column_types → execute(DDL)
//! request:  begin → insert_row → commit | rollback
//! ```
//!
//! # Design Decisions
//! - One shared handle per process, `Send + Sync`, cloned via `Arc`
//! - Each write gets its own transaction so concurrent requests never share
//!   store-side state
//! - Row values travel separately from statement text

use async_trait::async_trait;

use crate::schema::descriptor::Cell;

pub mod clickhouse;
pub mod error;
pub mod memory;

pub use clickhouse::ClickHouseStore;
pub use error::{ServerException, StoreError, StoreResult};
pub use memory::MemoryStore;

/// Connection handle to the analytical store.
#[async_trait]
pub trait AnalyticsStore: Send + Sync {
    /// Round-trip liveness and credentials probe.
    async fn ping(&self) -> StoreResult<()>;

    /// Number of tables named `table` in the connected database.
    async fn count_tables(&self, table: &str) -> StoreResult<u64>;

    /// `(name, type)` pairs for every column of `table`.
    async fn column_types(&self, table: &str) -> StoreResult<Vec<(String, String)>>;

    /// Execute a statement that returns no rows.
    async fn execute(&self, statement: &str) -> StoreResult<()>;

    /// Open a transaction.
    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>>;

    /// Release the handle. Later calls fail with [`StoreError::Closed`].
    async fn close(&self) -> StoreResult<()>;
}

/// An open transaction. Consumed by `commit` or `rollback`.
#[async_trait]
pub trait StoreTransaction: Send {
    /// Insert one row into `table`.
    async fn insert_row(&mut self, table: &str, row: &[Cell<'_>]) -> StoreResult<()>;

    async fn commit(self: Box<Self>) -> StoreResult<()>;

    async fn rollback(self: Box<Self>) -> StoreResult<()>;
}
