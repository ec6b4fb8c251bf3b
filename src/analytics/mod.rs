//! The analytics component: one store handle bound to one table.
//!
//! # Startup
//! ```text
//! ping ──fail──▶ Connect error
//!   │
//!   ▼ verify_schema?
//! verify ──Mismatched──▶ SchemaMismatch error
//!   │  └──Matching──▶ ready (provisioning skipped)
//!   ▼ Absent
//! create_if_missing? ──▶ CREATE TABLE IF NOT EXISTS ──fail──▶ Provision error
//!   │
//!   ▼
//! ready
//! ```

use std::sync::Arc;

use crate::config::StoreConfig;
use crate::error::AnalyticsError;
use crate::schema::{ensure_table, verify_schema, SchemaStatus};
use crate::store::{AnalyticsStore, ClickHouseStore, StoreResult};

mod writer;

/// Shared handle used by the middleware. Cloning shares the connection.
#[derive(Clone)]
pub struct Analytics {
    store: Arc<dyn AnalyticsStore>,
    table: Arc<str>,
}

impl std::fmt::Debug for Analytics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analytics").field("table", &self.table).finish_non_exhaustive()
    }
}

impl Analytics {
    /// Connect to ClickHouse with `config` and run the startup sequence.
    pub async fn connect(config: &StoreConfig) -> Result<Self, AnalyticsError> {
        let store = ClickHouseStore::new(config).map_err(AnalyticsError::Connect)?;
        tracing::info!(
            endpoint = %store.endpoint(),
            database = %config.database,
            table = %config.table,
            "Connecting to analytics store"
        );
        Self::init(
            Arc::new(store),
            &config.table,
            config.verify_schema,
            config.create_table_if_missing,
        )
        .await
    }

    /// Run the startup sequence against an already-built store handle.
    pub async fn init(
        store: Arc<dyn AnalyticsStore>,
        table: &str,
        verify: bool,
        create_if_missing: bool,
    ) -> Result<Self, AnalyticsError> {
        store.ping().await.map_err(|e| {
            tracing::error!(error = %e, "Analytics store liveness probe failed");
            AnalyticsError::Connect(e)
        })?;
        tracing::info!("Analytics store reachable");

        let analytics = Self {
            store,
            table: Arc::from(table),
        };

        if verify {
            let status = verify_schema(analytics.store.as_ref(), table)
                .await
                .map_err(|source| AnalyticsError::Metadata {
                    table: table.to_string(),
                    source,
                })?;
            match status {
                SchemaStatus::Matching => {
                    tracing::info!(table = %table, "Existing table matches fingerprint schema");
                    return Ok(analytics);
                }
                SchemaStatus::Mismatched(mismatch) => {
                    tracing::error!(table = %table, error = %mismatch, "Existing table has an incompatible schema");
                    return Err(mismatch.into());
                }
                SchemaStatus::Absent => {
                    tracing::info!(table = %table, "Table does not exist");
                }
            }
        }

        if create_if_missing {
            ensure_table(analytics.store.as_ref(), table)
                .await
                .map_err(|source| AnalyticsError::Provision {
                    table: table.to_string(),
                    source,
                })?;
        }

        Ok(analytics)
    }

    /// Table receiving fingerprints.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Close the shared connection. Every clone observes the closed handle.
    pub async fn close(&self) -> StoreResult<()> {
        self.store.close().await
    }
}
