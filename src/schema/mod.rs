//! Table schema reconciliation.
//!
//! # Data Flow
//! ```text
//! descriptor.rs (static 33-column layout)
//!     → verifier.rs (compare against store metadata)
//!     → provisioner.rs (CREATE TABLE IF NOT EXISTS when absent)
//! ```
//!
//! # Design Decisions
//! - One static column table drives DDL, verification and inserts
//! - Verification is read-only; provisioning is idempotent

pub mod descriptor;
pub mod provisioner;
pub mod verifier;

pub use descriptor::{Cell, Column, ColumnType, ColumnValue, COLUMNS, COLUMN_COUNT};
pub use provisioner::{create_table_statement, ensure_table};
pub use verifier::{verify_schema, SchemaMismatch, SchemaStatus};

/// Backtick-quote an identifier for use in SQL text.
pub fn quote_identifier(name: &str) -> String {
    format!("`{}`", name.replace('\\', "\\\\").replace('`', "\\`"))
}

/// Whether `name` is a plain `[A-Za-z_][A-Za-z0-9_]*` identifier.
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
