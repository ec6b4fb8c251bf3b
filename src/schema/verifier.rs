//! Existing-table verification.

use std::collections::HashMap;
use std::fmt;
use thiserror::Error;

use crate::schema::descriptor::{ColumnType, COLUMNS};
use crate::store::{AnalyticsStore, StoreResult};

/// Outcome of comparing a table against the descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SchemaStatus {
    /// No table with that name exists.
    Absent,
    /// The table exists and every declared column has the declared type.
    Matching,
    /// The table exists but its layout is incompatible.
    Mismatched(SchemaMismatch),
}

impl SchemaStatus {
    /// Whether a table was found, compatible or not.
    pub fn is_present(&self) -> bool {
        !matches!(self, SchemaStatus::Absent)
    }
}

/// First column whose actual type disagrees with the descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("schema mismatch for column '{column}': expected '{expected}', got {actual}")]
pub struct SchemaMismatch {
    pub column: &'static str,
    pub expected: ColumnType,
    pub actual: ActualType,
}

/// Type found in the store for a declared column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActualType {
    Missing,
    Type(String),
}

impl fmt::Display for ActualType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActualType::Missing => f.write_str("missing column"),
            ActualType::Type(ty) => write!(f, "'{}'", ty),
        }
    }
}

/// Compare `table` in the store against the descriptor.
///
/// Columns are checked in descriptor order and the first disagreement is
/// reported. Extra columns in the store are ignored.
pub async fn verify_schema(store: &dyn AnalyticsStore, table: &str) -> StoreResult<SchemaStatus> {
    if store.count_tables(table).await? == 0 {
        return Ok(SchemaStatus::Absent);
    }

    let actual: HashMap<String, String> = store.column_types(table).await?.into_iter().collect();
    Ok(compare(&actual))
}

fn compare(actual: &HashMap<String, String>) -> SchemaStatus {
    for column in COLUMNS.iter() {
        match actual.get(column.name) {
            Some(ty) if column.ty.matches(ty) => continue,
            found => {
                return SchemaStatus::Mismatched(SchemaMismatch {
                    column: column.name,
                    expected: column.ty,
                    actual: found.map_or(ActualType::Missing, |ty| ActualType::Type(ty.clone())),
                })
            }
        }
    }
    SchemaStatus::Matching
}
