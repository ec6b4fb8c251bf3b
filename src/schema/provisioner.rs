//! Table creation.

use crate::schema::descriptor::{COLUMNS, ORDER_BY};
use crate::schema::quote_identifier;
use crate::store::{AnalyticsStore, StoreResult};

/// `CREATE TABLE IF NOT EXISTS` for the fingerprint layout.
pub fn create_table_statement(table: &str) -> String {
    let columns = COLUMNS
        .iter()
        .map(|c| format!("{} {}", c.name, c.ty))
        .collect::<Vec<_>>()
        .join(", ");

    format!(
        "CREATE TABLE IF NOT EXISTS {} ( {} ) ENGINE = MergeTree() ORDER BY ({})",
        quote_identifier(table),
        columns,
        ORDER_BY.join(", ")
    )
}

/// Create `table` unless it already exists. Errors are returned as-is.
pub async fn ensure_table(store: &dyn AnalyticsStore, table: &str) -> StoreResult<()> {
    let statement = create_table_statement(table);
    if let Err(e) = store.execute(&statement).await {
        tracing::error!(table = %table, error = %e, "Failed to create table");
        return Err(e);
    }
    tracing::info!(table = %table, "Table ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::descriptor::COLUMN_COUNT;
    use crate::store::memory::{Fault, MemoryStore};

    fn column_defs(statement: &str) -> Vec<String> {
        let start = statement.find("( ").unwrap() + 2;
        let end = statement.find(" ) ENGINE").unwrap();
        statement[start..end].split(", ").map(str::to_string).collect()
    }

    #[test]
    fn declares_every_column_once() {
        let statement = create_table_statement("hits");
        let defs = column_defs(&statement);
        assert_eq!(defs.len(), COLUMN_COUNT);

        for column in COLUMNS.iter() {
            let expected = format!("{} {}", column.name, column.ty);
            assert_eq!(
                defs.iter().filter(|d| **d == expected).count(),
                1,
                "{} should be declared exactly once",
                expected
            );
        }
    }

    #[test]
    fn ordered_by_user_agent_and_ip() {
        let statement = create_table_statement("hits");
        assert!(statement.starts_with("CREATE TABLE IF NOT EXISTS `hits` ("));
        assert!(statement.ends_with("ENGINE = MergeTree() ORDER BY (user_agent, ip_address)"));
    }

    #[tokio::test]
    async fn creates_table_in_store() {
        let store = MemoryStore::new();
        ensure_table(&store, "hits").await.unwrap();
        ensure_table(&store, "hits").await.unwrap();

        let columns = store.columns("hits").unwrap();
        assert_eq!(columns.len(), COLUMN_COUNT);
        assert_eq!(columns[30], ("transfer_encoding".to_string(), "Array(String)".to_string()));
        assert_eq!(store.executed().len(), 2);
    }

    #[tokio::test]
    async fn execution_error_surfaces() {
        let store = MemoryStore::new();
        store.fail(Fault::Execute, "Code: 497. Not enough privileges");
        let err = ensure_table(&store, "hits").await.unwrap_err();
        assert!(err.to_string().contains("Not enough privileges"));
        assert!(!store.has_table("hits"));
    }
}
