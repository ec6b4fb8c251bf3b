//! In-process store.
//!
//! Keeps tables, committed rows and an execution log in memory. Used for
//! local runs without a ClickHouse server and as the test double for the
//! startup and write paths; individual operations can be made to fail.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::schema::descriptor::{Cell, ColumnValue};
use crate::store::error::{StoreError, StoreResult};
use crate::store::{AnalyticsStore, StoreTransaction};

/// Owned copy of a stored value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Int64(i64),
    UInt16(u16),
    ArrayOfString(Vec<String>),
}

impl From<ColumnValue<'_>> for Value {
    fn from(value: ColumnValue<'_>) -> Self {
        match value {
            ColumnValue::String(s) => Value::String(s.to_string()),
            ColumnValue::Int64(n) => Value::Int64(n),
            ColumnValue::UInt16(n) => Value::UInt16(n),
            ColumnValue::ArrayOfString(items) => Value::ArrayOfString(items.to_vec()),
        }
    }
}

/// A committed row keyed by column name.
pub type StoredRow = HashMap<String, Value>;

/// Operations that can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    Ping,
    Metadata,
    Execute,
    Begin,
    Insert,
    Commit,
    Rollback,
}

#[derive(Debug, Default)]
struct Table {
    columns: Vec<(String, String)>,
    rows: Vec<StoredRow>,
}

#[derive(Debug, Default)]
struct State {
    tables: HashMap<String, Table>,
    executed: Vec<String>,
    faults: HashMap<Fault, String>,
    commits: usize,
    rollbacks: usize,
    closed: bool,
    table_count: Option<u64>,
}

/// Shared in-memory store. Clones observe the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a table with the given `(name, type)` columns.
    pub fn create_table<N, T>(&self, table: &str, columns: impl IntoIterator<Item = (N, T)>)
    where
        N: Into<String>,
        T: Into<String>,
    {
        let columns = columns
            .into_iter()
            .map(|(name, ty)| (name.into(), ty.into()))
            .collect();
        self.lock().tables.insert(
            table.to_string(),
            Table {
                columns,
                rows: Vec::new(),
            },
        );
    }

    /// Make `fault` fail with `message` until cleared.
    pub fn fail(&self, fault: Fault, message: impl Into<String>) {
        self.lock().faults.insert(fault, message.into());
    }

    pub fn clear_fault(&self, fault: Fault) {
        self.lock().faults.remove(&fault);
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.lock().tables.contains_key(table)
    }

    /// Column layout of `table`, in declaration order.
    pub fn columns(&self, table: &str) -> Option<Vec<(String, String)>> {
        self.lock().tables.get(table).map(|t| t.columns.clone())
    }

    /// Committed rows of `table`.
    pub fn rows(&self, table: &str) -> Vec<StoredRow> {
        self.lock()
            .tables
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Statements passed to `execute`, in order.
    pub fn executed(&self) -> Vec<String> {
        self.lock().executed.clone()
    }

    pub fn commits(&self) -> usize {
        self.lock().commits
    }

    pub fn rollbacks(&self) -> usize {
        self.lock().rollbacks
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Make `count_tables` report `count` no matter which tables exist.
    pub fn report_table_count(&self, count: u64) {
        self.lock().table_count = Some(count);
    }

    /// Fail if closed or if `fault` is armed.
    fn check(state: &State, fault: Fault) -> StoreResult<()> {
        if state.closed {
            return Err(StoreError::Closed);
        }
        match state.faults.get(&fault) {
            Some(message) => Err(StoreError::server(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AnalyticsStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        Self::check(&self.lock(), Fault::Ping)
    }

    async fn count_tables(&self, table: &str) -> StoreResult<u64> {
        let state = self.lock();
        Self::check(&state, Fault::Metadata)?;
        Ok(state
            .table_count
            .unwrap_or_else(|| u64::from(state.tables.contains_key(table))))
    }

    async fn column_types(&self, table: &str) -> StoreResult<Vec<(String, String)>> {
        let state = self.lock();
        Self::check(&state, Fault::Metadata)?;
        Ok(state
            .tables
            .get(table)
            .map(|t| t.columns.clone())
            .unwrap_or_default())
    }

    async fn execute(&self, statement: &str) -> StoreResult<()> {
        let mut state = self.lock();
        Self::check(&state, Fault::Execute)?;
        state.executed.push(statement.to_string());

        if let Some((table, columns)) = parse_create_table(statement) {
            state.tables.entry(table).or_insert_with(|| Table {
                columns,
                rows: Vec::new(),
            });
        }
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        Self::check(&self.lock(), Fault::Begin)?;
        Ok(Box::new(MemoryTransaction {
            store: self.clone(),
            pending: Vec::new(),
        }))
    }

    async fn close(&self) -> StoreResult<()> {
        let mut state = self.lock();
        if state.closed {
            return Err(StoreError::Closed);
        }
        state.closed = true;
        Ok(())
    }
}

struct MemoryTransaction {
    store: MemoryStore,
    pending: Vec<(String, StoredRow)>,
}

#[async_trait]
impl StoreTransaction for MemoryTransaction {
    async fn insert_row(&mut self, table: &str, row: &[Cell<'_>]) -> StoreResult<()> {
        {
            let state = self.store.lock();
            MemoryStore::check(&state, Fault::Insert)?;
            let existing = state
                .tables
                .get(table)
                .ok_or_else(|| StoreError::server(format!("Table {} doesn't exist", table)))?;
            if let Some(cell) = row
                .iter()
                .find(|cell| !existing.columns.iter().any(|(name, _)| name == cell.column))
            {
                return Err(StoreError::server(format!(
                    "No such column {} in table {}",
                    cell.column, table
                )));
            }
        }

        let stored = row
            .iter()
            .map(|cell| (cell.column.to_string(), Value::from(cell.value)))
            .collect();
        self.pending.push((table.to_string(), stored));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        let MemoryTransaction { store, pending } = *self;
        let mut state = store.lock();
        MemoryStore::check(&state, Fault::Commit)?;
        for (table, row) in pending {
            if let Some(t) = state.tables.get_mut(&table) {
                t.rows.push(row);
            }
        }
        state.commits += 1;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        let mut state = self.store.lock();
        MemoryStore::check(&state, Fault::Rollback)?;
        state.rollbacks += 1;
        Ok(())
    }
}

/// Recognize `CREATE TABLE [IF NOT EXISTS] name ( col type, ... ) ...`.
fn parse_create_table(statement: &str) -> Option<(String, Vec<(String, String)>)> {
    let rest = strip_prefix_ignore_case(statement.trim(), "CREATE TABLE")?.trim_start();
    let rest = strip_prefix_ignore_case(rest, "IF NOT EXISTS")
        .unwrap_or(rest)
        .trim_start();

    let open = rest.find('(')?;
    let name = rest[..open].trim().trim_matches('`').to_string();

    let mut depth = 0usize;
    let mut close = None;
    for (i, ch) in rest[open..].char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    close = Some(open + i);
                    break;
                }
            }
            _ => {}
        }
    }
    let body = &rest[open + 1..close?];

    let mut columns = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, ch) in body.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                columns.push(&body[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    columns.push(&body[start..]);

    let columns = columns
        .into_iter()
        .filter_map(|def| {
            let (name, ty) = def.trim().split_once(char::is_whitespace)?;
            Some((name.trim_matches('`').to_string(), ty.trim().to_string()))
        })
        .collect();
    Some((name, columns))
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> Option<&'a str> {
    let head = s.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &s[prefix.len()..])
}
