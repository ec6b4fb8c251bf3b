//! ClickHouse over its HTTP interface.
//!
//! # Responsibilities
//! - Authenticate every request with the configured credentials
//! - Run metadata queries with server-side parameters
//! - Buffer a transaction's rows and send them as one INSERT on commit, or
//!   map the transaction to an HTTP session when server transactions are on
//! - Unwrap exception codes and messages from error responses
//!
//! # Design Decisions
//! - `reqwest::Client` pools connections and is safe to share, so the handle
//!   is a cheap `Clone`
//! - Rows are sent as `JSONCompactEachRow` bodies, never spliced into SQL
//! - Buffered transactions work against a stock server; a single INSERT is
//!   atomic for one block
//! - Server transactions need `allow_experimental_transactions`

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;
use uuid::Uuid;

use crate::config::StoreConfig;
use crate::schema::descriptor::{Cell, ColumnValue};
use crate::schema::quote_identifier;
use crate::store::error::{ServerException, StoreError, StoreResult};
use crate::store::{AnalyticsStore, StoreTransaction};

const EXCEPTION_CODE_HEADER: &str = "X-ClickHouse-Exception-Code";

/// Shared ClickHouse connection handle.
#[derive(Clone)]
pub struct ClickHouseStore {
    inner: Arc<Inner>,
}

struct Inner {
    client: Client,
    endpoint: Url,
    username: String,
    password: String,
    database: String,
    server_transactions: bool,
    closed: AtomicBool,
}

#[derive(Debug, Deserialize)]
struct ColumnRow {
    name: String,
    #[serde(rename = "type")]
    ty: String,
}

impl ClickHouseStore {
    /// Build a handle from configuration. Does not touch the network; call
    /// [`AnalyticsStore::ping`] to verify the connection.
    pub fn new(config: &StoreConfig) -> StoreResult<Self> {
        let endpoint = config
            .endpoint()
            .map_err(|e| StoreError::Endpoint(format!("{}://{}:{}: {}", config.scheme, config.host, config.port, e)))?;

        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                endpoint,
                username: config.username.clone(),
                password: config.password.clone(),
                database: config.database.clone(),
                server_transactions: config.server_transactions,
                closed: AtomicBool::new(false),
            }),
        })
    }

    /// Endpoint every request is sent to.
    pub fn endpoint(&self) -> &Url {
        &self.inner.endpoint
    }

    fn request(&self, session_id: Option<&str>) -> RequestBuilder {
        let mut request = self
            .inner
            .client
            .post(self.inner.endpoint.clone())
            .header("X-ClickHouse-User", &self.inner.username)
            .header("X-ClickHouse-Key", &self.inner.password)
            .query(&[("database", self.inner.database.as_str())]);
        if let Some(id) = session_id {
            request = request.query(&[("session_id", id)]);
        }
        request
    }

    /// Run a statement passed as the request body.
    async fn statement(&self, sql: &str, session_id: Option<&str>) -> StoreResult<String> {
        self.send(self.request(session_id).body(sql.to_string())).await
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    /// Send one INSERT carrying `body` rows, optionally inside a session.
    async fn insert(&self, insert: &PendingInsert, session_id: Option<&str>) -> StoreResult<()> {
        let request = self
            .request(session_id)
            .query(&[("query", insert.query.as_str())])
            .body(insert.body.clone());
        self.send(request).await.map(|_| ())
    }

    async fn send(&self, request: RequestBuilder) -> StoreResult<String> {
        self.ensure_open()?;

        let response = request.send().await?;
        let status = response.status();
        let code = response
            .headers()
            .get(EXCEPTION_CODE_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u32>().ok());
        let body = response.text().await?;

        if !status.is_success() {
            return Err(StoreError::Server(parse_exception(code, &body)));
        }
        Ok(body)
    }
}

/// Split a ClickHouse error body (`Code: 60. DB::Exception: ...`) into code
/// and message. A code from the response header takes precedence.
pub(crate) fn parse_exception(header_code: Option<u32>, body: &str) -> ServerException {
    let body = body.trim();
    let (body_code, message) = match body.strip_prefix("Code: ") {
        Some(rest) => match rest.split_once('.') {
            Some((code, message)) => (code.trim().parse::<u32>().ok(), message.trim()),
            None => (None, body),
        },
        None => (None, body),
    };

    ServerException {
        code: header_code.or(body_code),
        message: message.to_string(),
    }
}

#[async_trait]
impl AnalyticsStore for ClickHouseStore {
    async fn ping(&self) -> StoreResult<()> {
        let body = self.statement("SELECT 1", None).await?;
        if body.trim() == "1" {
            Ok(())
        } else {
            Err(StoreError::Decode(format!("ping returned {:?}", body.trim())))
        }
    }

    async fn count_tables(&self, table: &str) -> StoreResult<u64> {
        let request = self.request(None).query(&[("param_table", table)]).body(
            "SELECT count() FROM system.tables \
             WHERE database = currentDatabase() AND name = {table:String} \
             FORMAT TabSeparated",
        );
        let body = self.send(request).await?;
        body.trim()
            .parse::<u64>()
            .map_err(|e| StoreError::Decode(format!("table count {:?}: {}", body.trim(), e)))
    }

    async fn column_types(&self, table: &str) -> StoreResult<Vec<(String, String)>> {
        let request = self.request(None).query(&[("param_table", table)]).body(
            "SELECT name, type FROM system.columns \
             WHERE database = currentDatabase() AND table = {table:String} \
             FORMAT JSONEachRow",
        );
        let body = self.send(request).await?;

        body.lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| {
                serde_json::from_str::<ColumnRow>(line)
                    .map(|row| (row.name, row.ty))
                    .map_err(|e| StoreError::Decode(format!("column row {:?}: {}", line, e)))
            })
            .collect()
    }

    async fn execute(&self, statement: &str) -> StoreResult<()> {
        self.statement(statement, None).await.map(|_| ())
    }

    async fn begin(&self) -> StoreResult<Box<dyn StoreTransaction>> {
        self.ensure_open()?;
        let session_id = if self.inner.server_transactions {
            let id = Uuid::new_v4().to_string();
            self.statement("BEGIN TRANSACTION", Some(&id)).await?;
            tracing::trace!(session_id = %id, "Transaction started");
            Some(id)
        } else {
            None
        };
        Ok(Box::new(ClickHouseTransaction {
            store: self.clone(),
            session_id,
            pending: Vec::new(),
        }))
    }

    async fn close(&self) -> StoreResult<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return Err(StoreError::Closed);
        }
        tracing::info!(endpoint = %self.inner.endpoint, "ClickHouse handle closed");
        Ok(())
    }
}

/// Rows of one INSERT statement in `JSONCompactEachRow` form.
struct PendingInsert {
    query: String,
    body: String,
}

impl PendingInsert {
    fn new(table: &str, row: &[Cell<'_>]) -> StoreResult<Self> {
        let columns: Vec<&str> = row.iter().map(|cell| cell.column).collect();
        let values: Vec<ColumnValue<'_>> = row.iter().map(|cell| cell.value).collect();
        Ok(Self {
            query: format!(
                "INSERT INTO {} ({}) FORMAT JSONCompactEachRow",
                quote_identifier(table),
                columns.join(", ")
            ),
            body: serde_json::to_string(&values)?,
        })
    }
}

/// A write transaction.
///
/// Without a session, rows stay in `pending` until commit and rollback just
/// drops them. With a session, every step runs on the server.
struct ClickHouseTransaction {
    store: ClickHouseStore,
    session_id: Option<String>,
    pending: Vec<PendingInsert>,
}

#[async_trait]
impl StoreTransaction for ClickHouseTransaction {
    async fn insert_row(&mut self, table: &str, row: &[Cell<'_>]) -> StoreResult<()> {
        let insert = PendingInsert::new(table, row)?;
        match &self.session_id {
            Some(id) => self.store.insert(&insert, Some(id.as_str())).await,
            None => {
                self.store.ensure_open()?;
                self.pending.push(insert);
                Ok(())
            }
        }
    }

    async fn commit(self: Box<Self>) -> StoreResult<()> {
        match &self.session_id {
            Some(id) => self.store.statement("COMMIT", Some(id.as_str())).await.map(|_| ()),
            None => {
                for insert in &self.pending {
                    self.store.insert(insert, None).await?;
                }
                Ok(())
            }
        }
    }

    async fn rollback(self: Box<Self>) -> StoreResult<()> {
        match &self.session_id {
            Some(id) => self.store.statement("ROLLBACK", Some(id.as_str())).await.map(|_| ()),
            None => {
                tracing::trace!(rows = self.pending.len(), "Discarding buffered rows");
                Ok(())
            }
        }
    }
}
