//! Shared utilities for integration tests.

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::{Query, State},
    http::{HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use fingerprint_analytics::config::StoreConfig;
use fingerprint_analytics::schema::COLUMNS;
use fingerprint_analytics::store::MemoryStore;
use fingerprint_analytics::Analytics;

pub const TABLE: &str = "hits";
pub const PASSWORD: &str = "secret";

/// The declared layout as `(name, type)` pairs.
pub fn declared_columns() -> Vec<(String, String)> {
    COLUMNS
        .iter()
        .map(|c| (c.name.to_string(), c.ty.as_str().to_string()))
        .collect()
}

/// A memory store with the table provisioned and an analytics handle on it.
pub async fn memory_analytics() -> (MemoryStore, Analytics) {
    let store = MemoryStore::new();
    let analytics = Analytics::init(Arc::new(store.clone()), TABLE, true, true)
        .await
        .unwrap();
    (store, analytics)
}

/// Downstream router counting how often it was reached.
pub fn counting_downstream() -> (Router, Arc<AtomicUsize>) {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    let router = Router::new().fallback(move |req: Request<Body>| {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            format!("downstream {}", req.uri().path())
        }
    });
    (router, hits)
}

/// One request seen by the fake ClickHouse server.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub params: HashMap<String, String>,
    pub sql: String,
    pub body: String,
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub tables: HashMap<String, Vec<(String, String)>>,
    pub requests: Vec<Recorded>,
    pub open: HashMap<String, Vec<serde_json::Value>>,
    pub committed: Vec<serde_json::Value>,
    pub rollbacks: usize,
    pub transactions: bool,
    pub fail_commit: bool,
    pub fail_insert: bool,
}

/// In-process stand-in for the ClickHouse HTTP interface.
#[derive(Clone, Default)]
pub struct FakeClickHouse {
    pub state: Arc<Mutex<FakeState>>,
}

impl FakeClickHouse {
    pub fn with_table(&self, name: &str, columns: Vec<(String, String)>) {
        self.state.lock().unwrap().tables.insert(name.to_string(), columns);
    }

    /// Accept `BEGIN TRANSACTION`, as a server with
    /// `allow_experimental_transactions` would.
    pub fn enable_transactions(&self) {
        self.state.lock().unwrap().transactions = true;
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn committed(&self) -> Vec<serde_json::Value> {
        self.state.lock().unwrap().committed.clone()
    }
}

/// Start the fake server on an ephemeral port.
pub async fn start_fake_clickhouse() -> (SocketAddr, FakeClickHouse) {
    let fake = FakeClickHouse::default();
    let app = Router::new()
        .route("/", post(handle_clickhouse))
        .with_state(fake.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, fake)
}

/// Store settings using server-side transactions.
pub fn transactional_store_config(addr: SocketAddr) -> StoreConfig {
    StoreConfig {
        server_transactions: true,
        ..store_config(addr)
    }
}

/// Store settings pointing at a fake server.
pub fn store_config(addr: SocketAddr) -> StoreConfig {
    StoreConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        password: PASSWORD.to_string(),
        table: TABLE.to_string(),
        ..StoreConfig::default()
    }
}

fn exception(status: StatusCode, code: u32, message: &str) -> Response {
    (
        status,
        [("X-ClickHouse-Exception-Code", code.to_string())],
        format!("Code: {}. DB::Exception: {}\n", code, message),
    )
        .into_response()
}

async fn handle_clickhouse(
    State(fake): State<FakeClickHouse>,
    Query(params): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let user = headers.get("X-ClickHouse-User").and_then(|v| v.to_str().ok());
    let key = headers.get("X-ClickHouse-Key").and_then(|v| v.to_str().ok());
    if user != Some("default") || key != Some(PASSWORD) {
        return exception(
            StatusCode::FORBIDDEN,
            516,
            "default: Authentication failed: password is incorrect. (AUTHENTICATION_FAILED)",
        );
    }

    let sql = params.get("query").cloned().unwrap_or_else(|| body.clone());
    let mut state = fake.state.lock().unwrap();
    state.requests.push(Recorded {
        params: params.clone(),
        sql: sql.clone(),
        body: body.clone(),
    });
    let session = params.get("session_id").cloned();

    if sql == "SELECT 1" {
        return "1\n".into_response();
    }
    if sql.contains("FROM system.tables") {
        let table = params.get("param_table").cloned().unwrap_or_default();
        let count = u64::from(state.tables.contains_key(&table));
        return format!("{}\n", count).into_response();
    }
    if sql.contains("FROM system.columns") {
        let table = params.get("param_table").cloned().unwrap_or_default();
        let lines: String = state
            .tables
            .get(&table)
            .map(|columns| {
                columns
                    .iter()
                    .map(|(name, ty)| format!("{}\n", serde_json::json!({ "name": name, "type": ty })))
                    .collect()
            })
            .unwrap_or_default();
        return lines.into_response();
    }
    if sql.starts_with("CREATE TABLE IF NOT EXISTS `") {
        let name = sql["CREATE TABLE IF NOT EXISTS `".len()..]
            .split('`')
            .next()
            .unwrap_or_default()
            .to_string();
        state.tables.entry(name).or_insert_with(declared_columns);
        return StatusCode::OK.into_response();
    }
    if sql == "BEGIN TRANSACTION" {
        if !state.transactions {
            return exception(
                StatusCode::NOT_IMPLEMENTED,
                48,
                "Transactions are not supported. (NOT_IMPLEMENTED)",
            );
        }
        let Some(id) = session else {
            return exception(StatusCode::BAD_REQUEST, 48, "Transactions require a session");
        };
        state.open.insert(id, Vec::new());
        return StatusCode::OK.into_response();
    }
    if sql.starts_with("INSERT INTO") {
        if state.fail_insert {
            return exception(StatusCode::INTERNAL_SERVER_ERROR, 252, "Too many parts");
        }
        let row: serde_json::Value = match serde_json::from_str(&body) {
            Ok(row) => row,
            Err(e) => return exception(StatusCode::BAD_REQUEST, 27, &e.to_string()),
        };
        match session {
            Some(id) => match state.open.get_mut(&id) {
                Some(pending) => pending.push(row),
                None => return exception(StatusCode::BAD_REQUEST, 649, "No open transaction"),
            },
            None => state.committed.push(row),
        }
        return StatusCode::OK.into_response();
    }
    if sql == "COMMIT" {
        if state.fail_commit {
            return exception(StatusCode::INTERNAL_SERVER_ERROR, 655, "Transaction was aborted");
        }
        let rows = session.and_then(|id| state.open.remove(&id)).unwrap_or_default();
        state.committed.extend(rows);
        return StatusCode::OK.into_response();
    }
    if sql == "ROLLBACK" {
        if let Some(id) = session {
            state.open.remove(&id);
        }
        state.rollbacks += 1;
        return StatusCode::OK.into_response();
    }

    exception(StatusCode::BAD_REQUEST, 62, "Syntax error")
}
