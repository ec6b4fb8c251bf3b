//! Per-request transactional insert.

use std::time::Instant;

use crate::analytics::Analytics;
use crate::error::{AnalyticsError, WriteStage};
use crate::fingerprint::Fingerprint;
use crate::observability::metrics;
use crate::store::StoreError;
use crate::schema::descriptor::row;

impl Analytics {
    /// Persist one fingerprint as one row inside its own transaction.
    ///
    /// A failed insert is rolled back; a failed commit is reported with
    /// [`WriteStage::Commit`]. Nothing is retried.
    pub async fn write(&self, fingerprint: &Fingerprint) -> Result<(), AnalyticsError> {
        let started = Instant::now();
        let result = self.write_row(fingerprint).await;

        match &result {
            Ok(()) => {
                metrics::record_row_written(started);
                tracing::debug!(table = %self.table, "Fingerprint stored");
            }
            Err(e) => {
                let stage = e.write_stage().unwrap_or(WriteStage::Insert);
                metrics::record_write_failure(stage, started);
                let code = e.store_error().and_then(StoreError::code);
                tracing::error!(
                    table = %self.table,
                    stage = %stage,
                    code = ?code,
                    error = %e,
                    "Failed to store fingerprint"
                );
            }
        }
        result
    }

    async fn write_row(&self, fingerprint: &Fingerprint) -> Result<(), AnalyticsError> {
        let fail = |stage| move |source| AnalyticsError::Write { stage, source };

        let mut tx = self.store.begin().await.map_err(fail(WriteStage::Begin))?;

        let cells = row(fingerprint);
        if let Err(source) = tx.insert_row(&self.table, &cells).await {
            if let Err(e) = tx.rollback().await {
                tracing::warn!(table = %self.table, error = %e, "Rollback after failed insert also failed");
            }
            return Err(fail(WriteStage::Insert)(source));
        }

        tx.commit().await.map_err(fail(WriteStage::Commit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::{Fault, MemoryStore, Value};
    use std::sync::Arc;

    async fn ready(store: &MemoryStore) -> Analytics {
        Analytics::init(Arc::new(store.clone()), "hits", true, true)
            .await
            .unwrap()
    }

    fn sample() -> Fingerprint {
        Fingerprint {
            user_agent: "curl/8.5.0".into(),
            ip_address: "127.0.0.1:40000".into(),
            method: "GET".into(),
            request_uri: "/".into(),
            protocol: "HTTP/1.1".into(),
            content_length: -1,
            transfer_encoding: vec!["chunked".into()],
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn commits_one_row() {
        let store = MemoryStore::new();
        let analytics = ready(&store).await;

        analytics.write(&sample()).await.unwrap();

        let rows = store.rows("hits");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 33);
        assert_eq!(rows[0]["user_agent"], Value::String("curl/8.5.0".into()));
        assert_eq!(rows[0]["content_length"], Value::Int64(-1));
        assert_eq!(rows[0]["transfer_encoding"], Value::ArrayOfString(vec!["chunked".into()]));
        assert_eq!(rows[0]["tls_version"], Value::UInt16(0));
        assert_eq!(store.commits(), 1);
        assert_eq!(store.rollbacks(), 0);
    }

    #[tokio::test]
    async fn each_call_is_its_own_row() {
        let store = MemoryStore::new();
        let analytics = ready(&store).await;

        analytics.write(&sample()).await.unwrap();
        analytics.write(&sample()).await.unwrap();

        assert_eq!(store.rows("hits").len(), 2);
        assert_eq!(store.commits(), 2);
    }

    #[tokio::test]
    async fn insert_failure_rolls_back() {
        let store = MemoryStore::new();
        let analytics = ready(&store).await;
        store.fail(Fault::Insert, "too many parts");

        let err = analytics.write(&sample()).await.unwrap_err();
        assert_eq!(err.write_stage(), Some(WriteStage::Insert));
        assert_eq!(store.rollbacks(), 1);
        assert_eq!(store.commits(), 0);
        assert!(store.rows("hits").is_empty());
    }

    #[tokio::test]
    async fn rollback_failure_keeps_insert_error() {
        let store = MemoryStore::new();
        let analytics = ready(&store).await;
        store.fail(Fault::Insert, "too many parts");
        store.fail(Fault::Rollback, "session expired");

        let err = analytics.write(&sample()).await.unwrap_err();
        assert_eq!(err.write_stage(), Some(WriteStage::Insert));
        assert!(err.to_string().contains("too many parts"));
    }

    #[tokio::test]
    async fn commit_failure_is_distinct() {
        let store = MemoryStore::new();
        let analytics = ready(&store).await;
        store.fail(Fault::Commit, "transaction aborted");

        let err = analytics.write(&sample()).await.unwrap_err();
        assert_eq!(err.write_stage(), Some(WriteStage::Commit));
        assert_eq!(err.to_string(), "transaction commit failed: transaction aborted");
        assert!(store.rows("hits").is_empty());
    }

    #[tokio::test]
    async fn begin_failure() {
        let store = MemoryStore::new();
        let analytics = ready(&store).await;
        store.fail(Fault::Begin, "no session");

        let err = analytics.write(&sample()).await.unwrap_err();
        assert_eq!(err.write_stage(), Some(WriteStage::Begin));
    }

    #[tokio::test]
    async fn missing_table_fails_insert() {
        let store = MemoryStore::new();
        let analytics = Analytics::init(Arc::new(store.clone()), "hits", false, false)
            .await
            .unwrap();

        let err = analytics.write(&sample()).await.unwrap_err();
        assert_eq!(err.write_stage(), Some(WriteStage::Insert));
        assert_eq!(store.rollbacks(), 1);
    }
}
