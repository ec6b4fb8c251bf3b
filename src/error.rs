//! Errors surfaced by the analytics component.

use std::fmt;
use thiserror::Error;

use crate::schema::SchemaMismatch;
use crate::store::StoreError;

/// Step of the per-request write that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteStage {
    Begin,
    Insert,
    Commit,
}

impl WriteStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteStage::Begin => "begin",
            WriteStage::Insert => "insert",
            WriteStage::Commit => "commit",
        }
    }
}

impl fmt::Display for WriteStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from startup and from the write path.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// Store unreachable, or the handshake or credentials were rejected.
    #[error("failed to connect to analytics store: {0}")]
    Connect(#[source] StoreError),

    /// The existing table is incompatible with the fingerprint layout.
    #[error(transparent)]
    SchemaMismatch(#[from] SchemaMismatch),

    /// Table metadata could not be read during verification.
    #[error("failed to read metadata for table '{table}': {source}")]
    Metadata { table: String, source: StoreError },

    /// The create-table statement failed.
    #[error("failed to create table '{table}': {source}")]
    Provision { table: String, source: StoreError },

    /// A per-request transaction step failed.
    #[error("{} failed: {source}", stage_description(.stage))]
    Write { stage: WriteStage, source: StoreError },
}

fn stage_description(stage: &WriteStage) -> &'static str {
    match stage {
        WriteStage::Begin => "transaction begin",
        WriteStage::Insert => "fingerprint insert",
        WriteStage::Commit => "transaction commit",
    }
}

impl AnalyticsError {
    /// Write stage for write-path errors.
    pub fn write_stage(&self) -> Option<WriteStage> {
        match self {
            AnalyticsError::Write { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Underlying store error, if the failure came from the store.
    pub fn store_error(&self) -> Option<&StoreError> {
        match self {
            AnalyticsError::Connect(source)
            | AnalyticsError::Metadata { source, .. }
            | AnalyticsError::Provision { source, .. }
            | AnalyticsError::Write { source, .. } => Some(source),
            AnalyticsError::SchemaMismatch(_) => None,
        }
    }
}
