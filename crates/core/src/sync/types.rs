use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::catalog::{Record, RecordId, ValidationError};
use crate::config::SyncConfig;
use crate::error::ErrorKind;
pub use crate::events::SyncSource;
use crate::store::StoreError;
use crate::transport::ApiError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("No network connection")]
    Offline,

    #[error("No signed-in user")]
    Unauthenticated,

    /// Neither the record's owner nor an administrator.
    #[error("Not allowed to modify record {0}")]
    PermissionDenied(RecordId),

    /// Remote unavailable and nothing cached to fall back on.
    #[error("No cached data available ({reason})")]
    NoCachedData { kind: ErrorKind, reason: String },

    #[error("Remote error: {0}")]
    Remote(#[from] ApiError),

    #[error("Local store error: {0}")]
    Store(#[from] StoreError),

    #[error("Invalid record: {0}")]
    Validation(#[from] ValidationError),
}

impl SyncError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SyncError::Offline => ErrorKind::Offline,
            SyncError::Unauthenticated => ErrorKind::Unauthenticated,
            SyncError::PermissionDenied(_) => ErrorKind::Permanent,
            SyncError::NoCachedData { kind, .. } => *kind,
            SyncError::Remote(e) => e.kind(),
            SyncError::Store(e) => e.kind(),
            SyncError::Validation(e) => e.kind(),
        }
    }
}

/// Outcome of one sync.
#[derive(Debug, Clone, Serialize)]
pub struct SyncResult {
    pub added: Vec<Record>,
    pub updated: Vec<Record>,
    pub removed_ids: Vec<RecordId>,
    /// Full catalog after the sync (or the cache, when degraded), by id.
    pub records: Vec<Record>,
    pub source: SyncSource,
    /// Remote items skipped as malformed.
    pub skipped: usize,
    /// Soft warning when cached data was served.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
    pub synced_at: DateTime<Utc>,
}

impl SyncResult {
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }
}

/// Outcome of reconciling the liked-id set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LikedSyncResult {
    pub added: Vec<RecordId>,
    pub removed: Vec<RecordId>,
    /// Ids left alone because a toggle was in flight.
    pub deferred: Vec<RecordId>,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// An empty remote listing wipes a non-empty cache when true; when
    /// false it is served as a degraded cache result.
    pub trust_empty_remote: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            trust_empty_remote: true,
        }
    }
}

impl From<&SyncConfig> for SyncOptions {
    fn from(config: &SyncConfig) -> Self {
        Self {
            trust_empty_remote: config.trust_empty_remote,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::TransportError;

    #[test]
    fn test_error_kinds() {
        assert_eq!(SyncError::Offline.kind(), ErrorKind::Offline);
        assert_eq!(
            SyncError::NoCachedData {
                kind: ErrorKind::Transient,
                reason: "HTTP 503".into()
            }
            .kind(),
            ErrorKind::Transient
        );
        assert_eq!(
            SyncError::from(ApiError::Transport(TransportError::Timeout)).kind(),
            ErrorKind::Transient
        );
        assert_eq!(
            SyncError::from(StoreError::Database("locked".into())).kind(),
            ErrorKind::LocalStoreFailure
        );
    }
}
