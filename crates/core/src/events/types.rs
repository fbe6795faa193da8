use serde::{Deserialize, Serialize};

use crate::catalog::RecordId;

/// Where a sync result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncSource {
    Remote,
    Cache,
}

impl SyncSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncSource::Remote => "remote",
            SyncSource::Cache => "cache",
        }
    }
}

/// Terminal phase a search settled in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchOutcome {
    Success,
    LocalOnly,
}

/// Something the delivery context should hear about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CatalogEvent {
    SyncCompleted {
        source: SyncSource,
        added: usize,
        updated: usize,
        removed: usize,
        skipped: usize,
    },
    /// Remote failed and cached data was served instead.
    SyncDegraded { reason: String },
    /// Optimistic write applied, remote confirmation pending.
    LikePending { record_id: RecordId, liked: bool },
    LikeConfirmed { record_id: RecordId, liked: bool },
    /// Remote call failed; `liked` is the restored value.
    LikeRolledBack {
        record_id: RecordId,
        liked: bool,
        error: String,
    },
    SearchCompleted {
        sequence: u64,
        query: String,
        outcome: SearchOutcome,
        results: usize,
    },
    RecordCreated { record_id: RecordId },
    RecordUpdated { record_id: RecordId },
    RecordDeleted { record_id: RecordId },
}

impl CatalogEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            CatalogEvent::SyncCompleted { .. } => "sync_completed",
            CatalogEvent::SyncDegraded { .. } => "sync_degraded",
            CatalogEvent::LikePending { .. } => "like_pending",
            CatalogEvent::LikeConfirmed { .. } => "like_confirmed",
            CatalogEvent::LikeRolledBack { .. } => "like_rolled_back",
            CatalogEvent::SearchCompleted { .. } => "search_completed",
            CatalogEvent::RecordCreated { .. } => "record_created",
            CatalogEvent::RecordUpdated { .. } => "record_updated",
            CatalogEvent::RecordDeleted { .. } => "record_deleted",
        }
    }

    pub fn record_id(&self) -> Option<RecordId> {
        match self {
            CatalogEvent::LikePending { record_id, .. }
            | CatalogEvent::LikeConfirmed { record_id, .. }
            | CatalogEvent::LikeRolledBack { record_id, .. }
            | CatalogEvent::RecordCreated { record_id }
            | CatalogEvent::RecordUpdated { record_id }
            | CatalogEvent::RecordDeleted { record_id } => Some(*record_id),
            _ => None,
        }
    }
}
