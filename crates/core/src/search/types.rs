use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::Record;
use crate::config::SearchConfig;
use crate::error::ErrorKind;
use crate::events::SearchOutcome;
use crate::store::StoreError;

/// Where the current search stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchPhase {
    Idle,
    SmartSearchPending,
    FallbackPending,
    Success,
    LocalOnly,
}

impl SearchPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SearchPhase::Success | SearchPhase::LocalOnly)
    }
}

impl From<SearchOutcome> for SearchPhase {
    fn from(outcome: SearchOutcome) -> Self {
        match outcome {
            SearchOutcome::Success => SearchPhase::Success,
            SearchOutcome::LocalOnly => SearchPhase::LocalOnly,
        }
    }
}

#[derive(Debug, Error)]
pub enum SearchError {
    /// A newer search was issued before this one settled.
    #[error("Search #{sequence} superseded by a newer query")]
    Superseded { sequence: u64 },

    #[error("Local store error: {0}")]
    Store(#[from] StoreError),
}

impl SearchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SearchError::Superseded { .. } => ErrorKind::Permanent,
            SearchError::Store(e) => e.kind(),
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, SearchError::Superseded { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchResults {
    pub sequence: u64,
    pub query: String,
    pub outcome: SearchOutcome,
    pub records: Vec<Record>,
    /// Reported by the remote for ranked results.
    pub total_results: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub smart_search_enabled: bool,
    pub timeout: Duration,
    pub page: u32,
    pub per_page: u32,
    pub server_fallback: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self::from(&SearchConfig::default())
    }
}

impl From<&SearchConfig> for SearchOptions {
    fn from(config: &SearchConfig) -> Self {
        Self {
            smart_search_enabled: config.smart_search_enabled,
            timeout: Duration::from_millis(config.timeout_ms),
            page: config.page,
            per_page: config.per_page,
            server_fallback: config.server_fallback,
        }
    }
}
