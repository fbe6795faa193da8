//! Cross-module failure classification.
//!
//! Each module keeps its own error enum; `ErrorKind` is the shared taxonomy
//! callers use to pick between cache fallback, retry, and hard failure.

use serde::{Deserialize, Serialize};

/// Classification of a failure, independent of which component raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// No connectivity. Fail fast, never retried.
    Offline,
    /// Missing or rejected user identity. Fail fast.
    Unauthenticated,
    /// 5xx, 429, timeout or transport failure. Retried, then surfaced.
    Transient,
    /// Client error other than 401/429. Surfaced immediately.
    Permanent,
    /// A local bulk transaction failed; local state is unchanged.
    LocalStoreFailure,
    /// A payload (or a single item of one) could not be decoded.
    Malformed,
}

impl ErrorKind {
    /// Whether the condition should fall back to cached data rather than
    /// surfacing a hard error.
    pub fn is_network(self) -> bool {
        matches!(self, ErrorKind::Offline | ErrorKind::Transient)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Offline => "offline",
            ErrorKind::Unauthenticated => "unauthenticated",
            ErrorKind::Transient => "transient",
            ErrorKind::Permanent => "permanent",
            ErrorKind::LocalStoreFailure => "local_store_failure",
            ErrorKind::Malformed => "malformed",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_network_kinds() {
        assert!(ErrorKind::Offline.is_network());
        assert!(ErrorKind::Transient.is_network());
        assert!(!ErrorKind::Permanent.is_network());
        assert!(!ErrorKind::Unauthenticated.is_network());
        assert!(!ErrorKind::LocalStoreFailure.is_network());
    }

    #[test]
    fn test_serialization() {
        let json = serde_json::to_string(&ErrorKind::LocalStoreFailure).unwrap();
        assert_eq!(json, "\"local_store_failure\"");
        assert_eq!(ErrorKind::Offline.to_string(), "offline");
    }
}
