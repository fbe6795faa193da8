//! Local persistence: the record table and the liked-id set.
//!
//! Both traits are synchronous; async callers go through [`run_blocking`]
//! so SQLite work stays off the runtime's worker threads.

mod sqlite;

pub use sqlite::SqliteCatalogStore;

use thiserror::Error;

use crate::catalog::{Record, RecordId};
use crate::error::ErrorKind;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Record not found: {0}")]
    NotFound(RecordId),

    #[error("Duplicate record id: {0}")]
    Duplicate(RecordId),

    #[error("Blocking task failed: {0}")]
    TaskFailed(String),
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::LocalStoreFailure
    }
}

/// Inserts, full replacements and deletions applied as one transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangeSet {
    pub insert: Vec<Record>,
    pub update: Vec<Record>,
    pub delete: Vec<RecordId>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.insert.is_empty() && self.update.is_empty() && self.delete.is_empty()
    }
}

/// Keyed table of records.
pub trait LocalCatalogStore: Send + Sync {
    fn all_ids(&self) -> Result<Vec<RecordId>, StoreError>;

    /// All records ordered by id.
    fn get_all(&self) -> Result<Vec<Record>, StoreError>;

    /// Insert new records; an existing id fails the whole batch.
    fn bulk_insert(&self, records: &[Record]) -> Result<(), StoreError>;

    /// Full replace of existing records; a missing id fails the whole batch.
    fn bulk_update(&self, records: &[Record]) -> Result<(), StoreError>;

    /// Delete by id; unknown ids are ignored.
    fn bulk_delete_by_ids(&self, ids: &[RecordId]) -> Result<(), StoreError>;

    fn get(&self, id: RecordId) -> Result<Option<Record>, StoreError>;

    /// Insert or fully replace one record.
    fn put(&self, record: &Record) -> Result<(), StoreError>;

    /// Apply a change set atomically: either every part lands or none does.
    fn apply(&self, changes: &ChangeSet) -> Result<(), StoreError>;
}

/// Set of record ids the current user has liked.
pub trait LikedSet: Send + Sync {
    fn contains(&self, id: RecordId) -> Result<bool, StoreError>;
    fn add(&self, id: RecordId) -> Result<(), StoreError>;
    fn remove(&self, id: RecordId) -> Result<(), StoreError>;
    fn all_ids(&self) -> Result<Vec<RecordId>, StoreError>;
}

/// Run blocking store work on the blocking pool.
pub async fn run_blocking<T, F>(f: F) -> Result<T, StoreError>
where
    F: FnOnce() -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| StoreError::TaskFailed(e.to_string()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_blocking_propagates_result() {
        let value = run_blocking(|| Ok::<_, StoreError>(7)).await.unwrap();
        assert_eq!(value, 7);

        let err = run_blocking(|| Err::<(), _>(StoreError::NotFound(3)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(3)));
        assert_eq!(err.kind(), ErrorKind::LocalStoreFailure);
    }

    #[test]
    fn test_change_set_empty() {
        assert!(ChangeSet::default().is_empty());
        let changes = ChangeSet {
            delete: vec![1],
            ..ChangeSet::default()
        };
        assert!(!changes.is_empty());
    }
}
