//! In-memory stores with write-failure injection.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use crate::catalog::{Record, RecordId};
use crate::store::{ChangeSet, LikedSet, LocalCatalogStore, StoreError};

/// Mock implementation of the LocalCatalogStore trait.
///
/// `apply` works on a copy and swaps it in, so a failing change set leaves
/// the contents untouched.
#[derive(Default)]
pub struct MemoryCatalogStore {
    records: RwLock<BTreeMap<RecordId, Record>>,
    fail_writes: AtomicBool,
    apply_calls: AtomicUsize,
}

impl MemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<Record>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert_raw(record);
        }
        store
    }

    /// Insert without going through the trait.
    pub fn insert_raw(&self, record: Record) {
        self.write().insert(record.id, record);
    }

    /// Make every following write fail until reset.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.read().keys().copied().collect()
    }

    pub fn get_record(&self, id: RecordId) -> Option<Record> {
        self.read().get(&id).cloned()
    }

    pub fn snapshot(&self) -> Vec<Record> {
        self.read().values().cloned().collect()
    }

    pub fn apply_calls(&self) -> usize {
        self.apply_calls.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database("injected write failure".to_string()));
        }
        Ok(())
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<RecordId, Record>> {
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<RecordId, Record>> {
        self.records.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn apply_to(map: &mut BTreeMap<RecordId, Record>, changes: &ChangeSet) -> Result<(), StoreError> {
    for id in &changes.delete {
        map.remove(id);
    }
    for record in &changes.update {
        if !map.contains_key(&record.id) {
            return Err(StoreError::NotFound(record.id));
        }
        map.insert(record.id, record.clone());
    }
    for record in &changes.insert {
        if map.contains_key(&record.id) {
            return Err(StoreError::Duplicate(record.id));
        }
        map.insert(record.id, record.clone());
    }
    Ok(())
}

impl LocalCatalogStore for MemoryCatalogStore {
    fn all_ids(&self) -> Result<Vec<RecordId>, StoreError> {
        Ok(self.ids())
    }

    fn get_all(&self) -> Result<Vec<Record>, StoreError> {
        Ok(self.snapshot())
    }

    fn bulk_insert(&self, records: &[Record]) -> Result<(), StoreError> {
        self.apply(&ChangeSet {
            insert: records.to_vec(),
            ..ChangeSet::default()
        })
    }

    fn bulk_update(&self, records: &[Record]) -> Result<(), StoreError> {
        self.apply(&ChangeSet {
            update: records.to_vec(),
            ..ChangeSet::default()
        })
    }

    fn bulk_delete_by_ids(&self, ids: &[RecordId]) -> Result<(), StoreError> {
        self.apply(&ChangeSet {
            delete: ids.to_vec(),
            ..ChangeSet::default()
        })
    }

    fn get(&self, id: RecordId) -> Result<Option<Record>, StoreError> {
        Ok(self.get_record(id))
    }

    fn put(&self, record: &Record) -> Result<(), StoreError> {
        self.check_writable()?;
        self.insert_raw(record.clone());
        Ok(())
    }

    fn apply(&self, changes: &ChangeSet) -> Result<(), StoreError> {
        self.apply_calls.fetch_add(1, Ordering::SeqCst);
        self.check_writable()?;
        let mut map = self.write();
        let mut next = map.clone();
        apply_to(&mut next, changes)?;
        *map = next;
        Ok(())
    }
}

/// Mock implementation of the LikedSet trait.
#[derive(Default)]
pub struct MemoryLikedSet {
    ids: RwLock<BTreeSet<RecordId>>,
    fail_writes: AtomicBool,
}

impl MemoryLikedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ids(ids: &[RecordId]) -> Self {
        let set = Self::new();
        set.write().extend(ids.iter().copied());
        set
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn ids(&self) -> Vec<RecordId> {
        self.ids
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .copied()
            .collect()
    }

    fn check_writable(&self) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database("injected write failure".to_string()));
        }
        Ok(())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeSet<RecordId>> {
        self.ids.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl LikedSet for MemoryLikedSet {
    fn contains(&self, id: RecordId) -> Result<bool, StoreError> {
        Ok(self.ids().contains(&id))
    }

    fn add(&self, id: RecordId) -> Result<(), StoreError> {
        self.check_writable()?;
        self.write().insert(id);
        Ok(())
    }

    fn remove(&self, id: RecordId) -> Result<(), StoreError> {
        self.check_writable()?;
        self.write().remove(&id);
        Ok(())
    }

    fn all_ids(&self) -> Result<Vec<RecordId>, StoreError> {
        Ok(self.ids())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    #[test]
    fn test_failed_apply_leaves_contents() {
        let store = MemoryCatalogStore::with_records(vec![fixtures::record(1, "One")]);
        let result = store.apply(&ChangeSet {
            insert: vec![fixtures::record(2, "Two")],
            update: vec![fixtures::record(9, "Missing")],
            delete: vec![1],
        });

        assert!(matches!(result, Err(StoreError::NotFound(9))));
        assert_eq!(store.ids(), vec![1]);
    }

    #[test]
    fn test_injected_failure() {
        let liked = MemoryLikedSet::with_ids(&[1]);
        liked.set_fail_writes(true);
        assert!(liked.add(2).is_err());
        assert_eq!(liked.ids(), vec![1]);
    }
}
