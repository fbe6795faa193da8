//! Diff-based synchronisation of the local catalog against the remote one.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use super::{LikedSyncResult, SyncError, SyncOptions, SyncResult, SyncSource, WriteGate};
use crate::auth::is_real_user_id;
use crate::catalog::{
    reconcile, renumber_steps, validate_draft, Record, RecordDraft, RecordId, StepList,
};
use crate::error::ErrorKind;
use crate::events::{CatalogEvent, EventHandle};
use crate::metrics;
use crate::remote::CatalogApi;
use crate::store::{run_blocking, ChangeSet, LikedSet, LocalCatalogStore, StoreError};

/// Owns every write to the record table outside of like toggles.
pub struct SyncCoordinator {
    api: Arc<CatalogApi>,
    store: Arc<dyn LocalCatalogStore>,
    liked: Arc<dyn LikedSet>,
    gate: WriteGate,
    events: EventHandle,
    options: SyncOptions,
}

impl SyncCoordinator {
    pub fn new(
        api: Arc<CatalogApi>,
        store: Arc<dyn LocalCatalogStore>,
        liked: Arc<dyn LikedSet>,
        gate: WriteGate,
        events: EventHandle,
        options: SyncOptions,
    ) -> Self {
        Self {
            api,
            store,
            liked,
            gate,
            events,
            options,
        }
    }

    /// Bring the local catalog in line with the remote one.
    ///
    /// Inserts, full replacements and deletions land in one transaction,
    /// with `liked` materialised from a snapshot of the liked set. When the
    /// remote is unreachable the cached catalog is returned with
    /// `source = Cache` and a warning, and nothing local changes.
    pub async fn sync(&self) -> Result<SyncResult, SyncError> {
        let executor = self.api.executor();
        if !executor.is_online() {
            return self
                .serve_cache(ErrorKind::Offline, "no network connection".to_string())
                .await;
        }

        let signed_in = is_real_user_id(executor.user_id().as_deref());
        let liked_fetch = async {
            if signed_in {
                Some(self.api.list_liked_ids().await)
            } else {
                None
            }
        };
        let (listing, liked_ids) =
            futures::future::join(self.api.list_catalog(), liked_fetch).await;

        let listing = match listing {
            Ok(listing) => listing,
            Err(e) if e.kind().is_network() || e.kind() == ErrorKind::Malformed => {
                warn!(error = %e, "Catalog fetch failed, falling back to cache");
                return self.serve_cache(e.kind(), e.to_string()).await;
            }
            Err(e) => {
                metrics::SYNC_RUNS.with_label_values(&["failed"]).inc();
                return Err(e.into());
            }
        };

        let skipped = listing.skipped.len();
        if skipped > 0 {
            metrics::SYNC_SKIPPED.inc_by(skipped as u64);
        }

        if listing.records.is_empty() && !self.options.trust_empty_remote {
            let store = self.store.clone();
            let local_ids = run_blocking(move || store.all_ids()).await?;
            if !local_ids.is_empty() {
                warn!(
                    cached = local_ids.len(),
                    "Remote catalog is empty, keeping cached records"
                );
                return self
                    .serve_cache(
                        ErrorKind::Permanent,
                        "remote returned an empty catalog".to_string(),
                    )
                    .await;
            }
        }

        let remote_liked = match liked_ids {
            Some(Ok(ids)) => Some(ids),
            Some(Err(e)) => {
                warn!(error = %e, "Liked id fetch failed, using local liked set");
                None
            }
            None => {
                debug!("No signed-in user, skipping liked id fetch");
                None
            }
        };

        let _guard = self.gate.lock().await;

        // Records commit first; the liked set follows only once they did.
        let in_flight = self.gate.in_flight_ids();
        let store = self.store.clone();
        let liked = self.liked.clone();
        let remote = listing.records;
        let liked_plan = remote_liked.clone();
        let (changes, records) = run_blocking(move || {
            let local_liked: HashSet<RecordId> = liked.all_ids()?.into_iter().collect();
            let liked_ids = match liked_plan {
                Some(ids) => project_liked(&local_liked, &ids, &in_flight),
                None => local_liked,
            };
            let local_ids = store.all_ids()?;
            let remote_ids: Vec<RecordId> = remote.iter().map(|r| r.id).collect();
            let plan = reconcile(&remote_ids, &local_ids);
            let to_add: HashSet<RecordId> = plan.to_add.iter().copied().collect();

            let mut changes = ChangeSet {
                delete: plan.to_remove,
                ..ChangeSet::default()
            };
            for mut record in remote {
                record.liked = liked_ids.contains(&record.id);
                if to_add.contains(&record.id) {
                    changes.insert.push(record);
                } else {
                    changes.update.push(record);
                }
            }

            if remote_ids.is_empty() && !changes.delete.is_empty() {
                warn!(
                    cleared = changes.delete.len(),
                    "Remote catalog is empty, clearing local records"
                );
            }

            if !changes.is_empty() {
                store.apply(&changes)?;
            }
            Ok((changes, store.get_all()?))
        })
        .await?;

        if let Some(ids) = remote_liked {
            let result = self.apply_liked_ids(ids).await?;
            debug!(
                added = result.added.len(),
                removed = result.removed.len(),
                deferred = result.deferred.len(),
                "Liked ids reconciled"
            );
        }

        metrics::SYNC_RUNS.with_label_values(&["remote"]).inc();
        metrics::SYNC_RECORDS
            .with_label_values(&["added"])
            .inc_by(changes.insert.len() as u64);
        metrics::SYNC_RECORDS
            .with_label_values(&["updated"])
            .inc_by(changes.update.len() as u64);
        metrics::SYNC_RECORDS
            .with_label_values(&["removed"])
            .inc_by(changes.delete.len() as u64);

        info!(
            added = changes.insert.len(),
            updated = changes.update.len(),
            removed = changes.delete.len(),
            skipped,
            "Sync completed"
        );
        self.events.try_emit(CatalogEvent::SyncCompleted {
            source: SyncSource::Remote,
            added: changes.insert.len(),
            updated: changes.update.len(),
            removed: changes.delete.len(),
            skipped,
        });

        Ok(SyncResult {
            added: changes.insert,
            updated: changes.update,
            removed_ids: changes.delete,
            records,
            source: SyncSource::Remote,
            skipped,
            degraded: None,
            synced_at: Utc::now(),
        })
    }

    /// Reconcile the local liked set with the server's liked ids.
    /// Ids with a toggle in flight are left untouched.
    pub async fn sync_liked_ids(&self) -> Result<LikedSyncResult, SyncError> {
        let executor = self.api.executor();
        if !executor.is_online() {
            return Err(SyncError::Offline);
        }
        if !is_real_user_id(executor.user_id().as_deref()) {
            return Err(SyncError::Unauthenticated);
        }

        let ids = self.api.list_liked_ids().await?;
        let _guard = self.gate.lock().await;
        Ok(self.apply_liked_ids(ids).await?)
    }

    /// Cached catalog with `liked` taken from the liked set.
    pub async fn cached_records(&self) -> Result<Vec<Record>, SyncError> {
        let store = self.store.clone();
        let liked = self.liked.clone();
        let records = run_blocking(move || {
            let liked_ids: HashSet<RecordId> = liked.all_ids()?.into_iter().collect();
            let mut records = store.get_all()?;
            for record in &mut records {
                record.liked = liked_ids.contains(&record.id);
            }
            Ok(records)
        })
        .await?;
        Ok(records)
    }

    /// Create a record remotely, then store it locally under the returned id.
    pub async fn create_record(
        &self,
        user_id: &str,
        mut draft: RecordDraft,
    ) -> Result<Record, SyncError> {
        self.require_session(user_id)?;
        draft.steps = StepList::from_steps(draft.steps).prepare_for_saving();
        validate_draft(&draft)?;

        let ack = self.api.create_record(&draft).await?;
        let record = draft.into_record(ack.id, Some(user_id.to_string()), ack.photo_url);

        let _guard = self.gate.lock().await;
        let store = self.store.clone();
        let stored = record.clone();
        run_blocking(move || store.put(&stored)).await?;

        info!(record_id = record.id, "Record created");
        self.events
            .try_emit(CatalogEvent::RecordCreated { record_id: record.id });
        Ok(record)
    }

    /// Replace a record's content remotely, then locally. `liked` and
    /// `created_at` keep their local values. Only the owner of the cached
    /// record or an administrator may update it.
    pub async fn update_record(
        &self,
        user_id: &str,
        mut record: Record,
    ) -> Result<Record, SyncError> {
        self.require_session(user_id)?;
        let cached = self.cached_record(record.id).await?;
        let owner_source = cached.as_ref().unwrap_or(&record);
        self.require_modify_rights(user_id, record.id, Some(owner_source))?;
        renumber_steps(&mut record.steps);
        let draft = RecordDraft::from(&record);
        validate_draft(&draft)?;

        let ack = self.api.update_record(record.id, &draft).await?;

        let _guard = self.gate.lock().await;
        let store = self.store.clone();
        let liked = self.liked.clone();
        let updated = run_blocking(move || {
            let existing = store.get(record.id)?;
            let mut next = record;
            next.liked = liked.contains(next.id)?;
            next.photo_url = ack.photo_url.or(next.photo_url);
            if let Some(existing) = existing {
                next.created_at = existing.created_at.or(next.created_at);
                next.owner_id = next.owner_id.or(existing.owner_id);
            }
            store.put(&next)?;
            Ok::<_, StoreError>(next)
        })
        .await?;

        info!(record_id = updated.id, "Record updated");
        self.events
            .try_emit(CatalogEvent::RecordUpdated { record_id: updated.id });
        Ok(updated)
    }

    /// Delete remotely; once confirmed, drop the record and its like locally.
    /// A record missing from the cache can only be deleted by an administrator.
    pub async fn delete_record(&self, user_id: &str, id: RecordId) -> Result<(), SyncError> {
        self.require_session(user_id)?;
        let cached = self.cached_record(id).await?;
        self.require_modify_rights(user_id, id, cached.as_ref())?;
        self.api.delete_record(id).await?;

        let _guard = self.gate.lock().await;
        let store = self.store.clone();
        let liked = self.liked.clone();
        run_blocking(move || {
            store.bulk_delete_by_ids(&[id])?;
            liked.remove(id)
        })
        .await?;

        info!(record_id = id, "Record deleted");
        self.events
            .try_emit(CatalogEvent::RecordDeleted { record_id: id });
        Ok(())
    }

    fn require_session(&self, user_id: &str) -> Result<(), SyncError> {
        if !self.api.executor().is_online() {
            return Err(SyncError::Offline);
        }
        if !is_real_user_id(Some(user_id)) {
            return Err(SyncError::Unauthenticated);
        }
        Ok(())
    }

    fn require_modify_rights(
        &self,
        user_id: &str,
        id: RecordId,
        record: Option<&Record>,
    ) -> Result<(), SyncError> {
        if self.api.executor().permission().is_admin()
            || record.is_some_and(|r| r.is_owned_by(user_id))
        {
            return Ok(());
        }
        warn!(record_id = id, user_id, "Not the owner of the record, refusing to modify it");
        Err(SyncError::PermissionDenied(id))
    }

    async fn cached_record(&self, id: RecordId) -> Result<Option<Record>, SyncError> {
        let store = self.store.clone();
        Ok(run_blocking(move || store.get(id)).await?)
    }

    /// Caller must hold the write gate.
    async fn apply_liked_ids(
        &self,
        remote_ids: Vec<RecordId>,
    ) -> Result<LikedSyncResult, StoreError> {
        let in_flight = self.gate.in_flight_ids();
        let store = self.store.clone();
        let liked = self.liked.clone();

        run_blocking(move || {
            let local_ids = liked.all_ids()?;
            let plan = reconcile(&remote_ids, &local_ids);
            let mut result = LikedSyncResult::default();
            if plan.is_noop() {
                return Ok(result);
            }

            for (ids, target) in [(plan.to_add, true), (plan.to_remove, false)] {
                for id in ids {
                    if in_flight.contains(&id) {
                        result.deferred.push(id);
                        continue;
                    }
                    if target {
                        liked.add(id)?;
                        result.added.push(id);
                    } else {
                        liked.remove(id)?;
                        result.removed.push(id);
                    }
                    if let Some(mut record) = store.get(id)? {
                        if record.liked != target {
                            record.liked = target;
                            store.put(&record)?;
                        }
                    }
                }
            }
            Ok(result)
        })
        .await
    }

    async fn serve_cache(&self, kind: ErrorKind, reason: String) -> Result<SyncResult, SyncError> {
        let records = self.cached_records().await?;
        if records.is_empty() {
            metrics::SYNC_RUNS.with_label_values(&["failed"]).inc();
            return Err(SyncError::NoCachedData { kind, reason });
        }

        warn!(%reason, records = records.len(), "Serving cached catalog");
        metrics::SYNC_RUNS.with_label_values(&["cache"]).inc();
        self.events.try_emit(CatalogEvent::SyncDegraded {
            reason: reason.clone(),
        });

        Ok(SyncResult {
            added: Vec::new(),
            updated: Vec::new(),
            removed_ids: Vec::new(),
            records,
            source: SyncSource::Cache,
            skipped: 0,
            degraded: Some(reason),
            synced_at: Utc::now(),
        })
    }
}

/// Liked set as it will be once `remote` is applied; ids with a toggle in
/// flight keep their local membership.
fn project_liked(
    local: &HashSet<RecordId>,
    remote: &[RecordId],
    in_flight: &HashSet<RecordId>,
) -> HashSet<RecordId> {
    remote
        .iter()
        .filter(|id| !in_flight.contains(id))
        .chain(local.iter().filter(|id| in_flight.contains(id)))
        .copied()
        .collect()
}
