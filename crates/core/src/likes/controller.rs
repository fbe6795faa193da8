//! Optimistic like toggling with rollback.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::LikeMutation;
use crate::auth::is_real_user_id;
use crate::catalog::RecordId;
use crate::error::ErrorKind;
use crate::events::{CatalogEvent, EventHandle};
use crate::metrics;
use crate::remote::CatalogApi;
use crate::store::{run_blocking, LikedSet, LocalCatalogStore, StoreError};
use crate::sync::WriteGate;
use crate::transport::ApiError;

#[derive(Debug, Error)]
pub enum LikeError {
    #[error("No network connection")]
    Offline,

    #[error("Not signed in")]
    Unauthenticated,

    #[error("Like not confirmed: {0}")]
    Remote(#[from] ApiError),

    #[error("Local store error: {0}")]
    Store(#[from] StoreError),
}

impl LikeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LikeError::Offline => ErrorKind::Offline,
            LikeError::Unauthenticated => ErrorKind::Unauthenticated,
            LikeError::Remote(e) => e.kind(),
            LikeError::Store(e) => e.kind(),
        }
    }
}

type TurnLock = Arc<tokio::sync::Mutex<()>>;

/// Applies like changes locally first, then asks the remote to confirm.
///
/// Toggles for the same record run one at a time in request order. The
/// remote endpoint flips state, so a queued request whose target already
/// holds settles as a no-op without a remote call.
pub struct LikeToggleController {
    api: Arc<CatalogApi>,
    store: Arc<dyn LocalCatalogStore>,
    liked: Arc<dyn LikedSet>,
    gate: WriteGate,
    events: EventHandle,
    turns: Mutex<HashMap<RecordId, TurnLock>>,
}

impl LikeToggleController {
    pub fn new(
        api: Arc<CatalogApi>,
        store: Arc<dyn LocalCatalogStore>,
        liked: Arc<dyn LikedSet>,
        gate: WriteGate,
        events: EventHandle,
    ) -> Self {
        Self {
            api,
            store,
            liked,
            gate,
            events,
            turns: Mutex::new(HashMap::new()),
        }
    }

    /// Set the like state of `record_id` for `user_id`.
    ///
    /// Returns the settled mutation. On a failed confirmation both the
    /// record and the liked set are restored and the error is returned.
    pub async fn set_liked(
        &self,
        user_id: &str,
        record_id: RecordId,
        liked: bool,
    ) -> Result<LikeMutation, LikeError> {
        if !self.api.executor().is_online() {
            metrics::LIKE_TOGGLES.with_label_values(&["rejected"]).inc();
            return Err(LikeError::Offline);
        }
        if !is_real_user_id(Some(user_id)) {
            metrics::LIKE_TOGGLES.with_label_values(&["rejected"]).inc();
            return Err(LikeError::Unauthenticated);
        }

        let turn = self.turn_for(record_id);
        let result = {
            let _turn = turn.lock().await;
            self.toggle(record_id, liked).await
        };
        drop(turn);
        self.release_turn(record_id);
        result
    }

    async fn toggle(&self, record_id: RecordId, target: bool) -> Result<LikeMutation, LikeError> {
        let (mut mutation, _in_flight) = {
            let _guard = self.gate.lock().await;
            let liked = self.liked.clone();
            let previous = run_blocking(move || liked.contains(record_id)).await?;
            let mutation = LikeMutation::begin(record_id, previous, target);

            if mutation.is_noop() {
                let mut mutation = mutation;
                mutation.confirm();
                debug!(record_id, liked = target, "Like state already settled");
                metrics::LIKE_TOGGLES.with_label_values(&["noop"]).inc();
                return Ok(mutation);
            }

            let in_flight = self.gate.mark_in_flight(record_id);
            self.write_like(record_id, target).await?;
            (mutation, in_flight)
        };

        self.events.try_emit(CatalogEvent::LikePending {
            record_id,
            liked: target,
        });

        match self.api.toggle_like(record_id).await {
            Ok(()) => {
                mutation.confirm();
                info!(record_id, liked = target, "Like confirmed");
                metrics::LIKE_TOGGLES.with_label_values(&["confirmed"]).inc();
                self.events.try_emit(CatalogEvent::LikeConfirmed {
                    record_id,
                    liked: target,
                });
                Ok(mutation)
            }
            Err(e) => {
                mutation.roll_back();
                warn!(record_id, error = %e, "Like not confirmed, rolling back");
                {
                    let _guard = self.gate.lock().await;
                    if let Err(rollback) = self.write_like(record_id, mutation.previous).await {
                        error!(record_id, error = %rollback, "Like rollback failed");
                    }
                }
                metrics::LIKE_TOGGLES
                    .with_label_values(&["rolled_back"])
                    .inc();
                self.events.try_emit(CatalogEvent::LikeRolledBack {
                    record_id,
                    liked: mutation.previous,
                    error: e.to_string(),
                });
                Err(e.into())
            }
        }
    }

    /// Write `value` to the liked set and the stored record together.
    /// Caller must hold the write gate.
    async fn write_like(&self, record_id: RecordId, value: bool) -> Result<(), StoreError> {
        let store = self.store.clone();
        let liked = self.liked.clone();
        run_blocking(move || {
            set_membership(liked.as_ref(), record_id, value)?;
            let Some(mut record) = store.get(record_id)? else {
                return Ok(());
            };
            if record.liked == value {
                return Ok(());
            }
            record.liked = value;
            if let Err(e) = store.put(&record) {
                if let Err(undo) = set_membership(liked.as_ref(), record_id, !value) {
                    error!(record_id, error = %undo, "Could not undo liked set change");
                }
                return Err(e);
            }
            Ok(())
        })
        .await
    }

    fn turn_for(&self, record_id: RecordId) -> TurnLock {
        let mut turns = self.turns.lock().unwrap_or_else(|e| e.into_inner());
        turns.entry(record_id).or_default().clone()
    }

    fn release_turn(&self, record_id: RecordId) {
        let mut turns = self.turns.lock().unwrap_or_else(|e| e.into_inner());
        if turns
            .get(&record_id)
            .is_some_and(|turn| Arc::strong_count(turn) == 1)
        {
            turns.remove(&record_id);
        }
    }
}

fn set_membership(liked: &dyn LikedSet, record_id: RecordId, value: bool) -> Result<(), StoreError> {
    if value {
        liked.add(record_id)
    } else {
        liked.remove(record_id)
    }
}
