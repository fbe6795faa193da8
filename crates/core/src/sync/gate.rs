use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tokio::sync::MutexGuard;

use crate::catalog::RecordId;

/// Serialises writers of the record table and the liked set, and tracks
/// which records have a like toggle awaiting remote confirmation.
///
/// Cloning shares the same gate.
#[derive(Clone, Default)]
pub struct WriteGate {
    lock: Arc<tokio::sync::Mutex<()>>,
    in_flight: Arc<Mutex<HashSet<RecordId>>>,
}

impl WriteGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Exclusive access to both tables until the guard drops.
    pub async fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    /// Mark `id` as having a toggle in flight until the guard drops.
    pub fn mark_in_flight(&self, id: RecordId) -> InFlightGuard {
        self.ids().insert(id);
        InFlightGuard {
            id,
            in_flight: self.in_flight.clone(),
        }
    }

    pub fn is_in_flight(&self, id: RecordId) -> bool {
        self.ids().contains(&id)
    }

    pub fn in_flight_ids(&self) -> HashSet<RecordId> {
        self.ids().clone()
    }

    fn ids(&self) -> std::sync::MutexGuard<'_, HashSet<RecordId>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Clears the in-flight mark on drop.
pub struct InFlightGuard {
    id: RecordId,
    in_flight: Arc<Mutex<HashSet<RecordId>>>,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.id);
    }
}
