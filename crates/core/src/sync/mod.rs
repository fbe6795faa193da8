//! Catalog synchronisation and record management.

mod coordinator;
mod gate;
mod types;

pub use coordinator::SyncCoordinator;
pub use gate::{InFlightGuard, WriteGate};
pub use types::*;
