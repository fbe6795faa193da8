//! Event delivery from background work to the single delivery context.

mod handle;
mod types;

pub use handle::{create_event_channel, EventEnvelope, EventHandle, EventReceiver};
pub use types::*;
