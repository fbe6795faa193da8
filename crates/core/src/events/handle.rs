use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::CatalogEvent;

/// Envelope wrapping an event with its emission time
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: CatalogEvent,
}

/// Handle for emitting catalog events
///
/// This is cheaply cloneable and can be shared across tasks. Events travel
/// through a bounded channel to the single [`EventReceiver`].
#[derive(Clone)]
pub struct EventHandle {
    tx: Option<mpsc::Sender<EventEnvelope>>,
}

impl EventHandle {
    pub fn new(tx: mpsc::Sender<EventEnvelope>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A handle that drops every event.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Try to emit an event without waiting
    ///
    /// Returns true if the event was queued.
    pub fn try_emit(&self, event: CatalogEvent) -> bool {
        let Some(tx) = &self.tx else { return false };
        match tx.try_send(wrap(event)) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Dropped catalog event: {}", e);
                false
            }
        }
    }
}

fn wrap(event: CatalogEvent) -> EventEnvelope {
    EventEnvelope {
        timestamp: Utc::now(),
        event,
    }
}

/// The delivery side of the event channel. Exactly one exists per channel;
/// the task holding it is the delivery context.
pub struct EventReceiver {
    rx: mpsc::Receiver<EventEnvelope>,
}

impl EventReceiver {
    pub fn new(rx: mpsc::Receiver<EventEnvelope>) -> Self {
        Self { rx }
    }

    pub async fn recv(&mut self) -> Option<EventEnvelope> {
        self.rx.recv().await
    }

    /// Take every event already queued.
    pub fn drain(&mut self) -> Vec<EventEnvelope> {
        let mut out = Vec::new();
        while let Ok(envelope) = self.rx.try_recv() {
            out.push(envelope);
        }
        out
    }

    /// Deliver events to `deliver` until every handle is dropped.
    pub async fn run<F>(mut self, mut deliver: F)
    where
        F: FnMut(EventEnvelope),
    {
        while let Some(envelope) = self.rx.recv().await {
            deliver(envelope);
        }
        tracing::debug!("Event channel closed");
    }
}

/// Create a connected handle/receiver pair
pub fn create_event_channel(buffer_size: usize) -> (EventHandle, EventReceiver) {
    let (tx, rx) = mpsc::channel(buffer_size.max(1));
    (EventHandle::new(tx), EventReceiver::new(rx))
}
