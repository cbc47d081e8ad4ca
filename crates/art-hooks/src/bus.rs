//! Typed pub/sub hook bus (spec §4.7).
//!
//! Synchronous fan-out under a read lock: publish takes the reader lock
//! and calls every subscriber in registration order; registration takes
//! the writer lock (spec §5 "Shared resources"). A subscriber that panics
//! or returns an error is logged and does not stop delivery to the rest —
//! a misbehaving subscriber (e.g. a memory writer) can never break a run.

use parking_lot::RwLock;

use crate::event::HookEnvelope;

pub trait Subscriber: Send + Sync {
    fn on_event(&self, event: &HookEnvelope) -> Result<(), String>;

    /// A short name used in warning logs when this subscriber fails.
    fn name(&self) -> &str {
        "subscriber"
    }
}

#[derive(Default)]
pub struct HookBus {
    subscribers: RwLock<Vec<Box<dyn Subscriber>>>,
}

impl HookBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. Subscribers register once; there is no
    /// unregister — the bus lives for the lifetime of the orchestrator.
    pub fn subscribe(&self, subscriber: Box<dyn Subscriber>) {
        self.subscribers.write().push(subscriber);
    }

    /// Fan out `event` to every subscriber in registration order.
    /// Subscriber failures are caught and logged, never propagated.
    pub fn publish(&self, event: HookEnvelope) {
        let subscribers = self.subscribers.read();
        for sub in subscribers.iter() {
            if let Err(e) = sub.on_event(&event) {
                tracing::warn!(subscriber = sub.name(), error = %e, "hook subscriber failed");
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}
