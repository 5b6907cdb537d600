use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use shared::protocol::Topic;
use tracing::debug;

use crate::event_bus::{EventBus, Subscription};

/// Counts the bus events after which views must query the store again:
/// `ReloadView`, and `StoreInitialized` when a store becomes available.
/// A view compares `generation()` with the value it last rendered at.
pub struct ViewRefresh {
    generation: Arc<AtomicU64>,
    _subscriptions: [Subscription; 2],
}

impl ViewRefresh {
    pub fn watch(bus: &EventBus) -> Self {
        let generation = Arc::new(AtomicU64::new(0));
        let bump = |topic: Topic| {
            let generation = Arc::clone(&generation);
            bus.subscribe(topic, move |event| {
                let now = generation.fetch_add(1, Ordering::AcqRel) + 1;
                debug!(?event, generation = now, "views are stale");
            })
        };
        let subscriptions = [bump(Topic::StoreInitialized), bump(Topic::ReloadView)];
        Self {
            generation,
            _subscriptions: subscriptions,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub fn is_stale(&self, rendered_at: u64) -> bool {
        self.generation() != rendered_at
    }
}

#[cfg(test)]
#[path = "tests/refresh_tests.rs"]
mod tests;
