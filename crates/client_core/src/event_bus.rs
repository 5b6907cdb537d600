use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, MutexGuard, Weak,
    },
};

use shared::protocol::{AppEvent, Topic};
use tracing::trace;

type Handler = Arc<dyn Fn(&AppEvent) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Registry {
    handlers: HashMap<Topic, Vec<(SubscriptionId, Handler)>>,
}

struct Inner {
    next_id: AtomicU64,
    registry: Mutex<Registry>,
}

impl Inner {
    fn registry(&self) -> MutexGuard<'_, Registry> {
        // Handlers never run under this lock, so a poisoned registry is still consistent.
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn remove(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry();
        for handlers in registry.handlers.values_mut() {
            if let Some(index) = handlers.iter().position(|(existing, _)| *existing == id) {
                handlers.remove(index);
                return true;
            }
        }
        false
    }
}

/// In-process publish/subscribe channel over a closed set of [`Topic`]s.
///
/// Delivery is synchronous: `publish` runs every handler registered for the
/// event's topic, in registration order, before returning. Nothing is
/// buffered, so events published with no subscribers are dropped and late
/// subscribers never see earlier events.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Inner>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                next_id: AtomicU64::new(1),
                registry: Mutex::new(Registry::default()),
            }),
        }
    }

    pub fn publish(&self, event: AppEvent) {
        let topic = event.topic();
        // Snapshot so handlers can subscribe or unsubscribe while being called.
        let handlers: Vec<Handler> = self
            .inner
            .registry()
            .handlers
            .get(&topic)
            .map(|handlers| handlers.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        trace!(?topic, subscribers = handlers.len(), "publish");
        for handler in handlers {
            handler(&event);
        }
    }

    /// Registers `handler` for `topic`. The handler stays registered until the
    /// returned [`Subscription`] is dropped or [`EventBus::unsubscribe`] is called.
    #[must_use = "dropping the subscription unsubscribes the handler"]
    pub fn subscribe<F>(&self, topic: Topic, handler: F) -> Subscription
    where
        F: Fn(&AppEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        self.inner
            .registry()
            .handlers
            .entry(topic)
            .or_default()
            .push((id, Arc::new(handler)));
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Removes a handler. Unknown or already removed ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.inner.remove(id);
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.inner
            .registry()
            .handlers
            .get(&topic)
            .map_or(0, Vec::len)
    }
}

/// Scoped registration on an [`EventBus`]; unsubscribes on drop.
pub struct Subscription {
    id: SubscriptionId,
    bus: Weak<Inner>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            inner.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
#[path = "tests/event_bus_tests.rs"]
mod tests;
