//! Typed publish/subscribe bus for cache events.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::warn;

use crate::domain::events::{CacheEvent, CacheEventKind};
use crate::domain::ports::EventSink;

/// Callback registered for one event kind.
pub type EventCallback = Arc<dyn Fn(&CacheEvent) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// In-process event bus with synchronous delivery.
///
/// Subscribers are keyed by event kind. Delivery clones the subscriber list
/// out of the lock, so callbacks may re-enter the bus or the cache.
#[derive(Default)]
pub struct EventBus {
    subscribers: Mutex<HashMap<CacheEventKind, Vec<(SubscriptionId, EventCallback)>>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Creates an empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback for one event kind.
    pub fn subscribe(
        &self,
        kind: CacheEventKind,
        callback: impl Fn(&CacheEvent) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .lock()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(callback)));
        id
    }

    /// Removes a subscription. Returns true if it was still registered.
    pub fn unsubscribe(&self, kind: CacheEventKind, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let Some(list) = subscribers.get_mut(&kind) else {
            return false;
        };
        let before = list.len();
        list.retain(|(sub_id, _)| *sub_id != id);
        before != list.len()
    }

    /// Returns the number of subscriptions for one event kind.
    #[must_use]
    pub fn subscriber_count(&self, kind: CacheEventKind) -> usize {
        self.subscribers.lock().get(&kind).map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").finish_non_exhaustive()
    }
}

impl EventSink for EventBus {
    fn publish(&self, event: &CacheEvent) {
        let callbacks: Vec<EventCallback> = {
            let subscribers = self.subscribers.lock();
            match subscribers.get(&event.kind()) {
                Some(list) => list.iter().map(|(_, cb)| cb.clone()).collect(),
                None => return,
            }
        };

        for callback in callbacks {
            // One panicking subscriber must not starve the rest.
            if catch_unwind(AssertUnwindSafe(|| callback(event))).is_err() {
                warn!(event = event.name(), "Event subscriber panicked");
            }
        }
    }
}
