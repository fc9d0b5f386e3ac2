//! Port for publishing cache events.

use crate::domain::events::CacheEvent;

/// Consumed notification contract.
///
/// `publish` is fire-and-forget with synchronous delivery; implementations
/// must not let one subscriber prevent delivery to the rest.
pub trait EventSink: Send + Sync {
    /// Publishes a cache event to all interested subscribers.
    fn publish(&self, event: &CacheEvent);
}

/// Sink that drops every event, for callers that want an event-free cache.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn publish(&self, _event: &CacheEvent) {}
}

#[cfg(test)]
#[allow(dead_code)]
pub mod mock {
    use std::sync::{Arc, Mutex};

    use super::*;

    /// Sink that records every published event for assertions.
    #[derive(Default)]
    pub struct RecordingEventSink {
        pub events: Arc<Mutex<Vec<CacheEvent>>>,
    }

    impl RecordingEventSink {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn names(&self) -> Vec<&'static str> {
            self.events.lock().unwrap().iter().map(CacheEvent::name).collect()
        }

        pub fn take(&self) -> Vec<CacheEvent> {
            std::mem::take(&mut *self.events.lock().unwrap())
        }
    }

    impl EventSink for RecordingEventSink {
        fn publish(&self, event: &CacheEvent) {
            self.events.lock().unwrap().push(event.clone());
        }
    }
}
