//! Typed events announcing cache-state transitions.

use serde::Serialize;

use crate::domain::entities::CacheInfo;

/// A cache-state transition, published through the event sink port.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum CacheEvent {
    /// The set of cached entries or the aggregate byte count changed.
    CacheChanged(CacheInfo),
    /// An eviction pass finished while still over the byte budget.
    CacheFull(CacheInfo),
    /// An entry was evicted by the eviction pass.
    PromiseRemoved {
        /// Identifier of the evicted entry.
        image_id: String,
        /// Snapshot taken after the removal.
        cache_info: CacheInfo,
    },
    /// The byte budget was reconfigured.
    MaximumSizeChanged(CacheInfo),
}

/// Discriminant used to subscribe to one class of cache event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheEventKind {
    /// Matches [`CacheEvent::CacheChanged`].
    CacheChanged,
    /// Matches [`CacheEvent::CacheFull`].
    CacheFull,
    /// Matches [`CacheEvent::PromiseRemoved`].
    PromiseRemoved,
    /// Matches [`CacheEvent::MaximumSizeChanged`].
    MaximumSizeChanged,
}

impl CacheEvent {
    /// Returns the discriminant for subscription matching.
    #[must_use]
    pub const fn kind(&self) -> CacheEventKind {
        match self {
            Self::CacheChanged(_) => CacheEventKind::CacheChanged,
            Self::CacheFull(_) => CacheEventKind::CacheFull,
            Self::PromiseRemoved { .. } => CacheEventKind::PromiseRemoved,
            Self::MaximumSizeChanged(_) => CacheEventKind::MaximumSizeChanged,
        }
    }

    /// Returns the logical event name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::CacheChanged(_) => "image-cache-changed",
            Self::CacheFull(_) => "image-cache-full",
            Self::PromiseRemoved { .. } => "image-cache-promise-removed",
            Self::MaximumSizeChanged(_) => "image-cache-max-size-changed",
        }
    }
}
