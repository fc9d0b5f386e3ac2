//! Image caching and loader dispatch infrastructure.
//!
//! This module provides:
//! - A byte-budgeted promise cache with LRU eviction
//! - A scheme-keyed loader registry and dispatcher

pub mod promise_cache;
pub mod registry;

pub use promise_cache::{DEFAULT_MAXIMUM_SIZE_IN_BYTES, ImageCache, ImageCacheConfig};
pub use registry::{LoadFuture, LoaderRegistry, parse_scheme};
