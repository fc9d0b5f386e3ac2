//! Domain layer with core entities, events, and port definitions.

/// Entity definitions.
pub mod entities;
/// Error types.
pub mod errors;
/// Typed cache event definitions.
pub mod events;
/// Port definitions.
pub mod ports;

pub use entities::{CacheInfo, Image, ImagePromise};
pub use errors::{CacheError, CacheResult};
pub use events::{CacheEvent, CacheEventKind};
pub use ports::{EventSink, ImageLoader, LoadOptions};
