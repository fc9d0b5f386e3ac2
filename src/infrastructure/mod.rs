//! Infrastructure layer containing adapters behind the domain ports.

/// Typed publish/subscribe event bus.
pub mod events;
/// Image cache and loader dispatch.
pub mod image;
