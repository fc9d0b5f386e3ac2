//! Application layer containing composed flows over the cache and registry.

/// Service definitions.
pub mod services;

pub use services::ImageService;
