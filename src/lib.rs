//! Pixcache - a byte-budgeted, promise-based image cache.
//!
//! This crate provides an in-memory cache for asynchronously produced images,
//! coupled to a scheme-based loader dispatch layer. Every cached value is a
//! shared promise, so concurrent requests for the same image identifier
//! observe a single in-flight load and a single settlement. Total memory is
//! bounded by a configurable byte budget enforced through least-recently-used
//! eviction, with cache-state transitions announced over a typed event bus.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

/// Application layer containing composed load-and-cache flows.
pub mod application;
/// Domain layer containing entities, events, errors, and port definitions.
pub mod domain;
/// Infrastructure layer containing the cache, registry, and event bus.
pub mod infrastructure;

/// Current version of the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name.
pub const NAME: &str = "pixcache";
