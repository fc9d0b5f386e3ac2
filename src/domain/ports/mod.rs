//! Port definitions.

mod event_sink_port;
mod image_loader_port;

pub use event_sink_port::{EventSink, NullEventSink};
pub use image_loader_port::{ImageLoader, LoadOptions, loader_fn};
