//! Domain entity definitions.

mod cache_info;
mod image;

pub use cache_info::CacheInfo;
pub use image::{Image, ImagePromise};
