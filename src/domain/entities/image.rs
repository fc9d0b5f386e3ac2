//! The image entity produced by loaders and held by the cache.

use std::sync::Arc;

use futures_util::future::{BoxFuture, Shared};
use parking_lot::Mutex;

use crate::domain::errors::CacheResult;

/// Shared handle to an eventual image or a rejection.
///
/// The cache stores this exact handle and returns it unchanged on lookup, so
/// all requesters of the same identifier observe one settlement. The output
/// is `Clone`, which `Shared` requires.
pub type ImagePromise = Shared<BoxFuture<'static, CacheResult<Arc<Image>>>>;

/// Release hook invoked at most once when an image leaves the cache.
pub type DecacheFn = Box<dyn FnOnce() + Send>;

/// An image object produced by a loader.
///
/// Opaque to the cache except for `image_id`, `size_in_bytes`, and the
/// optional decache hook. Producers must set `size_in_bytes`; a `None` at
/// settlement is a contract violation rejected as `InvalidCacheableObject`.
pub struct Image {
    /// Identifier matching the cache key.
    pub image_id: String,
    /// Resolved byte footprint. Mandatory for cacheable images.
    pub size_in_bytes: Option<u64>,
    /// Decoded pixel payload, if the loader produced one.
    pub pixel_data: Option<Arc<image::DynamicImage>>,
    decache: Mutex<Option<DecacheFn>>,
}

impl Image {
    /// Creates an image with an explicit byte size and no pixel payload.
    #[must_use]
    pub fn new(image_id: impl Into<String>, size_in_bytes: u64) -> Self {
        Self {
            image_id: image_id.into(),
            size_in_bytes: Some(size_in_bytes),
            pixel_data: None,
            decache: Mutex::new(None),
        }
    }

    /// Creates an image with no byte size.
    ///
    /// Only usable on uncached load paths; the cache rejects a settlement
    /// without a size as `InvalidCacheableObject`.
    #[must_use]
    pub fn without_size(image_id: impl Into<String>) -> Self {
        Self {
            image_id: image_id.into(),
            size_in_bytes: None,
            pixel_data: None,
            decache: Mutex::new(None),
        }
    }

    /// Creates an image from a decoded pixel buffer.
    ///
    /// The byte size is derived from the raw buffer length.
    #[must_use]
    pub fn from_decoded(image_id: impl Into<String>, decoded: image::DynamicImage) -> Self {
        let size = decoded.as_bytes().len() as u64;
        Self {
            image_id: image_id.into(),
            size_in_bytes: Some(size),
            pixel_data: Some(Arc::new(decoded)),
            decache: Mutex::new(None),
        }
    }

    /// Attaches a decoded pixel payload without changing the recorded size.
    #[must_use]
    pub fn with_pixel_data(mut self, pixel_data: Arc<image::DynamicImage>) -> Self {
        self.pixel_data = Some(pixel_data);
        self
    }

    /// Attaches a release hook, invoked at most once on eviction or removal.
    #[must_use]
    pub fn with_decache(self, decache: impl FnOnce() + Send + 'static) -> Self {
        *self.decache.lock() = Some(Box::new(decache));
        self
    }

    /// Returns true if a release hook is attached and not yet invoked.
    #[must_use]
    pub fn has_decache(&self) -> bool {
        self.decache.lock().is_some()
    }

    /// Invokes the release hook if one is present.
    ///
    /// The hook is taken out before the call, so repeated invocations are
    /// no-ops. Called by the cache after the entry has left the map.
    pub fn release(&self) {
        let hook = self.decache.lock().take();
        if let Some(hook) = hook {
            tracing::trace!(id = %self.image_id, "Invoking decache hook");
            hook();
        }
    }
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("image_id", &self.image_id)
            .field("size_in_bytes", &self.size_in_bytes)
            .field("has_pixel_data", &self.pixel_data.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn test_from_decoded_derives_size() {
        let decoded = image::DynamicImage::new_rgb8(10, 10);
        let expected = decoded.as_bytes().len() as u64;

        let img = Image::from_decoded("mem://a", decoded);

        assert_eq!(img.size_in_bytes, Some(expected));
        assert!(img.pixel_data.is_some());
    }

    #[test]
    fn test_release_invokes_hook_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let img = Image::new("mem://a", 100)
            .with_decache(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        assert!(img.has_decache());
        img.release();
        img.release();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!img.has_decache());
    }

    #[test]
    fn test_release_without_hook_is_noop() {
        let img = Image::new("mem://a", 100);
        img.release();
        assert!(!img.has_decache());
    }
}
