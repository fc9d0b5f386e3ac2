//! Composed load-and-cache flow over the registry and the cache.

use std::sync::Arc;

use tracing::trace;

use crate::domain::entities::ImagePromise;
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::LoadOptions;
use crate::infrastructure::image::{ImageCache, LoadFuture, LoaderRegistry};

/// Orchestrates loader dispatch with cache-backed de-duplication.
#[derive(Debug, Clone)]
pub struct ImageService {
    registry: Arc<LoaderRegistry>,
    cache: ImageCache,
}

impl ImageService {
    /// Creates a service over an existing registry and cache.
    #[must_use]
    pub fn new(registry: Arc<LoaderRegistry>, cache: ImageCache) -> Self {
        Self { registry, cache }
    }

    /// The loader registry backing this service.
    #[must_use]
    pub fn registry(&self) -> &Arc<LoaderRegistry> {
        &self.registry
    }

    /// The image cache backing this service.
    #[must_use]
    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Dispatches a load without touching the cache.
    ///
    /// # Errors
    /// [`CacheError::InvalidArgument`] for an empty identifier,
    /// [`CacheError::NoLoaderAvailable`] when dispatch finds no loader.
    pub fn load_image(&self, image_id: &str, options: LoadOptions) -> CacheResult<LoadFuture> {
        self.registry.load_image(image_id, options)
    }

    /// Dispatches a load and stores the promise in the cache.
    ///
    /// Repeated calls for the same identifier share one in-flight load and
    /// one entry: a cache hit returns the stored handle, and the loader is
    /// invoked at most once per cached key because the dispatch future is
    /// lazy and only the winning put's future is ever polled.
    ///
    /// # Errors
    /// Same as [`ImageService::load_image`].
    pub fn load_and_cache_image(
        &self,
        image_id: &str,
        options: LoadOptions,
    ) -> CacheResult<ImagePromise> {
        loop {
            if let Some(promise) = self.cache.get_image_promise(image_id)? {
                trace!(id = %image_id, "Reusing cached image promise");
                return Ok(promise);
            }

            let load = self.registry.load_image(image_id, options)?;
            match self.cache.put_image_promise(image_id, load) {
                Ok(promise) => return Ok(promise),
                // Another caller inserted between the lookup and the put.
                // Their promise wins; our unpolled future never ran the
                // loader, so at most one load is in flight per key.
                Err(CacheError::DuplicateKey { .. }) => continue,
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use futures_util::FutureExt;

    use super::*;
    use crate::domain::entities::Image;
    use crate::domain::ports::loader_fn;
    use crate::infrastructure::image::ImageCacheConfig;

    fn test_service() -> ImageService {
        let registry = Arc::new(LoaderRegistry::new());
        let cache = ImageCache::new(
            ImageCacheConfig {
                maximum_size_in_bytes: 10_000,
            },
            Arc::new(crate::domain::ports::NullEventSink),
        );
        ImageService::new(registry, cache)
    }

    #[tokio::test]
    async fn test_load_image_does_not_cache() {
        let service = test_service();
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        service
            .registry()
            .register_image_loader(
                "example",
                loader_fn(move |image_id, _options| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let image = Image::new(image_id, 100);
                    async move { Ok(image) }.boxed()
                }),
            )
            .unwrap();

        let image = service
            .load_image("example://img", LoadOptions::default())
            .unwrap()
            .await
            .unwrap();

        assert_eq!(image.image_id, "example://img");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.cache().get_cache_info().number_of_images_cached, 0);
    }

    #[tokio::test]
    async fn test_load_and_cache_deduplicates_inflight_loads() {
        let service = test_service();
        let calls = Arc::new(AtomicU32::new(0));
        let (release_tx, release_rx) = tokio::sync::watch::channel(false);

        let counter = calls.clone();
        service
            .registry()
            .register_image_loader(
                "example",
                loader_fn(move |image_id, _options| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let image_id = image_id.to_string();
                    let mut release = release_rx.clone();
                    async move {
                        release
                            .wait_for(|released| *released)
                            .await
                            .map_err(|_| CacheError::load_failed("release channel closed"))?;
                        Ok(Image::new(image_id, 100))
                    }
                    .boxed()
                }),
            )
            .unwrap();

        let first = service
            .load_and_cache_image("example://img", LoadOptions::default())
            .unwrap();
        let second = service
            .load_and_cache_image("example://img", LoadOptions::default())
            .unwrap();

        release_tx.send(true).unwrap();
        let a = first.await.unwrap();
        let b = second.await.unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.cache().get_cache_info().number_of_images_cached, 1);
    }

    #[tokio::test]
    async fn test_load_and_cache_reuses_settled_entry() {
        let service = test_service();
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        service
            .registry()
            .register_image_loader(
                "example",
                loader_fn(move |image_id, _options| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    let image = Image::new(image_id, 100);
                    async move { Ok(image) }.boxed()
                }),
            )
            .unwrap();

        service
            .load_and_cache_image("example://img", LoadOptions::default())
            .unwrap()
            .await
            .unwrap();
        service
            .load_and_cache_image("example://img", LoadOptions::default())
            .unwrap()
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_load_and_cache_falls_back_to_unknown_loader() {
        let service = test_service();
        let calls = Arc::new(AtomicU32::new(0));

        let counter = calls.clone();
        service
            .registry()
            .register_unknown_image_loader(loader_fn(move |image_id, _options| {
                counter.fetch_add(1, Ordering::SeqCst);
                let image = Image::new(image_id, 100);
                async move { Ok(image) }.boxed()
            }));

        let image = service
            .load_and_cache_image("unregistered://img", LoadOptions::default())
            .unwrap()
            .await
            .unwrap();

        assert_eq!(image.image_id, "unregistered://img");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_load_and_cache_without_loader_fails() {
        let service = test_service();
        let err = service
            .load_and_cache_image("missing://img", LoadOptions::default())
            .unwrap_err();
        assert!(matches!(err, CacheError::NoLoaderAvailable { .. }));
        assert_eq!(service.cache().get_cache_info().number_of_images_cached, 0);
    }
}
