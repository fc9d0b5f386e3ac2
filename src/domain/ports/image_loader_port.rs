//! Port for scheme-specific image loaders.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::domain::entities::Image;
use crate::domain::errors::CacheResult;

/// Options passed through to loaders unchanged.
///
/// Render hints only; loaders are free to ignore them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoadOptions {
    /// Preferred decoded width, if the caller knows its target surface.
    pub requested_width: Option<u32>,
    /// Preferred decoded height.
    pub requested_height: Option<u32>,
}

/// Port for loading images by identifier.
///
/// Recoverable failures must be reported through the returned future, never
/// by panicking.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    /// Resolves an image identifier into an image object.
    async fn load(&self, image_id: &str, options: &LoadOptions) -> CacheResult<Image>;
}

struct FnLoader<F>(F);

#[async_trait]
impl<F> ImageLoader for FnLoader<F>
where
    F: Fn(&str, &LoadOptions) -> BoxFuture<'static, CacheResult<Image>> + Send + Sync,
{
    async fn load(&self, image_id: &str, options: &LoadOptions) -> CacheResult<Image> {
        (self.0)(image_id, options).await
    }
}

/// Wraps a plain function as an [`ImageLoader`].
///
/// Convenient for tests and for callers that do not want a dedicated type
/// per scheme.
pub fn loader_fn<F>(f: F) -> Arc<dyn ImageLoader>
where
    F: Fn(&str, &LoadOptions) -> BoxFuture<'static, CacheResult<Image>> + Send + Sync + 'static,
{
    Arc::new(FnLoader(f))
}

#[cfg(test)]
mod tests {
    use futures_util::FutureExt;

    use super::*;

    #[tokio::test]
    async fn test_loader_fn_adapter() {
        let loader = loader_fn(|image_id, _options| {
            let image = Image::new(image_id, 42);
            async move { Ok(image) }.boxed()
        });

        let image = loader.load("mem://a", &LoadOptions::default()).await.unwrap();
        assert_eq!(image.image_id, "mem://a");
        assert_eq!(image.size_in_bytes, Some(42));
    }
}
