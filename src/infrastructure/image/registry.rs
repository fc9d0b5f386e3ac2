//! Scheme-keyed loader registry and dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::domain::entities::Image;
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::ports::{ImageLoader, LoadOptions};

/// Future produced by dispatching a load. Lazy; the loader runs on first poll.
pub type LoadFuture = BoxFuture<'static, CacheResult<Image>>;

/// Extracts the scheme prefix from an image identifier.
///
/// The identifier is split on the first `"://"`. `None` means no delimiter
/// is present, which routes dispatch to the unknown-loader path rather than
/// failing the parse.
#[must_use]
pub fn parse_scheme(image_id: &str) -> Option<&str> {
    image_id.split_once("://").map(|(scheme, _)| scheme)
}

#[derive(Default)]
struct RegistryState {
    scheme_to_loader: HashMap<String, Arc<dyn ImageLoader>>,
    unknown_loader: Option<Arc<dyn ImageLoader>>,
}

/// Maps identifier schemes to registered loaders and dispatches loads.
///
/// Independently constructible; holds no cache state and never touches the
/// image cache.
#[derive(Default)]
pub struct LoaderRegistry {
    inner: Mutex<RegistryState>,
}

impl LoaderRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a loader for a scheme. The last registration for a scheme
    /// wins; there is no loader chaining.
    ///
    /// # Errors
    /// [`CacheError::InvalidArgument`] if `scheme` is empty.
    pub fn register_image_loader(
        &self,
        scheme: &str,
        loader: Arc<dyn ImageLoader>,
    ) -> CacheResult<()> {
        if scheme.is_empty() {
            return Err(CacheError::invalid_argument("scheme must not be empty"));
        }
        self.inner
            .lock()
            .scheme_to_loader
            .insert(scheme.to_string(), loader);
        debug!(scheme, "Registered image loader");
        Ok(())
    }

    /// Registers the fallback loader for identifiers with no scheme match.
    ///
    /// Returns the previously registered fallback, enabling save/restore.
    pub fn register_unknown_image_loader(
        &self,
        loader: Arc<dyn ImageLoader>,
    ) -> Option<Arc<dyn ImageLoader>> {
        debug!("Registered unknown image loader");
        self.inner.lock().unknown_loader.replace(loader)
    }

    fn resolve(&self, image_id: &str) -> CacheResult<Arc<dyn ImageLoader>> {
        let scheme = parse_scheme(image_id).unwrap_or("");
        let state = self.inner.lock();

        if let Some(loader) = state.scheme_to_loader.get(scheme) {
            return Ok(loader.clone());
        }
        if let Some(loader) = &state.unknown_loader {
            trace!(id = %image_id, "Dispatching to unknown image loader");
            return Ok(loader.clone());
        }
        Err(CacheError::NoLoaderAvailable {
            scheme: scheme.to_string(),
        })
    }

    /// Dispatches a load to the loader registered for the identifier's
    /// scheme, falling back to the unknown loader.
    ///
    /// The returned future is the loader's own load, unwrapped by the cache;
    /// it does not run until polled.
    ///
    /// # Errors
    /// [`CacheError::InvalidArgument`] if `image_id` is empty,
    /// [`CacheError::NoLoaderAvailable`] if no scheme match and no fallback
    /// exists.
    pub fn load_image(&self, image_id: &str, options: LoadOptions) -> CacheResult<LoadFuture> {
        if image_id.is_empty() {
            return Err(CacheError::invalid_argument("image_id must not be empty"));
        }
        let loader = self.resolve(image_id)?;
        let image_id = image_id.to_string();
        Ok(async move { loader.load(&image_id, &options).await }.boxed())
    }
}

impl std::fmt::Debug for LoaderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.lock();
        f.debug_struct("LoaderRegistry")
            .field("schemes", &state.scheme_to_loader.len())
            .field("has_unknown_loader", &state.unknown_loader.is_some())
            .finish_non_exhaustive()
    }
}
