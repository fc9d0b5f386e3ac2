//! Cache and loader dispatch error types.

use thiserror::Error;

/// Result type for cache and dispatch operations.
pub type CacheResult<T> = std::result::Result<T, CacheError>;

/// Cache and dispatch error variants.
///
/// The enum is `Clone` because settlement results travel through a shared
/// future observed by every holder of the same promise handle.
#[derive(Debug, Clone, Error)]
#[allow(missing_docs)]
pub enum CacheError {
    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("image {image_id} is already cached")]
    DuplicateKey { image_id: String },

    #[error("image {image_id} is not in the cache")]
    NotFound { image_id: String },

    #[error("cached object for {image_id} has no usable byte size")]
    InvalidCacheableObject { image_id: String },

    #[error("no image loader available for scheme {scheme:?}")]
    NoLoaderAvailable { scheme: String },

    #[error("image load failed: {message}")]
    LoadFailed { message: String },
}

impl CacheError {
    /// Creates an invalid argument error.
    #[must_use]
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// Creates a duplicate key error.
    #[must_use]
    pub fn duplicate_key(image_id: impl Into<String>) -> Self {
        Self::DuplicateKey {
            image_id: image_id.into(),
        }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(image_id: impl Into<String>) -> Self {
        Self::NotFound {
            image_id: image_id.into(),
        }
    }

    /// Creates an invalid cacheable object error.
    #[must_use]
    pub fn invalid_cacheable_object(image_id: impl Into<String>) -> Self {
        Self::InvalidCacheableObject {
            image_id: image_id.into(),
        }
    }

    /// Creates a load failed error.
    #[must_use]
    pub fn load_failed(message: impl Into<String>) -> Self {
        Self::LoadFailed {
            message: message.into(),
        }
    }
}
