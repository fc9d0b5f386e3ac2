//! Aggregate cache statistics snapshot.

use serde::Serialize;

/// Read-only snapshot of aggregate cache state.
///
/// Used for diagnostics and carried as the payload of cache events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheInfo {
    /// Configured byte budget.
    pub maximum_size_in_bytes: u64,
    /// Sum of the recorded sizes of all settled entries.
    pub cache_size_in_bytes: u64,
    /// Number of entries in the cache, settled or provisional.
    pub number_of_images_cached: usize,
}

impl std::fmt::Display for CacheInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} images, {}/{} bytes",
            self.number_of_images_cached, self.cache_size_in_bytes, self.maximum_size_in_bytes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialized_shape() {
        let info = CacheInfo {
            maximum_size_in_bytes: 1000,
            cache_size_in_bytes: 300,
            number_of_images_cached: 3,
        };

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["maximum_size_in_bytes"], 1000);
        assert_eq!(json["cache_size_in_bytes"], 300);
        assert_eq!(json["number_of_images_cached"], 3);
    }

    #[test]
    fn test_display() {
        let info = CacheInfo {
            maximum_size_in_bytes: 1000,
            cache_size_in_bytes: 300,
            number_of_images_cached: 3,
        };
        assert_eq!(info.to_string(), "3 images, 300/1000 bytes");
    }
}
