//! Byte-budgeted in-memory cache for image promises.
//!
//! Entries are shared promise handles. An entry is provisional until its
//! promise settles; only settled entries count toward the byte budget and
//! only settled entries are eligible for LRU eviction.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures_util::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use crate::domain::entities::{CacheInfo, Image, ImagePromise};
use crate::domain::errors::{CacheError, CacheResult};
use crate::domain::events::CacheEvent;
use crate::domain::ports::{EventSink, NullEventSink};

/// Default byte budget (1 GiB).
pub const DEFAULT_MAXIMUM_SIZE_IN_BYTES: u64 = 1024 * 1024 * 1024;

/// Configuration for the image cache.
#[derive(Debug, Clone, Copy)]
pub struct ImageCacheConfig {
    /// Byte budget enforced by the eviction pass.
    pub maximum_size_in_bytes: u64,
}

impl Default for ImageCacheConfig {
    fn default() -> Self {
        Self {
            maximum_size_in_bytes: DEFAULT_MAXIMUM_SIZE_IN_BYTES,
        }
    }
}

/// Settlement state of a cache entry.
///
/// A rejected promise has no state here; its entry leaves the map at
/// settlement time.
enum EntryState {
    /// Promise not yet settled; size unknown, never evicted.
    Provisional,
    /// Promise resolved; the recorded size counts toward the budget.
    Settled(Arc<Image>),
}

struct CacheEntry {
    promise: ImagePromise,
    state: EntryState,
    size_in_bytes: u64,
    time_stamp: u64,
    inserted: u64,
    /// Distinguishes this entry from a later re-put of the same key, so a
    /// late settlement cannot touch a replacement entry.
    generation: u64,
}

impl CacheEntry {
    fn settled_image(&self) -> Option<Arc<Image>> {
        match &self.state {
            EntryState::Settled(image) => Some(image.clone()),
            EntryState::Provisional => None,
        }
    }
}

struct CacheState {
    entries: HashMap<String, CacheEntry>,
    cache_size_in_bytes: u64,
    maximum_size_in_bytes: u64,
    clock: u64,
    next_generation: u64,
}

impl CacheState {
    /// Advances the logical clock. Strictly monotonic, so two accesses never
    /// share a timestamp.
    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn info(&self) -> CacheInfo {
        CacheInfo {
            maximum_size_in_bytes: self.maximum_size_in_bytes,
            cache_size_in_bytes: self.cache_size_in_bytes,
            number_of_images_cached: self.entries.len(),
        }
    }

    /// Least-recently-used settled entry; ties broken by insertion order.
    fn oldest_settled(&self) -> Option<String> {
        self.entries
            .iter()
            .filter(|(_, entry)| matches!(entry.state, EntryState::Settled(_)))
            .min_by_key(|(_, entry)| (entry.time_stamp, entry.inserted))
            .map(|(image_id, _)| image_id.clone())
    }
}

struct CacheShared {
    state: Mutex<CacheState>,
    events: Arc<dyn EventSink>,
}

/// In-memory, byte-budgeted cache of image promises.
///
/// Cheap to clone; clones share the same state container. All structural
/// errors surface synchronously, settlement errors reject the shared promise
/// handle every caller already holds.
///
/// `put_image_promise` spawns a settlement driver task and therefore must be
/// called within a Tokio runtime.
#[derive(Clone)]
pub struct ImageCache {
    inner: Arc<CacheShared>,
}

impl ImageCache {
    /// Creates a cache with the given configuration and event sink.
    #[must_use]
    pub fn new(config: ImageCacheConfig, events: Arc<dyn EventSink>) -> Self {
        Self {
            inner: Arc::new(CacheShared {
                state: Mutex::new(CacheState {
                    entries: HashMap::new(),
                    cache_size_in_bytes: 0,
                    maximum_size_in_bytes: config.maximum_size_in_bytes,
                    clock: 0,
                    next_generation: 0,
                }),
                events,
            }),
        }
    }

    /// Creates a cache with the default budget and no event delivery.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(ImageCacheConfig::default(), Arc::new(NullEventSink))
    }

    /// Reconfigures the byte budget.
    ///
    /// Lowering the budget below current usage does not retroactively evict;
    /// eviction happens on the next settling insertion.
    pub fn set_maximum_size_bytes(&self, maximum_size_in_bytes: u64) {
        let info = {
            let mut state = self.inner.state.lock();
            state.maximum_size_in_bytes = maximum_size_in_bytes;
            state.info()
        };
        debug!(maximum_size_in_bytes, "Cache byte budget changed");
        self.inner
            .events
            .publish(&CacheEvent::MaximumSizeChanged(info));
    }

    /// Stores a promise under an identifier and returns the shared handle.
    ///
    /// The entry is provisional until the promise settles. On resolution the
    /// image must carry a byte size, otherwise the shared handle rejects with
    /// [`CacheError::InvalidCacheableObject`] and the entry is dropped. On a
    /// valid resolution the size is recorded, an eviction pass runs, and a
    /// cache-changed event is published, all before the shared handle
    /// completes.
    ///
    /// # Errors
    /// [`CacheError::InvalidArgument`] if `image_id` is empty,
    /// [`CacheError::DuplicateKey`] if the identifier is already cached.
    pub fn put_image_promise<F>(&self, image_id: &str, promise: F) -> CacheResult<ImagePromise>
    where
        F: Future<Output = CacheResult<Image>> + Send + 'static,
    {
        if image_id.is_empty() {
            return Err(CacheError::invalid_argument("image_id must not be empty"));
        }

        let key = image_id.to_string();
        let shared = {
            let mut state = self.inner.state.lock();
            if state.entries.contains_key(&key) {
                return Err(CacheError::duplicate_key(key));
            }

            let generation = state.next_generation;
            state.next_generation += 1;
            let now = state.tick();

            let inner = self.inner.clone();
            let settle_key = key.clone();
            let shared: ImagePromise = async move {
                let settled = match promise.await {
                    Ok(image) if image.size_in_bytes.is_some() => Ok(Arc::new(image)),
                    Ok(_) => Err(CacheError::invalid_cacheable_object(settle_key.clone())),
                    Err(err) => Err(err),
                };
                // Bookkeeping runs before the shared handle completes, so an
                // awaiter always observes fully settled counters.
                inner.on_settled(&settle_key, generation, &settled);
                settled
            }
            .boxed()
            .shared();

            state.entries.insert(
                key.clone(),
                CacheEntry {
                    promise: shared.clone(),
                    state: EntryState::Provisional,
                    size_in_bytes: 0,
                    time_stamp: now,
                    inserted: now,
                    generation,
                },
            );
            shared
        };

        trace!(id = %key, "Stored provisional image promise");

        // Drive settlement even if every caller drops the returned handle.
        let driver = shared.clone();
        tokio::spawn(async move {
            let _ = driver.await;
        });

        Ok(shared)
    }

    /// Returns the stored promise handle, refreshing the entry's LRU stamp.
    ///
    /// A miss is `Ok(None)`, not a failure.
    ///
    /// # Errors
    /// [`CacheError::InvalidArgument`] if `image_id` is empty.
    pub fn get_image_promise(&self, image_id: &str) -> CacheResult<Option<ImagePromise>> {
        if image_id.is_empty() {
            return Err(CacheError::invalid_argument("image_id must not be empty"));
        }

        let mut state = self.inner.state.lock();
        if !state.entries.contains_key(image_id) {
            trace!(id = %image_id, "Image promise cache miss");
            return Ok(None);
        }

        let now = state.tick();
        let entry = state
            .entries
            .get_mut(image_id)
            .ok_or_else(|| CacheError::not_found(image_id))?;
        entry.time_stamp = now;
        trace!(id = %image_id, "Image promise cache hit");
        Ok(Some(entry.promise.clone()))
    }

    /// Removes an entry and returns its promise handle.
    ///
    /// Decrements the aggregate by the recorded size (zero while
    /// provisional), invokes the image's decache hook if settled, and
    /// publishes a cache-changed event.
    ///
    /// # Errors
    /// [`CacheError::InvalidArgument`] if `image_id` is empty,
    /// [`CacheError::NotFound`] if the identifier is absent.
    pub fn remove_image_promise(&self, image_id: &str) -> CacheResult<ImagePromise> {
        if image_id.is_empty() {
            return Err(CacheError::invalid_argument("image_id must not be empty"));
        }

        let (promise, image, info) = {
            let mut state = self.inner.state.lock();
            let Some(entry) = state.entries.remove(image_id) else {
                return Err(CacheError::not_found(image_id));
            };
            state.cache_size_in_bytes -= entry.size_in_bytes;
            (entry.promise.clone(), entry.settled_image(), state.info())
        };

        if let Some(image) = image {
            image.release();
        }
        debug!(id = %image_id, "Removed image promise");
        self.inner.events.publish(&CacheEvent::CacheChanged(info));
        Ok(promise)
    }

    /// Adjusts a settled entry's recorded size.
    ///
    /// Awaits the entry's settlement first, so the recorded size is the one
    /// being replaced. Does not trigger eviction; a grown aggregate is
    /// trimmed on the next settling insertion.
    ///
    /// # Errors
    /// [`CacheError::InvalidArgument`] if `image_id` is empty,
    /// [`CacheError::NotFound`] if the identifier is absent, was removed
    /// while settling, or its promise was rejected.
    pub async fn change_image_id_cache_size(
        &self,
        image_id: &str,
        new_size_in_bytes: u64,
    ) -> CacheResult<()> {
        if image_id.is_empty() {
            return Err(CacheError::invalid_argument("image_id must not be empty"));
        }

        let (promise, generation) = {
            let state = self.inner.state.lock();
            let Some(entry) = state.entries.get(image_id) else {
                return Err(CacheError::not_found(image_id));
            };
            (entry.promise.clone(), entry.generation)
        };

        // Settlement bookkeeping runs inside the shared future, so the entry
        // state is final once this await returns.
        let _ = promise.await;

        let info = {
            let mut state = self.inner.state.lock();
            let Some(entry) = state.entries.get_mut(image_id) else {
                return Err(CacheError::not_found(image_id));
            };
            if entry.generation != generation {
                return Err(CacheError::not_found(image_id));
            }
            match entry.state {
                EntryState::Settled(_) => {
                    let old_size = entry.size_in_bytes;
                    entry.size_in_bytes = new_size_in_bytes;
                    state.cache_size_in_bytes =
                        state.cache_size_in_bytes - old_size + new_size_in_bytes;
                    debug!(
                        id = %image_id,
                        old_size,
                        new_size = new_size_in_bytes,
                        "Changed recorded cache size"
                    );
                }
                EntryState::Provisional => {
                    return Err(CacheError::not_found(image_id));
                }
            }
            state.info()
        };

        self.inner.events.publish(&CacheEvent::CacheChanged(info));
        Ok(())
    }

    /// Returns a snapshot of aggregate cache state. Never mutates.
    #[must_use]
    pub fn get_cache_info(&self) -> CacheInfo {
        self.inner.state.lock().info()
    }

    /// Removes every entry and resets the aggregate to zero.
    ///
    /// Decache hooks of settled entries run in unspecified order; no events
    /// are published. Intended as a hard reset.
    pub fn purge_cache(&self) {
        let released: Vec<Arc<Image>> = {
            let mut state = self.inner.state.lock();
            let released = state
                .entries
                .drain()
                .filter_map(|(_, entry)| entry.settled_image())
                .collect();
            state.cache_size_in_bytes = 0;
            released
        };

        for image in released {
            image.release();
        }
        debug!("Purged image cache");
    }
}

impl std::fmt::Debug for ImageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageCache")
            .field("info", &self.get_cache_info())
            .finish_non_exhaustive()
    }
}

impl CacheShared {
    /// Applies a settlement to the entry that produced it.
    ///
    /// A stale generation means the key was removed (and possibly re-put)
    /// while the promise was in flight; the settlement is then a no-op.
    fn on_settled(&self, image_id: &str, generation: u64, settled: &CacheResult<Arc<Image>>) {
        let mut evicted: Vec<(String, Arc<Image>)> = Vec::new();
        let still_over;
        let info;
        {
            let mut state = self.state.lock();
            match state.entries.get(image_id) {
                Some(entry) if entry.generation == generation => {}
                _ => return,
            }

            match settled {
                Ok(image) => {
                    let size = image.size_in_bytes.unwrap_or(0);
                    if let Some(entry) = state.entries.get_mut(image_id) {
                        entry.state = EntryState::Settled(image.clone());
                        entry.size_in_bytes = size;
                    }
                    state.cache_size_in_bytes += size;
                    debug!(id = %image_id, size, "Image promise settled");

                    while state.cache_size_in_bytes > state.maximum_size_in_bytes {
                        let Some(victim_id) = state.oldest_settled() else {
                            break;
                        };
                        if let Some(victim) = state.entries.remove(&victim_id) {
                            state.cache_size_in_bytes -= victim.size_in_bytes;
                            debug!(
                                id = %victim_id,
                                size = victim.size_in_bytes,
                                "Evicting least-recently-used image"
                            );
                            if let Some(image) = victim.settled_image() {
                                evicted.push((victim_id, image));
                            }
                        }
                    }
                    still_over = state.cache_size_in_bytes > state.maximum_size_in_bytes;
                }
                Err(err) => {
                    warn!(id = %image_id, error = %err, "Image promise rejected, dropping entry");
                    state.entries.remove(image_id);
                    still_over = false;
                }
            }
            info = state.info();
        }

        // Hooks and events run outside the lock so subscribers may re-enter
        // the cache; the aggregate invariant already holds at this point.
        for (victim_id, image) in evicted {
            image.release();
            self.events.publish(&CacheEvent::PromiseRemoved {
                image_id: victim_id,
                cache_info: info,
            });
        }
        if still_over {
            self.events.publish(&CacheEvent::CacheFull(info));
        }
        self.events.publish(&CacheEvent::CacheChanged(info));
    }
}
