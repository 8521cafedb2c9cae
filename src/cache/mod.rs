pub mod key;

pub use key::{CanonicalKey, KeyCanonicalizer};

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

/// Bounded answer store with strict least-recently-used eviction.
///
/// The mutex is only held for the duration of a single `get` or `put`, never
/// across an upstream call.
pub struct CacheStore {
    inner: Mutex<LruCache<CanonicalKey, String>>,
    capacity: NonZeroUsize,
}

impl CacheStore {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
            capacity,
        }
    }

    pub fn get(&self, key: &CanonicalKey) -> Option<String> {
        self.inner.lock().get(key).cloned()
    }

    /// Insert or replace, then evict the oldest entry if over capacity.
    pub fn put(&self, key: CanonicalKey, value: String) {
        self.inner.lock().put(key, value);
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }
}
