//! Shared, bounded cache of [`DocregionExtractor`]s.
//!
//! Extractors are keyed by a content hash of their file type and text, so
//! repeated requests against an unchanged example file reuse the parsed
//! region map instead of re-scanning the file.

use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::RwLock;

use crate::docregion::extractor::DocregionExtractor;

/// Default number of extractors kept alive at once.
pub const DEFAULT_CAPACITY: usize = 10;

/// Identity of one (file type, text) pair: a blake3 hash over the file
/// type, a `|` separator, and the text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(blake3::Hash);

impl ContentHash {
    pub fn of(file_type: &str, text: &str) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(file_type.as_bytes());
        hasher.update(b"|");
        hasher.update(text.as_bytes());
        Self(hasher.finalize())
    }
}

/// Usage counters for the cache, snapshotted by [`ExtractorCache::stats`].
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    pub total_queries: u64,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub current_size: usize,
    pub max_capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        if self.total_queries == 0 {
            0.0
        } else {
            self.hits as f64 / self.total_queries as f64
        }
    }
}

/// LRU cache of shared extractors. Lookups touch recency; inserting at
/// capacity evicts the least-recently-used entry.
pub struct ExtractorCache {
    extractors: RwLock<LruCache<ContentHash, Arc<DocregionExtractor>>>,
    stats: RwLock<CacheStats>,
}

impl ExtractorCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// A zero capacity is clamped to one entry.
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            extractors: RwLock::new(LruCache::new(capacity)),
            stats: RwLock::new(CacheStats::default()),
        }
    }

    /// Returns the cached extractor for this (file type, text) pair, or
    /// builds and caches a new one.
    pub fn get_or_create(&self, file_type: &str, text: &str) -> Arc<DocregionExtractor> {
        let key = ContentHash::of(file_type, text);
        self.stats.write().total_queries += 1;

        {
            let mut extractors = self.extractors.write();
            if let Some(extractor) = extractors.get(&key) {
                let extractor = Arc::clone(extractor);
                drop(extractors);
                self.stats.write().hits += 1;
                return extractor;
            }
        }

        let extractor = Arc::new(DocregionExtractor::new(file_type, text));
        let evicted = self.extractors.write().push(key, Arc::clone(&extractor));

        let mut stats = self.stats.write();
        stats.misses += 1;
        // `push` also reports a replaced value for the same key, which can
        // happen when two threads miss concurrently and is not an eviction.
        if evicted.is_some_and(|(evicted_key, _)| evicted_key != key) {
            stats.evictions += 1;
        }
        extractor
    }

    pub fn len(&self) -> usize {
        self.extractors.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.read().is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.read().clone();
        let extractors = self.extractors.read();
        stats.current_size = extractors.len();
        stats.max_capacity = extractors.cap().get();
        stats
    }
}

impl Default for ExtractorCache {
    fn default() -> Self {
        Self::new()
    }
}
