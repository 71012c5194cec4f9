// SPDX-License-Identifier: MPL-2.0
//! LRU cache of reconstructed output frames.
//!
//! # Design
//!
//! - **LRU eviction**: least recently used frames are evicted first
//! - **Count-bounded**: capacity follows the session's lookahead
//!   (`ceil(1.5 * lookahead)`), so a whole forward run from a sync point fits
//! - **Index-keyed**: entries are keyed by timeline index, not timestamp
//! - **Never empty-handed**: [`FrameCache::closest_or_empty`] falls back to the
//!   nearest earlier frame, or a blank picture when nothing is cached
//!
//! The map and the recency order live in one [`LruCache`], so they cannot
//! disagree on the key set.

use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;

use crate::domain::picture::{Picture, PictureFormat};

/// Statistics about cache performance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of frames currently in cache.
    pub frame_count: usize,

    /// Number of lookups that found the requested frame.
    pub hits: u64,

    /// Number of lookups that did not.
    pub misses: u64,

    /// Number of frames evicted to respect the capacity.
    pub evictions: u64,

    /// Number of frames inserted.
    pub insertions: u64,
}

impl CacheStats {
    /// Returns the cache hit rate as a percentage (0.0 - 100.0).
    // Allow cast_precision_loss: statistics only, counts stay far below 2^52.
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

fn non_zero(capacity: usize) -> NonZeroUsize {
    NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN)
}

/// Bounded, recency-ordered store of output frames keyed by timeline index.
pub struct FrameCache {
    /// LRU cache mapping timeline index to picture.
    cache: LruCache<usize, Arc<Picture>>,

    /// Geometry of the stand-in picture returned when the cache is empty.
    blank_format: PictureFormat,

    /// Performance statistics.
    stats: CacheStats,
}

impl FrameCache {
    /// Creates an empty cache holding at most `capacity` frames (minimum 1).
    #[must_use]
    pub fn new(capacity: usize, blank_format: PictureFormat) -> Self {
        Self {
            cache: LruCache::new(non_zero(capacity)),
            blank_format,
            stats: CacheStats::default(),
        }
    }

    /// Maximum number of frames held.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.cache.cap().get()
    }

    /// Changes the capacity, evicting least recently used frames if it shrinks.
    pub fn set_capacity(&mut self, capacity: usize) {
        let before = self.cache.len();
        self.cache.resize(non_zero(capacity));
        self.stats.evictions += (before - self.cache.len()) as u64;
        self.stats.frame_count = self.cache.len();
    }

    /// Inserts or replaces the frame at `index` and marks it most recently used.
    ///
    /// Evicts the least recently used frame if the cache is full.
    pub fn put(&mut self, index: usize, picture: Arc<Picture>) {
        if let Some((evicted, _)) = self.cache.push(index, picture) {
            if evicted != index {
                self.stats.evictions += 1;
            }
        }
        self.stats.insertions += 1;
        self.stats.frame_count = self.cache.len();
    }

    /// Returns the frame at `index`, marking it most recently used.
    pub fn get(&mut self, index: usize) -> Option<Arc<Picture>> {
        if let Some(picture) = self.cache.get(&index) {
            self.stats.hits += 1;
            Some(Arc::clone(picture))
        } else {
            self.stats.misses += 1;
            None
        }
    }

    /// Marks the frame at `index` most recently used without counting a lookup.
    ///
    /// Returns false if it is not cached.
    pub fn touch(&mut self, index: usize) -> bool {
        self.cache.get(&index).is_some()
    }

    /// Checks whether `index` is cached without changing the LRU order.
    #[must_use]
    pub fn contains(&self, index: usize) -> bool {
        self.cache.contains(&index)
    }

    /// Returns the cached frame nearest to `index`, or a blank picture.
    ///
    /// Prefers the greatest cached index at or before `index`; if every cached
    /// index lies after it, the smallest one is used. The chosen entry is
    /// marked most recently used.
    pub fn closest_or_empty(&mut self, index: usize) -> Arc<Picture> {
        let floor = self.cache.iter().map(|(&key, _)| key).filter(|&key| key <= index).max();
        let chosen = floor.or_else(|| self.cache.iter().map(|(&key, _)| key).min());

        match chosen.and_then(|key| self.cache.get(&key)) {
            Some(picture) => Arc::clone(picture),
            None => Arc::new(Picture::blank(self.blank_format)),
        }
    }

    /// Cached indices from most to least recently used.
    #[must_use]
    pub fn recency_order(&self) -> Vec<usize> {
        self.cache.iter().map(|(&key, _)| key).collect()
    }

    /// Returns the current cache statistics.
    #[must_use]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Returns the current number of cached frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    /// Returns whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

impl std::fmt::Debug for FrameCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameCache")
            .field("frame_count", &self.cache.len())
            .field("capacity", &self.capacity())
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::picture::{ChromaLayout, Plane, PictureType};

    fn format() -> PictureFormat {
        PictureFormat::new(4, 2, ChromaLayout::Gray, 8)
    }

    fn create_test_frame(value: u16) -> Arc<Picture> {
        Arc::new(Picture::from_planes(
            format(),
            PictureType::Unknown,
            vec![Plane::filled(4, 2, value)],
        ))
    }

    fn value_of(picture: &Picture) -> u16 {
        picture.plane(0).samples()[0]
    }

    #[test]
    fn new_cache_is_empty() {
        let cache = FrameCache::new(15, format());
        assert!(cache.is_empty());
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.capacity(), 15);
    }

    #[test]
    fn zero_capacity_is_raised_to_one() {
        let mut cache = FrameCache::new(0, format());
        assert_eq!(cache.capacity(), 1);
        cache.put(1, create_test_frame(1));
        cache.put(2, create_test_frame(2));
        assert_eq!(cache.len(), 1);
        assert!(cache.contains(2));
    }

    #[test]
    fn insert_and_get_frame() {
        let mut cache = FrameCache::new(4, format());
        cache.put(7, create_test_frame(70));

        let retrieved = cache.get(7).expect("frame should be cached");
        assert_eq!(value_of(&retrieved), 70);
        assert!(cache.get(8).is_none());
    }

    #[test]
    fn first_insert_is_evicted_after_capacity_plus_one_inserts() {
        let mut cache = FrameCache::new(3, format());
        for index in 0..4 {
            cache.put(index, create_test_frame(index as u16));
        }

        assert!(!cache.contains(0));
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn get_promotes_entry() {
        let mut cache = FrameCache::new(3, format());
        for index in 0..3 {
            cache.put(index, create_test_frame(index as u16));
        }
        let _ = cache.get(0);
        cache.put(3, create_test_frame(3));

        assert!(cache.contains(0));
        assert!(!cache.contains(1));
        assert_eq!(cache.recency_order(), vec![3, 0, 2]);
    }

    #[test]
    fn contains_does_not_promote() {
        let mut cache = FrameCache::new(2, format());
        cache.put(0, create_test_frame(0));
        cache.put(1, create_test_frame(1));
        assert!(cache.contains(0));
        cache.put(2, create_test_frame(2));
        assert!(!cache.contains(0));
    }

    #[test]
    fn reinserting_same_index_replaces_without_eviction() {
        let mut cache = FrameCache::new(2, format());
        cache.put(5, create_test_frame(1));
        cache.put(5, create_test_frame(2));

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(value_of(&cache.get(5).unwrap()), 2);
    }

    #[test]
    fn closest_or_empty_returns_floor_entry() {
        let mut cache = FrameCache::new(8, format());
        cache.put(10, create_test_frame(10));
        cache.put(20, create_test_frame(20));
        cache.put(30, create_test_frame(30));

        assert_eq!(value_of(&cache.closest_or_empty(25)), 20);
        assert_eq!(value_of(&cache.closest_or_empty(30)), 30);
        assert_eq!(value_of(&cache.closest_or_empty(1000)), 30);
    }

    #[test]
    fn closest_or_empty_uses_smallest_when_all_entries_are_later() {
        let mut cache = FrameCache::new(8, format());
        cache.put(40, create_test_frame(40));
        cache.put(50, create_test_frame(50));

        assert_eq!(value_of(&cache.closest_or_empty(3)), 40);
    }

    #[test]
    fn closest_or_empty_on_empty_cache_is_blank() {
        let mut cache = FrameCache::new(8, format());
        let picture = cache.closest_or_empty(3);
        assert_eq!(picture.width(), 4);
        assert_eq!(picture.height(), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn shrinking_capacity_evicts_least_recent() {
        let mut cache = FrameCache::new(5, format());
        for index in 0..5 {
            cache.put(index, create_test_frame(index as u16));
        }
        cache.set_capacity(2);

        assert_eq!(cache.len(), 2);
        assert!(cache.contains(3));
        assert!(cache.contains(4));
        assert_eq!(cache.stats().evictions, 3);
    }

    #[test]
    fn stats_track_hits_and_misses() {
        let mut cache = FrameCache::new(4, format());
        cache.put(1, create_test_frame(1));

        let _ = cache.get(1);
        let _ = cache.get(2);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);
        assert!((cache.stats().hit_rate() - 50.0).abs() < 0.01);
    }
}
