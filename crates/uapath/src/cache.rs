// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Session-scoped metadata cache.
//!
//! Record layouts and per-node type descriptors are expensive to fetch (one
//! server round trip each) but stable for the life of a session, so both are
//! cached behind bounded LRU maps. The cache never stores values, only
//! metadata.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;

use crate::transport::TypeDescriptor;
use crate::types::{NodeId, TypeId, DEFAULT_CACHE_CAPACITY};

// =============================================================================
// MetadataCache
// =============================================================================

/// Bounded LRU cache for type metadata.
///
/// Two independent sub-maps share one statistics block:
/// - field layouts, keyed by record [`TypeId`]
/// - type descriptors, keyed by variable [`NodeId`]
///
/// Both sub-maps evict least-recently-used entries once `capacity` is
/// reached. All methods take `&self`; locking is internal and per-map.
pub struct MetadataCache {
    fields: Mutex<LruCache<TypeId, Vec<String>>>,
    definitions: Mutex<LruCache<NodeId, TypeDescriptor>>,
    stats: CacheCounters,
}

impl MetadataCache {
    /// Creates a cache with the given per-map capacity. A zero capacity is
    /// clamped to the default.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .unwrap_or_else(|| NonZeroUsize::new(DEFAULT_CACHE_CAPACITY).unwrap());
        Self {
            fields: Mutex::new(LruCache::new(capacity)),
            definitions: Mutex::new(LruCache::new(capacity)),
            stats: CacheCounters::default(),
        }
    }

    /// Looks up the field layout for a record type. Counts a hit or miss.
    pub fn get_fields(&self, type_id: &TypeId) -> Option<Vec<String>> {
        match self.fields.lock().get(type_id) {
            Some(fields) => {
                self.stats.record_hit();
                Some(fields.clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Stores the field layout for a record type.
    pub fn set_fields(&self, type_id: TypeId, fields: Vec<String>) {
        self.fields.lock().put(type_id, fields);
    }

    /// Looks up the cached type descriptor for a variable node. Counts a hit
    /// or miss.
    pub fn get_definition(&self, node: &NodeId) -> Option<TypeDescriptor> {
        match self.definitions.lock().get(node) {
            Some(descriptor) => {
                self.stats.record_hit();
                Some(descriptor.clone())
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    /// Stores the type descriptor for a variable node.
    pub fn set_definition(&self, node: NodeId, descriptor: TypeDescriptor) {
        self.definitions.lock().put(node, descriptor);
    }

    /// Drops all cached entries and resets hit/miss counters, returning the
    /// cache to its freshly constructed state.
    pub fn clear(&self) {
        self.fields.lock().clear();
        self.definitions.lock().clear();
        self.stats.reset();
    }

    /// Returns a point-in-time statistics snapshot.
    pub fn stats(&self) -> CacheStats {
        let hits = self.stats.hits.load(Ordering::Relaxed);
        let misses = self.stats.misses.load(Ordering::Relaxed);
        CacheStats {
            hits,
            misses,
            total: hits + misses,
            hit_rate: CacheStats::rate(hits, misses),
            field_entries: self.fields.lock().len(),
            definition_entries: self.definitions.lock().len(),
        }
    }

    /// Resets hit/miss counters to zero.
    pub fn reset_stats(&self) {
        self.stats.reset();
    }
}

impl Default for MetadataCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl std::fmt::Debug for MetadataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stats = self.stats();
        f.debug_struct("MetadataCache")
            .field("field_entries", &stats.field_entries)
            .field("definition_entries", &stats.definition_entries)
            .field("hits", &stats.hits)
            .field("misses", &stats.misses)
            .finish()
    }
}

// =============================================================================
// Statistics
// =============================================================================

#[derive(Debug, Default)]
struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
}

impl CacheCounters {
    fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time snapshot of cache effectiveness.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,

    /// Lookups that fell through to the transport.
    pub misses: u64,

    /// Total lookups.
    pub total: u64,

    /// Hit percentage in `[0.0, 100.0]`, rounded to two decimals. Zero when
    /// no lookups have been made.
    pub hit_rate: f64,

    /// Current number of cached field layouts.
    pub field_entries: usize,

    /// Current number of cached type descriptors.
    pub definition_entries: usize,
}

impl CacheStats {
    fn rate(hits: u64, misses: u64) -> f64 {
        let total = hits + misses;
        if total == 0 {
            return 0.0;
        }
        let rate = hits as f64 / total as f64 * 100.0;
        (rate * 100.0).round() / 100.0
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ScalarType;

    fn type_id(n: u32) -> TypeId {
        NodeId::numeric(2, n)
    }

    #[test]
    fn test_fields_hit_and_miss() {
        let cache = MetadataCache::new(10);

        assert!(cache.get_fields(&type_id(1)).is_none());
        cache.set_fields(type_id(1), vec!["a".into(), "b".into()]);
        assert_eq!(
            cache.get_fields(&type_id(1)),
            Some(vec!["a".to_string(), "b".to_string()])
        );

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total, 2);
        assert_eq!(stats.hit_rate, 50.0);
        assert_eq!(stats.field_entries, 1);
    }

    #[test]
    fn test_lru_eviction_at_capacity() {
        let cache = MetadataCache::new(2);
        cache.set_fields(type_id(1), vec!["a".into()]);
        cache.set_fields(type_id(2), vec!["b".into()]);

        // Touch 1 so 2 becomes least recently used.
        assert!(cache.get_fields(&type_id(1)).is_some());

        cache.set_fields(type_id(3), vec!["c".into()]);
        assert!(cache.get_fields(&type_id(2)).is_none());
        assert!(cache.get_fields(&type_id(1)).is_some());
        assert!(cache.get_fields(&type_id(3)).is_some());
    }

    #[test]
    fn test_definitions_are_independent() {
        let cache = MetadataCache::new(10);
        let node = NodeId::numeric(2, 99);
        let descriptor = TypeDescriptor::scalar(NodeId::numeric(0, 6), ScalarType::Int32);

        assert!(cache.get_definition(&node).is_none());
        cache.set_definition(node.clone(), descriptor.clone());
        assert_eq!(cache.get_definition(&node), Some(descriptor));

        // Same keyspace but separate map: no cross-talk with fields.
        assert!(cache.get_fields(&node).is_none());
    }

    #[test]
    fn test_clear_resets_entries_and_stats() {
        let cache = MetadataCache::new(10);
        cache.set_fields(type_id(1), vec!["a".into()]);
        let _ = cache.get_fields(&type_id(1));
        let _ = cache.get_fields(&type_id(2));
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().misses, 1);

        cache.clear();
        let stats = cache.stats();
        assert_eq!(stats.field_entries, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.hit_rate, 0.0);
    }

    #[test]
    fn test_reset_stats_keeps_entries() {
        let cache = MetadataCache::new(10);
        cache.set_fields(type_id(1), vec!["a".into()]);
        let _ = cache.get_fields(&type_id(1));

        cache.reset_stats();
        assert_eq!(cache.stats().hits, 0);
        assert_eq!(cache.stats().field_entries, 1);
    }

    #[test]
    fn test_hit_rate_rounding() {
        assert_eq!(CacheStats::rate(1, 2), 33.33);
        assert_eq!(CacheStats::rate(2, 1), 66.67);
        assert_eq!(CacheStats::rate(0, 0), 0.0);
        assert_eq!(CacheStats::rate(5, 0), 100.0);
    }
}
