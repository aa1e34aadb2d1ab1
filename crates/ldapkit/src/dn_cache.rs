//! Bounded LRU cache of parsed distinguished names.
//!
//! Each [`Schema`](crate::Schema) owns one cache, so entries are implicitly keyed by schema and
//! DN string. Eviction is exact access-order LRU. The cache is guarded by a mutex because every
//! lookup updates recency; cached [`Dn`] values are immutable and never need invalidation.

use std::fmt;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::trace;

use crate::dn::Dn;

/// Hit and miss counters of a [`DnCache`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DnCacheStats {
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that missed.
    pub misses: u64,
}

impl DnCacheStats {
    /// Fraction of lookups that hit (0.0 to 1.0).
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Thread-safe LRU cache mapping DN strings to parsed [`Dn`]s.
pub struct DnCache {
    entries: Option<Mutex<LruCache<String, Dn>>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl DnCache {
    /// Creates a cache holding at most `capacity` names. A capacity of 0 disables caching.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Looks up `dn`, promoting it to most recently used.
    pub fn get(&self, dn: &str) -> Option<Dn> {
        let entries = self.entries.as_ref()?;
        let found = entries.lock().get(dn).cloned();
        if found.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(dn, "dn cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(dn, "dn cache miss");
        }
        found
    }

    /// Inserts a parsed name, evicting the least recently used entry when full.
    pub fn insert(&self, text: impl Into<String>, dn: Dn) {
        if let Some(entries) = &self.entries {
            entries.lock().put(text.into(), dn);
        }
    }

    /// Number of cached names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, |entries| entries.lock().len())
    }

    /// Returns true if nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of cached names (0 when disabled).
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries
            .as_ref()
            .map_or(0, |entries| entries.lock().cap().get())
    }

    /// Removes all cached names. Statistics are kept.
    pub fn clear(&self) {
        if let Some(entries) = &self.entries {
            entries.lock().clear();
        }
    }

    /// Returns hit and miss counters.
    #[must_use]
    pub fn stats(&self) -> DnCacheStats {
        DnCacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl fmt::Debug for DnCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DnCache")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("stats", &self.stats())
            .finish()
    }
}
