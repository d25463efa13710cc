//! Kernel value cache for the SMO solver
//!
//! Kernel matrices are symmetric, so only K(i, j) with i <= j is stored.

use lru::LruCache;
use std::num::NonZeroUsize;

/// Approximate bytes held per cached entry (key, value, list links)
const BYTES_PER_ENTRY: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    i: usize,
    j: usize,
}

impl CacheKey {
    fn new(i: usize, j: usize) -> Self {
        if i <= j {
            Self { i, j }
        } else {
            Self { i: j, j: i }
        }
    }
}

/// LRU cache of kernel matrix entries between training rows
pub struct KernelCache {
    cache: LruCache<CacheKey, f64>,
    hits: u64,
    misses: u64,
}

impl KernelCache {
    /// Cache holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Cache sized from a budget in megabytes, never larger than the full
    /// upper triangle of an `n_rows` kernel matrix
    pub fn with_budget_mb(budget_mb: usize, n_rows: usize) -> Self {
        let by_budget = budget_mb.saturating_mul(1024 * 1024) / BYTES_PER_ENTRY;
        let full_matrix = n_rows.saturating_mul(n_rows + 1) / 2;
        Self::new(by_budget.min(full_matrix))
    }

    /// Return K(i, j), computing and storing it on a miss
    pub fn get_or_compute<F: FnOnce() -> f64>(&mut self, i: usize, j: usize, compute: F) -> f64 {
        let key = CacheKey::new(i, j);
        if let Some(&value) = self.cache.get(&key) {
            self.hits += 1;
            return value;
        }
        self.misses += 1;
        let value = compute();
        self.cache.put(key, value);
        value
    }

    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            capacity: self.cache.cap().get(),
            size: self.cache.len(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub capacity: usize,
    pub size: usize,
}
