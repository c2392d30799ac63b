use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use serde::Serialize;

/// Argument tuple of `n choose r`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CombinationKey {
    pub n: u64,
    pub r: u64,
}

/// Read-through store for binomial coefficients.
///
/// Entries are immutable once inserted, so one cache may be shared across concurrent
/// calculations; callers needing isolation inject their own instance.
pub trait CombinationCache: Send + Sync {
    fn get(&self, key: CombinationKey) -> Option<f64>;
    fn insert(&self, key: CombinationKey, value: f64);
}

/// Hit/miss counters exposed for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Entry limit of [`InMemoryCombinationCache::new`]; roughly 8 MiB of coefficients.
pub const DEFAULT_CACHE_CAPACITY: usize = 1 << 18;

/// Shared coefficient store holding at most `capacity` entries. Once full, new keys are
/// computed on every request and existing entries keep serving hits.
#[derive(Debug)]
pub struct InMemoryCombinationCache {
    entries: RwLock<HashMap<CombinationKey, f64>>,
    capacity: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for InMemoryCombinationCache {
    fn default() -> Self {
        Self::with_capacity_limit(DEFAULT_CACHE_CAPACITY)
    }
}

impl InMemoryCombinationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            capacity,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries,
        }
    }
}

impl CombinationCache for InMemoryCombinationCache {
    fn get(&self, key: CombinationKey) -> Option<f64> {
        let value = self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&key)
            .copied();
        let counter = if value.is_some() {
            &self.hits
        } else {
            &self.misses
        };
        counter.fetch_add(1, Ordering::Relaxed);
        value
    }

    fn insert(&self, key: CombinationKey, value: f64) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries.len() < self.capacity || entries.contains_key(&key) {
            entries.insert(key, value);
        }
    }
}

/// Cache that never retains anything; every lookup recomputes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCombinationCache;

impl CombinationCache for NoopCombinationCache {
    fn get(&self, _key: CombinationKey) -> Option<f64> {
        None
    }

    fn insert(&self, _key: CombinationKey, _value: f64) {}
}

/// `n choose r` as a float using the multiplicative formula.
///
/// # Panics
///
/// Panics when `r > n`.
pub fn combinations(n: u64, r: u64) -> f64 {
    assert!(r <= n, "combinations({n}, {r}): r must not exceed n");
    let k = r.min(n - r);
    (1..=k).fold(1.0_f64, |acc, i| acc * (n - k + i) as f64 / i as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_coefficients_are_exact() {
        assert_eq!(combinations(5, 2), 10.0);
        assert_eq!(combinations(10, 3), 120.0);
        assert_eq!(combinations(52, 5), 2_598_960.0);
    }

    #[test]
    fn edges_are_one() {
        for n in [0, 1, 7, 300] {
            assert_eq!(combinations(n, 0), 1.0);
            assert_eq!(combinations(n, n), 1.0);
        }
    }

    #[test]
    fn coefficients_are_symmetric() {
        for r in 0..=20 {
            assert_eq!(combinations(20, r), combinations(20, 20 - r));
        }
    }

    #[test]
    #[should_panic(expected = "r must not exceed n")]
    fn r_above_n_is_a_contract_violation() {
        combinations(3, 4);
    }

    #[test]
    fn in_memory_cache_counts_hits_and_misses() {
        let cache = InMemoryCombinationCache::new();
        let key = CombinationKey { n: 5, r: 2 };
        assert_eq!(cache.get(key), None);
        cache.insert(key, 10.0);
        assert_eq!(cache.get(key), Some(10.0));
        assert_eq!(cache.get(CombinationKey { n: 5, r: 3 }), None);
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 2,
                entries: 1,
            }
        );
    }

    #[test]
    fn full_cache_stops_growing() {
        let cache = InMemoryCombinationCache::with_capacity_limit(2);
        for r in 0..5 {
            cache.insert(CombinationKey { n: 4, r }, combinations(4, r));
        }
        assert_eq!(cache.stats().entries, 2);
        assert_eq!(cache.get(CombinationKey { n: 4, r: 1 }), Some(4.0));
        assert_eq!(cache.get(CombinationKey { n: 4, r: 3 }), None);
    }

    #[test]
    fn default_cache_is_bounded() {
        assert_eq!(
            InMemoryCombinationCache::new().capacity(),
            DEFAULT_CACHE_CAPACITY
        );
    }

    #[test]
    fn noop_cache_never_retains() {
        let cache = NoopCombinationCache;
        let key = CombinationKey { n: 4, r: 1 };
        cache.insert(key, 4.0);
        assert_eq!(cache.get(key), None);
    }
}
