//! Size-bounded result store with hit/miss accounting

use super::key::CacheKey;
use crate::calculators::{DebtPayoffResult, DetailedCompoundInterestResult, MonteCarloResult};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

/// A memoized calculator output
#[derive(Debug, Clone, PartialEq)]
pub enum CachedResult {
    CompoundInterest(DetailedCompoundInterestResult),
    MonteCarlo(MonteCarloResult),
    DebtPayoff(DebtPayoffResult),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub size: usize,
    pub max_entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    /// hits / (hits + misses) since the last clear, 0 when nothing was looked up
    pub hit_rate: f64,
}

/// FIFO-evicting cache of calculator results
#[derive(Debug)]
pub struct ResultCache {
    entries: HashMap<CacheKey, CachedResult>,

    /// Insertion order, oldest first
    order: VecDeque<CacheKey>,

    max_entries: usize,

    pub cache_hits: u64,
    pub cache_misses: u64,
    pub evictions: u64,
}

impl ResultCache {
    /// Create an empty cache holding at most `max_entries` results
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: HashMap::new(),
            order: VecDeque::new(),
            max_entries: max_entries.max(1),
            cache_hits: 0,
            cache_misses: 0,
            evictions: 0,
        }
    }

    /// Look up a result, counting the hit or miss
    pub fn get(&mut self, key: &CacheKey) -> Option<CachedResult> {
        match self.entries.get(key) {
            Some(result) => {
                self.cache_hits += 1;
                Some(result.clone())
            }
            None => {
                self.cache_misses += 1;
                None
            }
        }
    }

    /// Store a result, evicting the oldest entry when full
    pub fn put(&mut self, key: CacheKey, result: CachedResult) {
        if self.entries.insert(key.clone(), result).is_some() {
            return;
        }
        self.order.push_back(key);

        while self.entries.len() > self.max_entries {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                    self.evictions += 1;
                }
                None => break,
            }
        }
    }

    /// Check for a key without touching the hit/miss counters
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Drop every entry and reset the counters
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
        self.cache_hits = 0;
        self.cache_misses = 0;
        self.evictions = 0;
    }

    /// Get number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hits over total lookups, 0.0 before the first lookup
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }

    /// Snapshot of size and counters
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            size: self.len(),
            max_entries: self.max_entries,
            hits: self.cache_hits,
            misses: self.cache_misses,
            evictions: self.evictions,
            hit_rate: self.hit_rate(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculators::{calculate_compound_interest, CompoundInterestParams};

    fn entry(principal: f64) -> (CacheKey, CachedResult) {
        let params = CompoundInterestParams::lump_sum(principal, 0.05, 12, 10.0);
        let key = CacheKey::derive("calculateCompoundInterestDetailed", &params).unwrap();
        (key, CachedResult::CompoundInterest(calculate_compound_interest(&params)))
    }

    #[test]
    fn test_hit_and_miss_accounting() {
        let mut cache = ResultCache::new(10);
        let (key, result) = entry(1_000.0);

        assert!(cache.get(&key).is_none());
        cache.put(key.clone(), result.clone());
        assert_eq!(cache.get(&key), Some(result));

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate, 0.5);
    }

    #[test]
    fn test_oldest_entry_evicted_first() {
        let mut cache = ResultCache::new(2);
        let (k1, r1) = entry(1.0);
        let (k2, r2) = entry(2.0);
        let (k3, r3) = entry(3.0);

        cache.put(k1.clone(), r1);
        cache.put(k2.clone(), r2);
        cache.put(k3.clone(), r3);

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&k1));
        assert!(cache.contains(&k2));
        assert!(cache.contains(&k3));
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_reinsert_does_not_duplicate_order() {
        let mut cache = ResultCache::new(2);
        let (k1, r1) = entry(1.0);
        let (k2, r2) = entry(2.0);

        cache.put(k1.clone(), r1.clone());
        cache.put(k1.clone(), r1);
        cache.put(k2.clone(), r2);
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&k1));
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut cache = ResultCache::new(10);
        let (key, result) = entry(1_000.0);
        cache.put(key.clone(), result);
        cache.get(&key);

        cache.clear();
        let stats = cache.stats();
        assert_eq!(stats.size, 0);
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.hit_rate, 0.0);
        assert!(cache.is_empty());
    }
}
