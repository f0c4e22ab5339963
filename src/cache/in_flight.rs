//! Per-key exclusion for cache misses
//!
//! A caller claims a key before looking it up. A second caller for the same
//! key blocks until the first has stored its result and released the claim,
//! then finds the result in the cache instead of computing it again.

use super::CacheKey;
use std::collections::HashSet;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
pub struct InFlight {
    keys: Mutex<HashSet<CacheKey>>,
    released: Condvar,
}

/// Held while a key is being looked up or computed. Released on drop.
#[derive(Debug)]
pub struct Claim<'a> {
    owner: &'a InFlight,
    key: CacheKey,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, blocking while another caller holds it
    pub fn claim(&self, key: &CacheKey) -> Claim<'_> {
        let mut keys = self.lock();
        while keys.contains(key) {
            keys = self.released.wait(keys).unwrap_or_else(PoisonError::into_inner);
        }
        keys.insert(key.clone());
        Claim {
            owner: self,
            key: key.clone(),
        }
    }

    /// Number of keys currently claimed
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when no key is claimed
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashSet<CacheKey>> {
        self.keys.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.owner.lock().remove(&self.key);
        self.owner.released.notify_all();
    }
}
