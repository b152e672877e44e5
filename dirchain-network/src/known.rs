//! Per-peer cache of inventory the remote side is known to have

use dirchain_core::InventoryVector;
use lru::LruCache;
use std::num::NonZeroUsize;

/// Bounded most-recently-used set of inventory vectors.
///
/// Re-adding a vector refreshes it; the least recently touched entry is
/// evicted once the limit is reached.
#[derive(Debug)]
pub struct KnownInventory {
    cache: LruCache<InventoryVector, ()>,
}

impl KnownInventory {
    pub fn new(limit: usize) -> Self {
        let cap = NonZeroUsize::new(limit).unwrap_or(NonZeroUsize::MIN);
        Self {
            cache: LruCache::new(cap),
        }
    }

    /// Remember `iv`; returns false if it was already known
    pub fn add(&mut self, iv: InventoryVector) -> bool {
        if self.cache.get(&iv).is_some() {
            return false;
        }
        self.cache.put(iv, ());
        true
    }

    /// Lookup without refreshing recency
    pub fn contains(&self, iv: &InventoryVector) -> bool {
        self.cache.contains(iv)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dirchain_core::Hash;

    fn iv(n: u8) -> InventoryVector {
        InventoryVector::dir_block(Hash::new([n; 32]))
    }

    #[test]
    fn test_add_and_contains() {
        let mut known = KnownInventory::new(4);
        assert!(known.add(iv(1)));
        assert!(!known.add(iv(1)));
        assert!(known.contains(&iv(1)));
        assert!(!known.contains(&iv(2)));
        assert_eq!(known.len(), 1);
    }

    #[test]
    fn test_least_recent_is_evicted() {
        let mut known = KnownInventory::new(3);
        for n in 1..=4 {
            known.add(iv(n));
        }
        assert_eq!(known.len(), 3);
        assert!(!known.contains(&iv(1)));
        assert!(known.contains(&iv(4)));
    }

    #[test]
    fn test_readded_entry_survives_eviction() {
        let mut known = KnownInventory::new(3);
        known.add(iv(1));
        known.add(iv(2));
        known.add(iv(3));

        assert!(!known.add(iv(1)));
        known.add(iv(4));

        assert!(known.contains(&iv(1)));
        assert!(!known.contains(&iv(2)));
        assert!(known.contains(&iv(3)));
        assert!(known.contains(&iv(4)));
    }
}
