//! Transposition table for the double-dummy search

use rustc_hash::FxHashMap;
use tracing::debug;

/// Bounds on the value of a cached position, from the mover's side
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Bounds {
    pub lower: i32,
    pub upper: i32,
}

impl Bounds {
    pub fn new(lower: i32, upper: i32) -> Self {
        Bounds { lower, upper }
    }

    pub fn exact(value: i32) -> Self {
        Bounds {
            lower: value,
            upper: value,
        }
    }

    #[inline]
    pub fn is_exact(&self) -> bool {
        self.lower == self.upper
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.upper < self.lower
    }

    #[inline]
    pub fn intersect(&self, other: Bounds) -> Bounds {
        Bounds {
            lower: self.lower.max(other.lower),
            upper: self.upper.min(other.upper),
        }
    }
}

/// Canonical search state.
///
/// Values depend only on the cards left, the trick in progress and who is to
/// move; accumulated points are not part of the key. Game type, declarer
/// and search goal keep entries of different games apart.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub hands: [u32; 3],
    /// Cards of the trick in progress, 6 bits each (index + 1, 0 = none)
    pub trick: u16,
    pub to_move: u8,
    pub game_type: u8,
    pub declarer: u8,
    pub goal: u8,
}

/// Bounds cache persisting across searches until cleared
pub struct TranspositionCache {
    table: FxHashMap<CacheKey, Bounds>,
    limit: usize,
    hits: u64,
}

impl TranspositionCache {
    pub fn new(limit: usize) -> Self {
        TranspositionCache {
            table: FxHashMap::default(),
            limit,
            hits: 0,
        }
    }

    pub fn clear(&mut self) {
        debug!(entries = self.table.len(), hits = self.hits, "clearing transposition cache");
        self.table.clear();
        self.hits = 0;
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    #[inline]
    pub fn probe(&mut self, key: &CacheKey) -> Option<Bounds> {
        let bounds = self.table.get(key).copied();
        if bounds.is_some() {
            self.hits += 1;
        }
        bounds
    }

    /// Merge new bounds into the entry for `key`. Contradicting bounds
    /// replace the old entry.
    pub fn store(&mut self, key: CacheKey, bounds: Bounds) {
        if self.table.len() >= self.limit && !self.table.contains_key(&key) {
            self.clear();
        }
        let entry = self.table.entry(key).or_insert(bounds);
        let merged = entry.intersect(bounds);
        *entry = if merged.is_empty() { bounds } else { merged };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: u32) -> CacheKey {
        CacheKey {
            hands: [n, 0, 0],
            trick: 0,
            to_move: 0,
            game_type: 4,
            declarer: 0,
            goal: 0,
        }
    }

    #[test]
    fn test_bounds() {
        let b = Bounds::new(-10, 20).intersect(Bounds::new(0, 30));
        assert_eq!(b, Bounds::new(0, 20));
        assert!(!b.is_exact());
        assert!(Bounds::exact(5).is_exact());
        assert!(Bounds::new(3, 2).is_empty());
    }

    #[test]
    fn test_store_merges() {
        let mut cache = TranspositionCache::new(16);
        cache.store(key(1), Bounds::new(-100, 40));
        cache.store(key(1), Bounds::new(10, 100));
        assert_eq!(cache.probe(&key(1)), Some(Bounds::new(10, 40)));
        assert_eq!(cache.probe(&key(2)), None);
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn test_limit_clears() {
        let mut cache = TranspositionCache::new(2);
        cache.store(key(1), Bounds::exact(1));
        cache.store(key(2), Bounds::exact(2));
        assert_eq!(cache.len(), 2);
        cache.store(key(3), Bounds::exact(3));
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.probe(&key(3)), Some(Bounds::exact(3)));
    }
}
