/*!
 * Lock Striping Pattern
 * Reduces contention by partitioning the id-to-lock mapping across stripes
 */

use super::reentrant::ReentrantLock;
use crate::core::errors::{LockError, LockResult};
use crate::core::validate::ensure_positive;
use crate::locker::LockMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// Lock-striped map from entity id to its lock
///
/// An alternative backing map for [`MapEntityLocker`](crate::MapEntityLocker).
/// Every operation touches a single stripe, so unrelated ids only contend
/// when they share a stripe, and only for the duration of a map operation.
///
/// # Example
///
/// ```
/// use entity_locker::{EntityLocker, MapEntityLocker, StripedLockMap};
///
/// let locker = MapEntityLocker::with_map(StripedLockMap::<u64>::new(32)?);
/// locker.lock(&7)?;
/// locker.unlock(&7)?;
/// # Ok::<(), entity_locker::LockError>(())
/// ```
pub struct StripedLockMap<K> {
    stripes: Vec<RwLock<HashMap<K, ReentrantLock>>>,
    stripe_mask: usize,
}

impl<K: Hash + Eq> StripedLockMap<K> {
    /// Create new striped map with specified stripe count
    ///
    /// `stripe_count` must be a power of 2
    pub fn new(stripe_count: usize) -> LockResult<Self> {
        ensure_positive(stripe_count, "Stripe count")?;
        if !stripe_count.is_power_of_two() {
            return Err(LockError::InvalidArgument(format!(
                "Stripe count must be a power of 2, got {}",
                stripe_count
            )));
        }

        let stripes = (0..stripe_count)
            .map(|_| RwLock::new(HashMap::new()))
            .collect();

        Ok(Self {
            stripes,
            stripe_mask: stripe_count - 1,
        })
    }

    #[inline]
    fn stripe_index(&self, key: &K) -> usize {
        let mut hasher = ahash::AHasher::default();
        key.hash(&mut hasher);
        (hasher.finish() as usize) & self.stripe_mask
    }

    #[cfg(test)]
    fn contains_key(&self, key: &K) -> bool {
        let idx = self.stripe_index(key);
        self.stripes[idx].read().contains_key(key)
    }

    #[inline]
    pub fn stripe_count(&self) -> usize {
        self.stripes.len()
    }
}

impl<K: Hash + Eq> Default for StripedLockMap<K> {
    fn default() -> Self {
        Self {
            stripes: (0..16).map(|_| RwLock::new(HashMap::new())).collect(),
            stripe_mask: 15,
        }
    }
}

impl<K> LockMap<K> for StripedLockMap<K>
where
    K: Hash + Eq + Clone + Send + Sync,
{
    fn get_or_insert_with<F>(&self, key: &K, make: F) -> ReentrantLock
    where
        F: FnOnce() -> ReentrantLock,
    {
        let idx = self.stripe_index(key);

        // Read lock only on the hot path
        if let Some(lock) = self.stripes[idx].read().get(key) {
            return lock.clone();
        }

        self.stripes[idx]
            .write()
            .entry(key.clone())
            .or_insert_with(make)
            .clone()
    }

    fn get(&self, key: &K) -> Option<ReentrantLock> {
        let idx = self.stripe_index(key);
        self.stripes[idx].read().get(key).cloned()
    }

    fn remove_if_same(&self, key: &K, lock: &ReentrantLock) -> bool {
        let idx = self.stripe_index(key);
        let mut stripe = self.stripes[idx].write();
        match stripe.get(key) {
            Some(mapped) if mapped.ptr_eq(lock) => {
                stripe.remove(key);
                true
            }
            _ => false,
        }
    }

    fn len(&self) -> usize {
        self.stripes.iter().map(|stripe| stripe.read().len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_rejects_bad_stripe_count() {
        assert!(matches!(
            StripedLockMap::<u64>::new(0),
            Err(LockError::InvalidArgument(_))
        ));
        assert!(matches!(
            StripedLockMap::<u64>::new(12),
            Err(LockError::InvalidArgument(_))
        ));
        assert_eq!(StripedLockMap::<u64>::new(8).unwrap().stripe_count(), 8);
    }

    #[test]
    fn test_insert_if_absent_keeps_first() {
        let map = StripedLockMap::new(8).unwrap();

        let first = map.get_or_insert_with(&"key1", ReentrantLock::default);
        let second = map.get_or_insert_with(&"key1", ReentrantLock::default);

        assert!(first.ptr_eq(&second));
        assert!(map.get(&"key1").unwrap().ptr_eq(&first));
        assert!(map.get(&"key2").is_none());
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn test_remove_only_same_instance() {
        let map = StripedLockMap::new(8).unwrap();
        let mapped = map.get_or_insert_with(&1, ReentrantLock::default);
        let stranger = ReentrantLock::default();

        assert!(!map.remove_if_same(&1, &stranger));
        assert!(map.contains_key(&1));

        assert!(map.remove_if_same(&1, &mapped));
        assert!(!map.contains_key(&1));
        assert!(map.is_empty());
        assert!(!map.remove_if_same(&1, &mapped));
    }

    #[test]
    fn test_concurrent_insert_agrees_on_instance() {
        let map = Arc::new(StripedLockMap::new(16).unwrap());
        let mut handles = vec![];

        for _ in 0..8 {
            let map = map.clone();
            handles.push(thread::spawn(move || {
                (0..500u64)
                    .map(|id| map.get_or_insert_with(&id, ReentrantLock::default))
                    .collect::<Vec<_>>()
            }));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        for locks in &results[1..] {
            for (a, b) in locks.iter().zip(&results[0]) {
                assert!(a.ptr_eq(b));
            }
        }
        assert_eq!(map.len(), 500);
    }

    #[test]
    fn test_stripe_distribution() {
        let map = StripedLockMap::new(8).unwrap();

        for i in 0..1000 {
            map.get_or_insert_with(&i, ReentrantLock::default);
        }

        // Each stripe should have roughly 1000/8 ≈ 125 keys
        for stripe in &map.stripes {
            let count = stripe.read().len();
            assert!(count > 50 && count < 250, "Bad distribution: {}", count);
        }
    }
}
