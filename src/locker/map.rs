/*!
 * Map-Based Entity Locker
 *
 * One [`ReentrantLock`] per active id, created on first lock and removed from
 * the map once its last holder releases it with nobody queued.
 *
 * # Stale instances
 *
 * Looking up a lock and acquiring it are two steps. Between them the holder
 * may release, remove the mapping, and a third thread may install a fresh
 * lock for the same id. A thread that then wakes up holding the removed
 * instance does not hold the id. After every acquisition the mapping is
 * re-read; if it no longer points at the acquired instance, that instance is
 * released and the whole sequence retried.
 *
 * # Lingering locks
 *
 * `unlock` decides whether to remove the mapping from a "no one queued"
 * check taken before it releases. A timed waiter that gives up between that
 * check and the release leaves an unheld lock in the map. It costs memory
 * only: the next lock/unlock cycle on that id reuses and removes it.
 */

use super::config::MapConfig;
use super::EntityLocker;
use crate::core::errors::LockResult;
use crate::core::sync::ReentrantLock;
use crate::monitoring::{LockerStats, StatsSnapshot};
use ahash::RandomState;
use dashmap::DashMap;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// Concurrent id-to-lock mapping backing a [`MapEntityLocker`]
///
/// Every operation must be atomic per key. Implementations must not
/// serialize unrelated keys behind one global lock.
pub trait LockMap<I>: Send + Sync {
    /// Return the mapped lock, inserting `make()` if there is none
    fn get_or_insert_with<F>(&self, id: &I, make: F) -> ReentrantLock
    where
        F: FnOnce() -> ReentrantLock;

    fn get(&self, id: &I) -> Option<ReentrantLock>;

    /// Remove the mapping only if it still points at `lock`
    fn remove_if_same(&self, id: &I, lock: &ReentrantLock) -> bool;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<I, S> LockMap<I> for DashMap<I, ReentrantLock, S>
where
    I: Eq + Hash + Clone + Send + Sync,
    S: BuildHasher + Clone + Send + Sync,
{
    fn get_or_insert_with<F>(&self, id: &I, make: F) -> ReentrantLock
    where
        F: FnOnce() -> ReentrantLock,
    {
        // Shared shard lock on the hot path
        if let Some(lock) = DashMap::get(self, id) {
            return lock.value().clone();
        }
        self.entry(id.clone()).or_insert_with(make).value().clone()
    }

    fn get(&self, id: &I) -> Option<ReentrantLock> {
        DashMap::get(self, id).map(|entry| entry.value().clone())
    }

    fn remove_if_same(&self, id: &I, lock: &ReentrantLock) -> bool {
        self.remove_if(id, |_, mapped| mapped.ptr_eq(lock)).is_some()
    }

    fn len(&self) -> usize {
        DashMap::len(self)
    }
}

/// Default backing map
pub type DefaultLockMap<I> = DashMap<I, ReentrantLock, RandomState>;

/// Entity locker with one lock per active id
///
/// # Example
///
/// ```
/// use entity_locker::{EntityLocker, MapEntityLocker};
///
/// let locker = MapEntityLocker::<String>::new();
/// let id = "order-17".to_string();
///
/// locker.lock(&id)?;
/// assert_eq!(locker.active_locks(), 1);
/// locker.unlock(&id)?;
/// assert_eq!(locker.active_locks(), 0);
/// # Ok::<(), entity_locker::LockError>(())
/// ```
pub struct MapEntityLocker<I, M = DefaultLockMap<I>> {
    locks: M,
    fair: bool,
    stats: LockerStats,
    _id: PhantomData<fn(&I)>,
}

impl<I> MapEntityLocker<I>
where
    I: Eq + Hash + Clone + Send + Sync,
{
    /// Locker backed by a `DashMap`, unfair per-id locks
    pub fn new() -> Self {
        Self::with_config(MapConfig::default())
    }

    pub fn with_config(config: MapConfig) -> Self {
        Self::with_map_and_config(DashMap::with_hasher(RandomState::new()), config)
    }
}

impl<I> Default for MapEntityLocker<I>
where
    I: Eq + Hash + Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<I, M> MapEntityLocker<I, M>
where
    M: LockMap<I>,
{
    /// Locker over a caller-supplied backing map
    ///
    /// The map should start empty; it is owned by the locker from here on.
    pub fn with_map(locks: M) -> Self {
        Self::with_map_and_config(locks, MapConfig::default())
    }

    pub fn with_map_and_config(locks: M, config: MapConfig) -> Self {
        Self {
            locks,
            fair: config.fair,
            stats: LockerStats::new(),
            _id: PhantomData,
        }
    }

    /// Number of ids that currently have a lock in the map
    #[inline]
    pub fn active_locks(&self) -> usize {
        self.locks.len()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    fn mapped_lock(&self, id: &I) -> ReentrantLock {
        self.locks.get_or_insert_with(id, || {
            self.stats.lock_created();
            debug!(fair = self.fair, "Created entity lock");
            ReentrantLock::new(self.fair)
        })
    }

    /// Whether `lock` is still the instance new acquirers will find
    #[inline]
    fn is_live(&self, id: &I, lock: &ReentrantLock) -> bool {
        self.locks
            .get(id)
            .map_or(false, |mapped| mapped.ptr_eq(lock))
    }

    /// Give back an instance that was replaced while we waited for it
    fn release_stale(&self, lock: &ReentrantLock) -> LockResult<()> {
        self.stats.stale_retry();
        debug!("Acquired a stale entity lock, retrying");
        lock.unlock()
    }

    fn acquire(&self, id: &I) -> LockResult<()> {
        loop {
            let lock = self.mapped_lock(id);
            lock.lock_interruptibly()?;

            if self.is_live(id, &lock) {
                return Ok(());
            }
            self.release_stale(&lock)?;
        }
    }

    fn acquire_until(&self, id: &I, deadline: Option<Instant>) -> LockResult<bool> {
        loop {
            let lock = self.mapped_lock(id);
            let acquired = match deadline {
                Some(deadline) => lock.try_lock_until(deadline)?,
                None => lock.lock_interruptibly().map(|_| true)?,
            };
            if !acquired {
                return Ok(false);
            }

            if self.is_live(id, &lock) {
                return Ok(true);
            }
            self.release_stale(&lock)?;
        }
    }
}

impl<I, M> EntityLocker<I> for MapEntityLocker<I, M>
where
    I: Send + Sync,
    M: LockMap<I>,
{
    fn lock(&self, id: &I) -> LockResult<()> {
        let result = self.stats.record(self.acquire(id));
        trace!(ok = result.is_ok(), "Entity lock");
        result
    }

    fn try_lock_for(&self, id: &I, timeout: Duration) -> LockResult<bool> {
        // One deadline for all retries; beyond the clock's range means no bound
        let deadline = Instant::now().checked_add(timeout);
        let result = self.stats.record(self.acquire_until(id, deadline));
        trace!(
            timeout_us = timeout.as_micros() as u64,
            acquired = matches!(result, Ok(true)),
            "Timed entity lock"
        );
        result
    }

    fn unlock(&self, id: &I) -> LockResult<()> {
        let Some(lock) = self.locks.get(id) else {
            trace!("Unlock of an unmapped entity ignored");
            return Ok(());
        };

        // Only the final release of an uncontended lock drops the mapping;
        // removing earlier would orphan a lock this thread still holds.
        if lock.hold_count() == 1 && !lock.has_queued_threads() && self.locks.remove_if_same(id, &lock)
        {
            self.stats.lock_removed();
            debug!("Removed uncontended entity lock");
        }

        lock.unlock()
    }

    fn is_held_by_current_thread(&self, id: &I) -> bool {
        self.locks
            .get(id)
            .map_or(false, |lock| lock.is_held_by_current_thread())
    }

    fn queued_threads(&self, id: &I) -> usize {
        self.locks.get(id).map_or(0, |lock| lock.queue_length())
    }
}
