/*!
 * Entity Lockers
 *
 * Row-level-style locking for in-process entities: callers lock an entity
 * id, work on the entity, then unlock it. The locker never sees entities,
 * only their ids.
 *
 * # Strategies
 *
 * - [`MapEntityLocker`]: one lock per active id, created on demand and
 *   dropped once uncontended. Memory follows the number of active ids and
 *   unrelated ids never contend.
 * - [`HashingEntityLocker`]: fixed array of locks, ids routed by hash.
 *   Bounded memory, at the cost of false contention between ids that share
 *   a slot.
 *
 * Both implement [`EntityLocker`], so callers can switch strategy without
 * touching the code that locks.
 *
 * # Misuse
 *
 * Unlocking an id the calling thread does not hold is a contract violation.
 * The map strategy reports it as [`LockError::NotOwner`](crate::LockError);
 * the hashing strategy suppresses it by default (see [`UnlockPolicy`]).
 */

mod config;
mod hashing;
mod holder;
mod map;

pub use config::{HashingConfig, HolderPolicy, MapConfig, UnlockPolicy};
pub use hashing::HashingEntityLocker;
pub use holder::{
    EagerLockHolder, EagerLockHolderFactory, LazyLockHolder, LazyLockHolderFactory, LockHolder,
    LockHolderFactory, SlotHolder,
};
pub use map::{DefaultLockMap, LockMap, MapEntityLocker};

use crate::core::errors::LockResult;
use crate::core::guard::EntityGuard;
use std::time::Duration;

/// Per-entity reentrant locking
///
/// Every successful `lock`/`try_lock_for` must be matched by exactly one
/// `unlock` on the same thread. Prefer [`lock_guard`](Self::lock_guard) or
/// [`with_lock`](Self::with_lock), which release on every exit path.
///
/// # Example
///
/// ```
/// use entity_locker::{EntityLocker, HashingEntityLocker, MapEntityLocker};
/// use std::time::Duration;
///
/// fn transfer<L: EntityLocker<u64>>(locker: &L, account: u64) -> entity_locker::LockResult<()> {
///     locker.with_lock(&account, || {
///         // read-modify-write the account
///     })
/// }
///
/// transfer(&MapEntityLocker::new(), 1)?;
/// transfer(&HashingEntityLocker::new(1024, 16)?, 1)?;
/// # Ok::<(), entity_locker::LockError>(())
/// ```
pub trait EntityLocker<I>: Send + Sync {
    /// Block until the calling thread holds the lock for `id`
    ///
    /// Reentrant. Fails with `Interrupted` if the thread is interrupted
    /// before acquiring; no lock is held then.
    fn lock(&self, id: &I) -> LockResult<()>;

    /// Like [`lock`](Self::lock) but gives up after `timeout`
    ///
    /// `Ok(false)` means the timeout elapsed and nothing was acquired.
    fn try_lock_for(&self, id: &I, timeout: Duration) -> LockResult<bool>;

    /// Release one level of the calling thread's hold on `id`
    fn unlock(&self, id: &I) -> LockResult<()>;

    /// Whether the calling thread currently holds the lock for `id`
    fn is_held_by_current_thread(&self, id: &I) -> bool;

    /// Threads currently waiting for the lock `id` maps to
    ///
    /// Hashing lockers count every waiter on the shared slot, whichever id
    /// it asked for.
    fn queued_threads(&self, id: &I) -> usize;

    /// Lock `id` and release it when the returned guard drops
    fn lock_guard(&self, id: &I) -> LockResult<EntityGuard<'_, I, Self>>
    where
        I: Clone,
        Self: Sized,
    {
        self.lock(id)?;
        Ok(EntityGuard::new(self, id.clone()))
    }

    /// Timed [`lock_guard`](Self::lock_guard); `Ok(None)` on timeout
    fn try_lock_guard_for(
        &self,
        id: &I,
        timeout: Duration,
    ) -> LockResult<Option<EntityGuard<'_, I, Self>>>
    where
        I: Clone,
        Self: Sized,
    {
        if self.try_lock_for(id, timeout)? {
            Ok(Some(EntityGuard::new(self, id.clone())))
        } else {
            Ok(None)
        }
    }

    /// Run `f` while holding the lock for `id`
    fn with_lock<R, F>(&self, id: &I, f: F) -> LockResult<R>
    where
        I: Clone,
        F: FnOnce() -> R,
        Self: Sized,
    {
        let _guard = self.lock_guard(id)?;
        Ok(f())
    }
}
