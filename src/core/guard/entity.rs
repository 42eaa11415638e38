/*!
 * Entity Lock Guard
 */

use crate::core::errors::LockResult;
use crate::locker::EntityLocker;
use std::fmt;
use std::marker::PhantomData;
use std::time::{Duration, Instant};
use tracing::{trace, warn};

/// Holds one level of an entity lock until dropped
///
/// Created by [`EntityLocker::lock_guard`] and
/// [`EntityLocker::try_lock_guard_for`]. Entity locks are owned by a thread,
/// so the guard is `!Send`: it must be dropped on the thread that acquired it.
#[must_use = "if unused the entity lock is released immediately"]
pub struct EntityGuard<'a, I, L>
where
    L: EntityLocker<I> + ?Sized,
{
    locker: &'a L,
    id: I,
    acquired_at: Instant,
    released: bool,
    _not_send: PhantomData<*const ()>,
}

impl<'a, I, L> EntityGuard<'a, I, L>
where
    L: EntityLocker<I> + ?Sized,
{
    /// Wrap a lock the calling thread already holds
    pub(crate) fn new(locker: &'a L, id: I) -> Self {
        Self {
            locker,
            id,
            acquired_at: Instant::now(),
            released: false,
            _not_send: PhantomData,
        }
    }

    /// Entity this guard locks
    #[inline]
    pub fn id(&self) -> &I {
        &self.id
    }

    /// Time since acquisition
    #[inline]
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }

    /// Release now and report the outcome instead of logging it
    pub fn unlock(mut self) -> LockResult<()> {
        self.released = true;
        self.locker.unlock(&self.id)
    }
}

impl<I, L> Drop for EntityGuard<'_, I, L>
where
    L: EntityLocker<I> + ?Sized,
{
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;

        match self.locker.unlock(&self.id) {
            Ok(()) => trace!(
                held_us = self.acquired_at.elapsed().as_micros() as u64,
                "Entity lock released by guard"
            ),
            Err(e) => warn!(error = %e, "Failed to release entity lock on guard drop"),
        }
    }
}

impl<I: fmt::Debug, L> fmt::Debug for EntityGuard<'_, I, L>
where
    L: EntityLocker<I> + ?Sized,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityGuard")
            .field("id", &self.id)
            .field("held_for", &self.held_for())
            .finish()
    }
}
