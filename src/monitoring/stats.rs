/*!
 * Locker Statistics
 * Lock-free outcome counters, one set per locker instance
 */

use crate::core::errors::{LockError, LockResult};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters
///
/// Relaxed increments only; a snapshot is a consistent-enough view for
/// diagnostics, not a linearizable one.
#[derive(Debug, Default)]
pub struct LockerStats {
    acquired: AtomicU64,
    timed_out: AtomicU64,
    interrupted: AtomicU64,
    stale_retries: AtomicU64,
    locks_created: AtomicU64,
    locks_removed: AtomicU64,
    suppressed_unlocks: AtomicU64,
}

/// Point-in-time copy of [`LockerStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub acquired: u64,
    pub timed_out: u64,
    pub interrupted: u64,
    pub stale_retries: u64,
    pub locks_created: u64,
    pub locks_removed: u64,
    pub suppressed_unlocks: u64,
}

impl LockerStats {
    pub const fn new() -> Self {
        Self {
            acquired: AtomicU64::new(0),
            timed_out: AtomicU64::new(0),
            interrupted: AtomicU64::new(0),
            stale_retries: AtomicU64::new(0),
            locks_created: AtomicU64::new(0),
            locks_removed: AtomicU64::new(0),
            suppressed_unlocks: AtomicU64::new(0),
        }
    }

    /// Count the outcome of an acquisition attempt and pass it through
    #[inline]
    pub(crate) fn record<T>(&self, result: LockResult<T>) -> LockResult<T>
    where
        T: Copy + Into<Acquired>,
    {
        match &result {
            Ok(outcome) => match (*outcome).into() {
                Acquired::Yes => self.acquired.fetch_add(1, Ordering::Relaxed),
                Acquired::No => self.timed_out.fetch_add(1, Ordering::Relaxed),
            },
            Err(LockError::Interrupted) => self.interrupted.fetch_add(1, Ordering::Relaxed),
            Err(_) => 0,
        };
        result
    }

    #[inline]
    pub(crate) fn stale_retry(&self) {
        self.stale_retries.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn lock_created(&self) {
        self.locks_created.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn lock_removed(&self) {
        self.locks_removed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn unlock_suppressed(&self) {
        self.suppressed_unlocks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            acquired: self.acquired.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            interrupted: self.interrupted.load(Ordering::Relaxed),
            stale_retries: self.stale_retries.load(Ordering::Relaxed),
            locks_created: self.locks_created.load(Ordering::Relaxed),
            locks_removed: self.locks_removed.load(Ordering::Relaxed),
            suppressed_unlocks: self.suppressed_unlocks.load(Ordering::Relaxed),
        }
    }
}

/// Outcome of an acquisition, as counted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Acquired {
    Yes,
    No,
}

impl From<()> for Acquired {
    fn from(_: ()) -> Self {
        Acquired::Yes
    }
}

impl From<bool> for Acquired {
    fn from(acquired: bool) -> Self {
        if acquired {
            Acquired::Yes
        } else {
            Acquired::No
        }
    }
}
