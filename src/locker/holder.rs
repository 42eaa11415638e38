/*!
 * Lock Holders
 *
 * A holder owns the lock of one hashing-locker slot. Eager holders build the
 * lock up front; lazy holders build it on first access, exactly once even
 * when several threads get there together.
 *
 * # Design: Enum Dispatch
 *
 * Slots are stored as [`SlotHolder`], an enum over both policies, so routing
 * an id to its lock is a match instead of a vtable call. The [`LockHolder`]
 * and [`LockHolderFactory`] traits remain for custom holders.
 */

use super::config::HolderPolicy;
use crate::core::sync::ReentrantLock;
use std::sync::OnceLock;

/// Owner of a single slot lock
///
/// `get` returns the same lock instance for the holder's whole lifetime.
pub trait LockHolder: Send + Sync {
    fn get(&self) -> &ReentrantLock;
}

/// Builds holders for a locker's slots
pub trait LockHolderFactory {
    type Holder: LockHolder;

    fn create(&self, fair: bool) -> Self::Holder;
}

/// Lock constructed with the holder
#[derive(Debug)]
pub struct EagerLockHolder {
    lock: ReentrantLock,
}

impl EagerLockHolder {
    pub fn new(fair: bool) -> Self {
        Self {
            lock: ReentrantLock::new(fair),
        }
    }
}

impl LockHolder for EagerLockHolder {
    #[inline(always)]
    fn get(&self) -> &ReentrantLock {
        &self.lock
    }
}

/// Lock constructed on first access
#[derive(Debug)]
pub struct LazyLockHolder {
    lock: OnceLock<ReentrantLock>,
    fair: bool,
}

impl LazyLockHolder {
    pub const fn new(fair: bool) -> Self {
        Self {
            lock: OnceLock::new(),
            fair,
        }
    }

    /// Whether the lock has been built yet
    #[inline]
    pub fn is_initialized(&self) -> bool {
        self.lock.get().is_some()
    }
}

impl LockHolder for LazyLockHolder {
    #[inline]
    fn get(&self) -> &ReentrantLock {
        self.lock.get_or_init(|| ReentrantLock::new(self.fair))
    }
}

/// Holder stored in each hashing-locker slot
#[derive(Debug)]
pub enum SlotHolder {
    Eager(EagerLockHolder),
    Lazy(LazyLockHolder),
}

impl LockHolder for SlotHolder {
    #[inline(always)]
    fn get(&self) -> &ReentrantLock {
        match self {
            Self::Eager(h) => h.get(),
            Self::Lazy(h) => h.get(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EagerLockHolderFactory;

impl LockHolderFactory for EagerLockHolderFactory {
    type Holder = EagerLockHolder;

    fn create(&self, fair: bool) -> EagerLockHolder {
        EagerLockHolder::new(fair)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LazyLockHolderFactory;

impl LockHolderFactory for LazyLockHolderFactory {
    type Holder = LazyLockHolder;

    fn create(&self, fair: bool) -> LazyLockHolder {
        LazyLockHolder::new(fair)
    }
}

impl LockHolderFactory for HolderPolicy {
    type Holder = SlotHolder;

    fn create(&self, fair: bool) -> SlotHolder {
        match self {
            HolderPolicy::Eager => SlotHolder::Eager(EagerLockHolderFactory.create(fair)),
            HolderPolicy::Lazy => SlotHolder::Lazy(LazyLockHolderFactory.create(fair)),
        }
    }
}
