/*!
 * Hashing Entity Locker
 *
 * Fixed array of lock slots; an id is routed to a slot by its hash. Memory
 * is bounded by the slot count regardless of how many ids exist, and
 * distinct ids that land in one slot contend with each other.
 *
 * # Routing
 *
 * The 64-bit hash is folded so its high bits reach the low ones
 * (`h ^ h >> 32`, then `^ h >> 16`) before it is masked (power-of-two slot
 * count) or reduced modulo the slot count. Ids whose hashes differ only in
 * high bits still spread across slots.
 */

use super::config::{HashingConfig, UnlockPolicy};
use super::holder::{LockHolder, LockHolderFactory, SlotHolder};
use super::EntityLocker;
use crate::core::errors::{LockError, LockResult};
use crate::core::sync::ReentrantLock;
use crate::monitoring::{LockerStats, StatsSnapshot};
use ahash::RandomState;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use std::time::Duration;
use tracing::{debug, trace, warn};

/// Fold high hash bits into the low ones
#[inline(always)]
fn spread(hash: u64) -> usize {
    let h = hash ^ (hash >> 32);
    (h ^ (h >> 16)) as usize
}

#[inline(always)]
fn route(hash: u64, slot_count: usize) -> usize {
    let h = spread(hash);
    if slot_count.is_power_of_two() {
        h & (slot_count - 1)
    } else {
        h % slot_count
    }
}

/// Entity locker over a fixed, hash-addressed array of locks
///
/// The id type's `Hash` impl decides how well ids spread; a poor one makes
/// unrelated ids share slots.
///
/// # Example
///
/// ```
/// use entity_locker::{EntityLocker, HashingConfig, HashingEntityLocker, HolderPolicy};
///
/// let locker = HashingEntityLocker::<u64>::with_config(
///     HashingConfig::new(10_000, 100).with_holder(HolderPolicy::Lazy),
/// )?;
/// assert_eq!(locker.slot_count(), 100);
///
/// locker.with_lock(&12345, || {
///     // exclusive for every id in slot `locker.slot_of(&12345)`
/// })?;
/// # Ok::<(), entity_locker::LockError>(())
/// ```
pub struct HashingEntityLocker<I, S = RandomState, H = SlotHolder> {
    slots: Box<[H]>,
    hasher: S,
    unlock_policy: UnlockPolicy,
    stats: LockerStats,
    _id: PhantomData<fn(&I)>,
}

impl<I: Hash> HashingEntityLocker<I> {
    /// `max(1, approximate_entity_count / contention_factor)` eager, fair slots
    pub fn new(approximate_entity_count: usize, contention_factor: usize) -> LockResult<Self> {
        Self::with_config(HashingConfig::new(
            approximate_entity_count,
            contention_factor,
        ))
    }

    pub fn with_config(config: HashingConfig) -> LockResult<Self> {
        Self::with_config_and_hasher(config, RandomState::new())
    }
}

impl<I: Hash, S: BuildHasher> HashingEntityLocker<I, S> {
    /// Use `hasher` for routing instead of a randomly seeded one
    pub fn with_config_and_hasher(config: HashingConfig, hasher: S) -> LockResult<Self> {
        Self::with_factory(config, &config.holder, hasher)
    }
}

impl<I: Hash, S: BuildHasher, H: LockHolder> HashingEntityLocker<I, S, H> {
    /// Build slots with a custom holder factory
    ///
    /// `config.holder` is ignored; `factory` decides how slots hold their lock.
    pub fn with_factory<F>(config: HashingConfig, factory: &F, hasher: S) -> LockResult<Self>
    where
        F: LockHolderFactory<Holder = H>,
    {
        let slot_count = config.slot_count()?;
        let slots: Box<[H]> = (0..slot_count)
            .map(|_| factory.create(config.fair))
            .collect();

        debug!(
            slot_count,
            fair = config.fair,
            holder = ?config.holder,
            unlock_policy = ?config.unlock_policy,
            "Hashing entity locker initialized"
        );

        Ok(Self {
            slots,
            hasher,
            unlock_policy: config.unlock_policy,
            stats: LockerStats::new(),
            _id: PhantomData,
        })
    }

    /// Number of lock slots, fixed at construction
    #[inline]
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Slot `id` is routed to
    #[inline]
    pub fn slot_of(&self, id: &I) -> usize {
        route(self.hasher.hash_one(id), self.slots.len())
    }

    #[inline]
    fn slot(&self, id: &I) -> &ReentrantLock {
        self.slots[self.slot_of(id)].get()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }
}

impl<I, S, H> EntityLocker<I> for HashingEntityLocker<I, S, H>
where
    I: Hash + Send + Sync,
    S: BuildHasher + Send + Sync,
    H: LockHolder,
{
    fn lock(&self, id: &I) -> LockResult<()> {
        self.stats.record(self.slot(id).lock_interruptibly())
    }

    fn try_lock_for(&self, id: &I, timeout: Duration) -> LockResult<bool> {
        self.stats.record(self.slot(id).try_lock_for(timeout))
    }

    fn unlock(&self, id: &I) -> LockResult<()> {
        let slot = self.slot_of(id);
        match self.slots[slot].get().unlock() {
            Err(LockError::NotOwner) if self.unlock_policy == UnlockPolicy::Suppress => {
                self.stats.unlock_suppressed();
                warn!(slot, "Suppressed unlock of a slot not held by the current thread");
                Ok(())
            }
            result => {
                trace!(slot, ok = result.is_ok(), "Entity unlock");
                result
            }
        }
    }

    fn is_held_by_current_thread(&self, id: &I) -> bool {
        self.slot(id).is_held_by_current_thread()
    }

    fn queued_threads(&self, id: &I) -> usize {
        self.slot(id).queue_length()
    }
}
