/*!
 * Entity Locker
 *
 * In-process, reentrant, per-entity mutual exclusion: lock an entity id
 * (a primary key, say), work on the entity, unlock it. Row-level locking
 * without a database.
 *
 * Two interchangeable strategies implement [`EntityLocker`]:
 * - [`MapEntityLocker`]: a lock per active id, reclaimed when unused
 * - [`HashingEntityLocker`]: a fixed array of locks shared by hash
 *
 * Blocking acquisition can be cancelled from another thread through an
 * [`InterruptHandle`].
 */

pub mod core;
pub mod locker;
pub mod monitoring;

// Re-exports
pub use crate::core::errors::{LockError, LockResult};
pub use crate::core::guard::EntityGuard;
pub use crate::core::sync::{interrupt, InterruptHandle, ReentrantLock, StripedLockMap};
pub use locker::{
    DefaultLockMap, EagerLockHolder, EagerLockHolderFactory, EntityLocker, HashingConfig,
    HashingEntityLocker, HolderPolicy, LazyLockHolder, LazyLockHolderFactory, LockHolder,
    LockHolderFactory, LockMap, MapConfig, MapEntityLocker, SlotHolder, UnlockPolicy,
};
pub use monitoring::{init_tracing, LockerStats, StatsSnapshot};
