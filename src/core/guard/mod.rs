/*!
 * RAII Resource Guards
 *
 * Scoped entity-lock acquisition: the lock is released when the guard goes
 * out of scope, on every exit path including unwinding.
 *
 * ## Example
 *
 * ```rust
 * use entity_locker::{EntityLocker, MapEntityLocker};
 *
 * let locker = MapEntityLocker::<u64>::new();
 * {
 *     let _guard = locker.lock_guard(&42)?;
 *     // entity 42 is exclusively ours here
 * } // released
 * # Ok::<(), entity_locker::LockError>(())
 * ```
 */

mod entity;

pub use entity::EntityGuard;
