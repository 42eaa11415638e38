/*!
 * Synchronization Primitives
 *
 * Building blocks for per-entity locking:
 * - [`ReentrantLock`]: owner-tracking, interruptible, optionally fair lock
 * - [`interrupt`]: cooperative cancellation of blocked acquisitions
 * - [`StripedLockMap`]: lock-striped id-to-lock map
 */

pub mod interrupt;
mod reentrant;
mod striped;

pub use interrupt::InterruptHandle;
pub use reentrant::ReentrantLock;
pub use striped::StripedLockMap;
