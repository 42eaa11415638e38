/*!
 * Core Module
 * Error handling, validation, synchronization primitives and guards
 */

pub mod errors;
pub mod guard;
pub mod sync;
pub mod validate;

// Re-export for convenience
pub use errors::*;
pub use guard::EntityGuard;
pub use sync::{interrupt, InterruptHandle, ReentrantLock, StripedLockMap};
