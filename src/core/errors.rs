/*!
 * Error Types
 * Centralized error handling with thiserror, miette, and serde support
 */

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type for lock operations
pub type LockResult<T> = Result<T, LockError>;

/// Lock errors with serialization support
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
#[serde(tag = "error_type", content = "details", rename_all = "snake_case")]
pub enum LockError {
    #[error("Invalid argument: {0}")]
    #[diagnostic(
        code(lock::invalid_argument),
        help("Sizing parameters must be positive. Check the locker configuration.")
    )]
    InvalidArgument(String),

    #[error("Interrupted while waiting for lock")]
    #[diagnostic(
        code(lock::interrupted),
        help("The waiting thread was interrupted. No lock was acquired.")
    )]
    Interrupted,

    #[error("Current thread does not hold the lock")]
    #[diagnostic(
        code(lock::not_owner),
        help("Every unlock must be paired with a prior successful lock on the same thread.")
    )]
    NotOwner,

    #[error("Maximum lock hold count exceeded")]
    #[diagnostic(
        code(lock::hold_count_overflow),
        help("The owning thread re-entered the lock too many times without releasing it.")
    )]
    HoldCountOverflow,
}

impl LockError {
    /// Whether this error is a caller contract violation rather than a runtime outcome
    #[inline]
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, LockError::NotOwner | LockError::InvalidArgument(_))
    }
}
