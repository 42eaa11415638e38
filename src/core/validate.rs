/*!
 * Argument Validation
 */

use super::errors::{LockError, LockResult};

/// Reject zero where a positive count is required
#[inline]
pub fn ensure_positive(value: usize, what: &str) -> LockResult<usize> {
    if value == 0 {
        return Err(LockError::InvalidArgument(format!(
            "{} should be more than 0",
            what
        )));
    }
    Ok(value)
}
