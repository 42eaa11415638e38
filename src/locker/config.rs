/*!
 * Locker Configuration
 *
 * Construction-time settings; fixed for the lifetime of a locker
 */

use crate::core::errors::LockResult;
use crate::core::validate::ensure_positive;
use serde::{Deserialize, Serialize};

/// How hashing-locker slots construct their lock
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HolderPolicy {
    /// Every slot's lock is built with the locker
    #[default]
    Eager,
    /// A slot's lock is built on first use
    Lazy,
}

/// What `unlock` does when the calling thread does not hold the slot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnlockPolicy {
    /// Log and return `Ok(())`; `unlock` never fails
    #[default]
    Suppress,
    /// Return `LockError::NotOwner`, matching the map strategy
    Propagate,
}

/// Hashing strategy configuration
///
/// Slot count is `max(1, approximate_entity_count / contention_factor)`.
/// A larger contention factor means fewer locks and more unrelated ids
/// sharing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashingConfig {
    /// Expected number of distinct ids
    pub approximate_entity_count: usize,
    /// Ids per lock
    pub contention_factor: usize,
    pub holder: HolderPolicy,
    /// FIFO admission of waiters
    pub fair: bool,
    pub unlock_policy: UnlockPolicy,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self::new(1024, 16)
    }
}

impl HashingConfig {
    pub const fn new(approximate_entity_count: usize, contention_factor: usize) -> Self {
        Self {
            approximate_entity_count,
            contention_factor,
            holder: HolderPolicy::Eager,
            fair: true,
            unlock_policy: UnlockPolicy::Suppress,
        }
    }

    /// Few, lazily built locks
    pub const fn low_memory() -> Self {
        Self {
            approximate_entity_count: 1024,
            contention_factor: 64,
            holder: HolderPolicy::Lazy,
            fair: true,
            unlock_policy: UnlockPolicy::Suppress,
        }
    }

    /// One lock per expected entity
    pub const fn fine_grained() -> Self {
        Self {
            approximate_entity_count: 4096,
            contention_factor: 1,
            holder: HolderPolicy::Eager,
            fair: true,
            unlock_policy: UnlockPolicy::Suppress,
        }
    }

    pub const fn with_holder(mut self, holder: HolderPolicy) -> Self {
        self.holder = holder;
        self
    }

    pub const fn with_fairness(mut self, fair: bool) -> Self {
        self.fair = fair;
        self
    }

    pub const fn with_unlock_policy(mut self, unlock_policy: UnlockPolicy) -> Self {
        self.unlock_policy = unlock_policy;
        self
    }

    /// Check both sizing inputs are positive
    pub fn validate(&self) -> LockResult<()> {
        ensure_positive(
            self.approximate_entity_count,
            "Approximate number of entities",
        )?;
        ensure_positive(self.contention_factor, "Lock contention factor")?;
        Ok(())
    }

    /// Number of lock slots this configuration yields
    pub fn slot_count(&self) -> LockResult<usize> {
        self.validate()?;
        Ok((self.approximate_entity_count / self.contention_factor).max(1))
    }
}

/// Map strategy configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// FIFO admission of waiters on each per-id lock
    pub fair: bool,
}

impl MapConfig {
    pub const fn fair() -> Self {
        Self { fair: true }
    }
}
