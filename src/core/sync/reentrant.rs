/*!
 * Reentrant Lock
 *
 * Owner-tracking, interruptible mutual exclusion with optional FIFO fairness.
 *
 * # Design
 *
 * `parking_lot` mutexes are not reentrant, so ownership is tracked
 * explicitly: a small `parking_lot::Mutex` guards the owner thread id, the
 * hold count and a ticket queue of waiting threads, and a `Condvar` parks
 * waiters until the lock is released.
 *
 * - **Fair**: only the head of the ticket queue may take a free lock
 * - **Unfair**: any waiter may take a free lock, and new arrivals barge
 *   past the queue
 *
 * The handle is cheap to clone; clones share one lock. [`ReentrantLock::ptr_eq`]
 * tells whether two handles are the same lock instance.
 */

use super::interrupt::{self, Wakeable};
use crate::core::errors::{LockError, LockResult};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::thread::{self, ThreadId};
use std::time::{Duration, Instant};

type Ticket = u64;

struct LockState {
    owner: Option<ThreadId>,
    holds: usize,
    queue: VecDeque<Ticket>,
    next_ticket: Ticket,
}

impl LockState {
    const fn new() -> Self {
        Self {
            owner: None,
            holds: 0,
            queue: VecDeque::new(),
            next_ticket: 0,
        }
    }

    /// Can `ticket` (or a fresh arrival, for `None`) take the lock now
    #[inline]
    fn is_free_for(&self, ticket: Option<Ticket>, fair: bool) -> bool {
        if self.owner.is_some() {
            return false;
        }
        if !fair {
            return true;
        }
        match ticket {
            Some(ticket) => self.queue.front() == Some(&ticket),
            None => self.queue.is_empty(),
        }
    }

    #[inline]
    fn grant(&mut self, owner: ThreadId) {
        self.owner = Some(owner);
        self.holds = 1;
    }

    #[inline]
    fn reenter(&mut self) -> LockResult<()> {
        self.holds = self
            .holds
            .checked_add(1)
            .ok_or(LockError::HoldCountOverflow)?;
        Ok(())
    }

    fn enqueue(&mut self) -> Ticket {
        let ticket = self.next_ticket;
        self.next_ticket = self.next_ticket.wrapping_add(1);
        self.queue.push_back(ticket);
        ticket
    }

    fn leave(&mut self, ticket: Ticket) {
        if let Some(pos) = self.queue.iter().position(|t| *t == ticket) {
            self.queue.remove(pos);
        }
    }
}

struct LockCore {
    state: Mutex<LockState>,
    available: Condvar,
    fair: bool,
}

impl Wakeable for LockCore {
    fn wake_waiters(&self) {
        let _state = self.state.lock();
        self.available.notify_all();
    }
}

/// Reentrant, interruptible mutual-exclusion lock
///
/// # Example
///
/// ```
/// use entity_locker::ReentrantLock;
///
/// let lock = ReentrantLock::new(true);
/// lock.lock_interruptibly()?;
/// lock.lock_interruptibly()?; // reentrant
/// assert_eq!(lock.hold_count(), 2);
///
/// lock.unlock()?;
/// lock.unlock()?;
/// assert!(!lock.is_locked());
/// # Ok::<(), entity_locker::LockError>(())
/// ```
#[derive(Clone)]
pub struct ReentrantLock {
    core: Arc<LockCore>,
}

impl ReentrantLock {
    /// Create a lock; `fair` selects FIFO admission of waiters
    pub fn new(fair: bool) -> Self {
        Self {
            core: Arc::new(LockCore {
                state: Mutex::new(LockState::new()),
                available: Condvar::new(),
                fair,
            }),
        }
    }

    /// Block until the lock is held by the calling thread
    ///
    /// Returns [`LockError::Interrupted`] if the calling thread is interrupted
    /// before or while waiting.
    pub fn lock_interruptibly(&self) -> LockResult<()> {
        self.acquire(None).map(|_| ())
    }

    /// Take the lock only if it is free or already held by the calling thread
    ///
    /// Ignores fairness: a free lock is taken even if others are queued.
    pub fn try_lock(&self) -> bool {
        let me = thread::current().id();
        let mut state = self.core.state.lock();

        if state.owner == Some(me) {
            return state.reenter().is_ok();
        }
        if state.owner.is_none() {
            state.grant(me);
            return true;
        }
        false
    }

    /// Wait up to `timeout` for the lock
    ///
    /// Returns `Ok(false)` if the timeout elapsed without acquiring.
    pub fn try_lock_for(&self, timeout: Duration) -> LockResult<bool> {
        // A timeout beyond the clock's range is an unbounded wait
        self.acquire(Instant::now().checked_add(timeout))
    }

    /// Wait until `deadline` for the lock
    pub fn try_lock_until(&self, deadline: Instant) -> LockResult<bool> {
        self.acquire(Some(deadline))
    }

    fn acquire(&self, deadline: Option<Instant>) -> LockResult<bool> {
        if interrupt::interrupted() {
            return Err(LockError::Interrupted);
        }

        let me = thread::current().id();
        let fair = self.core.fair;
        let mut state = self.core.state.lock();

        if state.owner == Some(me) {
            state.reenter()?;
            return Ok(true);
        }
        if state.is_free_for(None, fair) {
            state.grant(me);
            return Ok(true);
        }

        let ticket = state.enqueue();
        let blocked = interrupt::block_on(self.core.clone());

        loop {
            if blocked.take_interrupt() {
                state.leave(ticket);
                self.pass_wakeup(&state);
                return Err(LockError::Interrupted);
            }

            if state.is_free_for(Some(ticket), fair) {
                state.leave(ticket);
                state.grant(me);
                return Ok(true);
            }

            match deadline {
                None => self.core.available.wait(&mut state),
                Some(deadline) => {
                    if Instant::now() >= deadline {
                        state.leave(ticket);
                        self.pass_wakeup(&state);
                        return Ok(false);
                    }
                    self.core.available.wait_until(&mut state, deadline);
                }
            }
        }
    }

    /// A waiter leaving without the lock may have consumed the wake-up meant
    /// for the next one
    #[inline]
    fn pass_wakeup(&self, state: &LockState) {
        if state.owner.is_none() && !state.queue.is_empty() {
            self.core.available.notify_all();
        }
    }

    /// Release one hold
    ///
    /// Returns [`LockError::NotOwner`] if the calling thread does not hold the lock.
    pub fn unlock(&self) -> LockResult<()> {
        let me = thread::current().id();
        let mut state = self.core.state.lock();

        if state.owner != Some(me) {
            return Err(LockError::NotOwner);
        }

        state.holds -= 1;
        if state.holds == 0 {
            state.owner = None;
            if !state.queue.is_empty() {
                if self.core.fair {
                    self.core.available.notify_all();
                } else {
                    self.core.available.notify_one();
                }
            }
        }
        Ok(())
    }

    /// Whether any thread is waiting to acquire
    #[inline]
    pub fn has_queued_threads(&self) -> bool {
        !self.core.state.lock().queue.is_empty()
    }

    /// Number of threads waiting to acquire
    #[inline]
    pub fn queue_length(&self) -> usize {
        self.core.state.lock().queue.len()
    }

    /// Whether any thread holds the lock
    #[inline]
    pub fn is_locked(&self) -> bool {
        self.core.state.lock().owner.is_some()
    }

    #[inline]
    pub fn is_held_by_current_thread(&self) -> bool {
        self.core.state.lock().owner == Some(thread::current().id())
    }

    /// Holds of the calling thread (0 if it is not the owner)
    pub fn hold_count(&self) -> usize {
        let state = self.core.state.lock();
        if state.owner == Some(thread::current().id()) {
            state.holds
        } else {
            0
        }
    }

    #[inline]
    pub fn is_fair(&self) -> bool {
        self.core.fair
    }

    /// Whether both handles refer to the same lock instance
    #[inline]
    pub fn ptr_eq(&self, other: &ReentrantLock) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }
}

impl Default for ReentrantLock {
    fn default() -> Self {
        Self::new(false)
    }
}

impl fmt::Debug for ReentrantLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.core.state.lock();
        f.debug_struct("ReentrantLock")
            .field("fair", &self.core.fair)
            .field("owner", &state.owner)
            .field("holds", &state.holds)
            .field("queued", &state.queue.len())
            .finish()
    }
}
