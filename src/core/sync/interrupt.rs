/*!
 * Cooperative Thread Interruption
 *
 * Every thread owns an interrupt flag. Another thread holding an
 * [`InterruptHandle`] can raise it; a thread blocked in an interruptible
 * acquisition observes the flag, clears it and abandons the wait.
 *
 * # Wake-up protocol
 *
 * A blocked thread registers the primitive it waits on as its blocker and
 * re-checks the flag under that primitive's internal mutex before every wait.
 * `interrupt()` raises the flag first and only then reads the blocker, so the
 * flag is either seen by the waiter's next check or the waiter is already
 * parked and receives the wake-up.
 */

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

/// A primitive that can wake every thread parked on it
pub(crate) trait Wakeable: Send + Sync {
    fn wake_waiters(&self);
}

struct InterruptState {
    interrupted: AtomicBool,
    blocker: Mutex<Option<Arc<dyn Wakeable>>>,
}

impl InterruptState {
    fn new() -> Self {
        Self {
            interrupted: AtomicBool::new(false),
            blocker: Mutex::new(None),
        }
    }
}

thread_local! {
    static CURRENT: Arc<InterruptState> = Arc::new(InterruptState::new());
}

/// Handle used to interrupt a specific thread
///
/// Obtained on the target thread via [`current`] and then moved or cloned
/// to whichever thread wants to cancel it.
///
/// # Example
///
/// ```
/// use entity_locker::interrupt;
/// use std::sync::mpsc;
/// use std::thread;
///
/// let (tx, rx) = mpsc::channel();
/// let worker = thread::spawn(move || {
///     tx.send(interrupt::current()).unwrap();
///     while !interrupt::is_interrupted() {
///         thread::yield_now();
///     }
/// });
///
/// rx.recv().unwrap().interrupt();
/// worker.join().unwrap();
/// ```
#[derive(Clone)]
pub struct InterruptHandle {
    state: Arc<InterruptState>,
    thread: ThreadId,
}

impl InterruptHandle {
    /// Raise the interrupt flag and wake the thread if it is blocked on a lock
    pub fn interrupt(&self) {
        self.state.interrupted.store(true, Ordering::SeqCst);

        let blocker = self.state.blocker.lock().clone();
        if let Some(blocker) = blocker {
            blocker.wake_waiters();
        }
    }

    /// Check the flag without clearing it
    #[inline]
    pub fn is_interrupted(&self) -> bool {
        self.state.interrupted.load(Ordering::SeqCst)
    }

    /// Thread this handle interrupts
    #[inline]
    pub fn thread_id(&self) -> ThreadId {
        self.thread
    }
}

impl fmt::Debug for InterruptHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InterruptHandle")
            .field("thread", &self.thread)
            .field("interrupted", &self.is_interrupted())
            .finish()
    }
}

/// Handle for the calling thread
pub fn current() -> InterruptHandle {
    InterruptHandle {
        state: CURRENT.with(Arc::clone),
        thread: thread::current().id(),
    }
}

/// Test and clear the calling thread's interrupt flag
pub fn interrupted() -> bool {
    CURRENT.with(|state| state.interrupted.swap(false, Ordering::SeqCst))
}

/// Check the calling thread's interrupt flag without clearing it
pub fn is_interrupted() -> bool {
    CURRENT.with(|state| state.interrupted.load(Ordering::SeqCst))
}

/// Registration of the calling thread as blocked on `blocker`
///
/// Cleared on drop.
pub(crate) struct Blocked {
    state: Arc<InterruptState>,
}

impl Blocked {
    /// Consume a pending interrupt, if any
    #[inline]
    pub(crate) fn take_interrupt(&self) -> bool {
        self.state.interrupted.swap(false, Ordering::SeqCst)
    }
}

impl Drop for Blocked {
    fn drop(&mut self) {
        *self.state.blocker.lock() = None;
    }
}

pub(crate) fn block_on(blocker: Arc<dyn Wakeable>) -> Blocked {
    let state = CURRENT.with(Arc::clone);
    *state.blocker.lock() = Some(blocker);
    Blocked { state }
}
