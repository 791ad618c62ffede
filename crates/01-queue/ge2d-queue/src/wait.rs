//! Wake primitives shared between submitters and the dispatcher.
//!
//! [`Doorbell`] is a binary semaphore on a futex word (`atomic-wait`): ringing
//! it while already rung is a no-op, so it tells the worker that *some* work
//! exists rather than how much. [`Completion`] is a one-shot signal with a
//! bounded wait, used to hand a draining context back to its destroyer.

use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

const IDLE: u32 = 0;
const RUNG: u32 = 1;

/// Work-available signal for the dispatcher.
#[derive(Debug, Default)]
pub struct Doorbell {
    state: AtomicU32,
}

impl Doorbell {
    /// Creates a doorbell that is not rung.
    pub const fn new() -> Self {
        Self {
            state: AtomicU32::new(IDLE),
        }
    }

    /// Rings the bell, waking the waiter if it was idle.
    ///
    /// Returns `true` if this call changed the state.
    pub fn ring(&self) -> bool {
        if self.state.swap(RUNG, Ordering::AcqRel) == IDLE {
            atomic_wait::wake_one(&self.state);
            true
        } else {
            false
        }
    }

    /// Blocks until the bell is rung, then resets it.
    pub fn wait(&self) {
        while self.state.swap(IDLE, Ordering::AcqRel) != RUNG {
            atomic_wait::wait(&self.state, IDLE);
        }
    }

    /// Resets the bell without blocking; returns whether it was rung.
    pub fn try_take(&self) -> bool {
        self.state.swap(IDLE, Ordering::AcqRel) == RUNG
    }

    /// Whether the bell is currently rung.
    pub fn is_rung(&self) -> bool {
        self.state.load(Ordering::Acquire) == RUNG
    }
}

/// One-shot completion signal.
#[derive(Debug, Default)]
pub struct Completion {
    done: Mutex<bool>,
    cond: Condvar,
}

impl Completion {
    /// Creates an incomplete signal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks the signal complete and wakes every waiter.
    pub fn complete(&self) {
        *self.done.lock() = true;
        self.cond.notify_all();
    }

    /// Whether [`Completion::complete`] has been called.
    pub fn is_complete(&self) -> bool {
        *self.done.lock()
    }

    /// Waits up to `timeout` for completion; returns `false` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut done = self.done.lock();
        while !*done {
            if self.cond.wait_until(&mut done, deadline).timed_out() {
                return *done;
            }
        }
        true
    }

    /// Clears the signal so it can be waited on again.
    pub fn reinit(&self) {
        *self.done.lock() = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn doorbell_coalesces_rings() {
        let bell = Doorbell::new();
        assert!(bell.ring());
        assert!(!bell.ring(), "second ring must not count");
        assert!(bell.try_take());
        assert!(!bell.try_take());
    }

    #[test]
    fn doorbell_wakes_parked_waiter() {
        let bell = Arc::new(Doorbell::new());
        let waiter = {
            let bell = Arc::clone(&bell);
            thread::spawn(move || bell.wait())
        };
        thread::sleep(Duration::from_millis(20));
        bell.ring();
        waiter.join().expect("waiter thread");
        assert!(!bell.is_rung());
    }

    #[test]
    fn completion_times_out_then_completes() {
        let completion = Arc::new(Completion::new());
        assert!(!completion.wait_timeout(Duration::from_millis(10)));

        let signaller = {
            let completion = Arc::clone(&completion);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(20));
                completion.complete();
            })
        };
        assert!(completion.wait_timeout(Duration::from_secs(5)));
        signaller.join().expect("signaller thread");

        completion.reinit();
        assert!(!completion.is_complete());
    }
}
