//! Per-poll wakeup object shared by several backends.
//!
//! A waiter is registered with every backend a poll call watches. Any of
//! them may notify it, so the flag below latches the notification until the
//! polling thread consumes it; a notification that lands while the poller is
//! re-evaluating readiness is not lost.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::{Condvar, Mutex};

static NEXT_WAITER_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) struct Waiter {
    id: u64,
    notified: Mutex<bool>,
    cond: Condvar,
}

impl Waiter {
    pub(crate) fn new() -> Self {
        Self {
            id: NEXT_WAITER_ID.fetch_add(1, Ordering::Relaxed),
            notified: Mutex::new(false),
            cond: Condvar::new(),
        }
    }

    #[inline(always)]
    pub(crate) fn id(&self) -> u64 {
        self.id
    }

    /// Latches a notification and wakes the poller if it is asleep.
    pub(crate) fn notify(&self) {
        let mut notified = self.notified.lock();
        *notified = true;
        self.cond.notify_one();
    }

    /// Blocks until notified, then clears the latch.
    pub(crate) fn wait(&self) {
        let mut notified = self.notified.lock();
        while !*notified {
            self.cond.wait(&mut notified);
        }
        *notified = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_notify_before_wait_is_not_lost() {
        let waiter = Waiter::new();
        waiter.notify();
        waiter.wait(); // Returns immediately
    }

    #[test]
    fn test_wait_woken_from_other_thread() {
        let waiter = Arc::new(Waiter::new());
        let remote = Arc::clone(&waiter);

        let notifier = thread::spawn(move || remote.notify());
        waiter.wait();
        notifier.join().unwrap();
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(Waiter::new().id(), Waiter::new().id());
    }
}
