//! Wake signal from the audio thread to the control thread.

use parking_lot::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

/// Mutex + condition variable used purely as a doorbell.
///
/// The audio side only ever `try_lock`s; if the control thread is busy
/// holding the lock, the ring is simply not rung and the control thread picks
/// the data up after its next timeout.
#[derive(Debug, Default)]
pub struct WakeSignal {
    lock: Mutex<()>,
    cond: Condvar,
}

impl WakeSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Real-time safe: signals only if the lock is free right now.
    #[inline]
    pub fn notify_nonblocking(&self) -> bool {
        match self.lock.try_lock() {
            Some(_guard) => {
                self.cond.notify_one();
                true
            }
            None => false,
        }
    }

    /// Blocking variant for shutdown paths off the audio thread.
    pub fn notify(&self) {
        let _guard = self.lock.lock();
        self.cond.notify_all();
    }

    /// Lock held by the waiting side between waits.
    pub fn lock(&self) -> MutexGuard<'_, ()> {
        self.lock.lock()
    }

    /// Release `guard`, sleep until notified or `timeout` elapses, relock.
    /// Returns `true` on timeout.
    pub fn wait(&self, guard: &mut MutexGuard<'_, ()>, timeout: Duration) -> bool {
        self.cond.wait_for(guard, timeout).timed_out()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn test_nonblocking_fails_while_held() {
        let wake = WakeSignal::new();
        let guard = wake.lock();
        assert!(!wake.notify_nonblocking());
        drop(guard);
        assert!(wake.notify_nonblocking());
    }

    #[test]
    fn test_wait_times_out() {
        let wake = WakeSignal::new();
        let mut guard = wake.lock();
        let start = Instant::now();
        assert!(wake.wait(&mut guard, Duration::from_millis(20)));
        assert!(start.elapsed() >= Duration::from_millis(15));
    }

    #[test]
    fn test_notify_wakes_waiter() {
        let wake = Arc::new(WakeSignal::new());
        let mut guard = wake.lock();

        let notifier = {
            let wake = Arc::clone(&wake);
            thread::spawn(move || wake.notify())
        };

        // `notify` needs the lock, so it can only fire once we are waiting.
        let timed_out = wake.wait(&mut guard, Duration::from_secs(5));
        drop(guard);
        notifier.join().unwrap();
        assert!(!timed_out);
    }
}
