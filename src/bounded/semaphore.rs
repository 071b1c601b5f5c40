use crate::sync::{Arc, AtomicUsize, Condvar, Mutex, Ordering};
use core::fmt;
use std::time::{Duration, Instant};

/// Counting semaphore.
///
/// The permit count is a lock-free atomic; acquiring never takes the lock
/// unless it has to wait. Multi-permit acquisition is all-or-nothing: it
/// never holds a partial set of permits while waiting for the rest.
pub(crate) struct Semaphore {
    permits: AtomicUsize,
    lock: Mutex<()>,
    released: Condvar,
}

impl Semaphore {
    pub(crate) fn new(permits: usize) -> Self {
        Self {
            permits: AtomicUsize::new(permits),
            lock: Mutex::new(()),
            released: Condvar::new(),
        }
    }

    pub(crate) fn available(&self) -> usize {
        self.permits.load(Ordering::Acquire)
    }

    pub(crate) fn try_acquire(&self) -> bool {
        self.try_acquire_many(1)
    }

    pub(crate) fn try_acquire_many(&self, n: usize) -> bool {
        let mut current = self.permits.load(Ordering::Relaxed);
        loop {
            if current < n {
                return false;
            }
            match self.permits.compare_exchange(
                current,
                current - n,
                Ordering::Acquire,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Block until one permit is acquired. Not interruptible.
    pub(crate) fn acquire(&self) {
        if self.try_acquire() {
            return;
        }
        let mut guard = self.lock.lock();
        while !self.try_acquire() {
            self.released.wait(&mut guard);
        }
    }

    /// Acquire `n` permits at once, waiting at most `timeout`.
    ///
    /// `Duration::MAX` (or any timeout past the representable `Instant`
    /// range) waits forever.
    pub(crate) fn try_acquire_many_for(&self, n: usize, timeout: Duration) -> bool {
        if self.try_acquire_many(n) {
            return true;
        }
        let deadline = Instant::now().checked_add(timeout);
        let mut guard = self.lock.lock();
        loop {
            if self.try_acquire_many(n) {
                return true;
            }
            match deadline {
                None => self.released.wait(&mut guard),
                Some(deadline) => {
                    let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                        return false;
                    };
                    if self.released.wait_for(&mut guard, remaining).timed_out() {
                        return self.try_acquire_many(n);
                    }
                }
            }
        }
    }

    pub(crate) fn release(&self, n: usize) {
        self.permits.fetch_add(n, Ordering::Release);
        // Waiters check the count under this lock before parking, so taking it
        // here orders the notification after any such check.
        let _guard = self.lock.lock();
        self.released.notify_all();
    }
}

impl fmt::Debug for Semaphore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Semaphore")
            .field("permits", &self.available())
            .finish_non_exhaustive()
    }
}

/// One acquired permit, given back on drop.
#[must_use]
#[derive(Debug)]
pub(crate) struct Permit {
    semaphore: Arc<Semaphore>,
}

impl Permit {
    /// Take ownership of a permit the caller has already acquired from
    /// `semaphore`.
    pub(crate) fn adopt(semaphore: &Arc<Semaphore>) -> Self {
        Self {
            semaphore: Arc::clone(semaphore),
        }
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        self.semaphore.release(1);
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use std::{sync::mpsc, thread};

    #[test]
    fn multi_acquire_is_all_or_nothing() {
        let semaphore = Semaphore::new(3);
        assert!(semaphore.try_acquire());
        assert!(!semaphore.try_acquire_many(3));
        assert_eq!(semaphore.available(), 2);
        assert!(semaphore.try_acquire_many(2));
        assert_eq!(semaphore.available(), 0);
        assert!(!semaphore.try_acquire());
        semaphore.release(3);
        assert!(semaphore.try_acquire_many(3));
    }

    #[test]
    fn timed_acquire_gives_up() {
        let semaphore = Semaphore::new(2);
        assert!(semaphore.try_acquire());
        assert!(!semaphore.try_acquire_many_for(2, Duration::from_millis(10)));
        assert!(!semaphore.try_acquire_many_for(2, Duration::ZERO));
        assert_eq!(semaphore.available(), 1);
    }

    #[test]
    fn unbounded_timeout_does_not_overflow() {
        let semaphore = Semaphore::new(2);
        assert!(semaphore.try_acquire_many_for(2, Duration::MAX));
        assert_eq!(semaphore.available(), 0);
    }

    #[test]
    fn release_wakes_blocked_acquirers() {
        let semaphore = Arc::new(Semaphore::new(1));
        assert!(semaphore.try_acquire());

        let (tx, rx) = mpsc::channel();
        let waiter = {
            let semaphore = Arc::clone(&semaphore);
            thread::spawn(move || {
                semaphore.acquire();
                tx.send(()).unwrap();
            })
        };
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        semaphore.release(1);
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
        waiter.join().unwrap();
        assert_eq!(semaphore.available(), 0);
    }

    #[test]
    fn release_wakes_timed_multi_acquire() {
        let semaphore = Arc::new(Semaphore::new(2));
        assert!(semaphore.try_acquire_many(2));

        let waiter = {
            let semaphore = Arc::clone(&semaphore);
            thread::spawn(move || semaphore.try_acquire_many_for(2, Duration::from_secs(30)))
        };
        thread::sleep(Duration::from_millis(20));
        semaphore.release(1);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(semaphore.available(), 1);
        semaphore.release(1);
        assert!(waiter.join().unwrap());
        assert_eq!(semaphore.available(), 0);
    }

    #[test]
    fn permit_returns_on_drop() {
        let semaphore = Arc::new(Semaphore::new(1));
        assert!(semaphore.try_acquire());
        let permit = Permit::adopt(&semaphore);
        assert_eq!(semaphore.available(), 0);
        drop(permit);
        assert_eq!(semaphore.available(), 1);
    }
}
