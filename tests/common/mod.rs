#![allow(dead_code)]

use keyseq::{config::PoolConfig, executor::pool::ThreadPoolExecutor};
use parking_lot::{Condvar, Mutex};
use std::time::{Duration, Instant};

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub fn pool(num_threads: usize) -> ThreadPoolExecutor {
    ThreadPoolExecutor::new(&PoolConfig::default().with_num_threads(num_threads)).unwrap()
}

/// Count-down latch.
#[derive(Debug)]
pub struct Latch {
    count: Mutex<usize>,
    zero: Condvar,
}

impl Latch {
    pub fn new(count: usize) -> Self {
        Self {
            count: Mutex::new(count),
            zero: Condvar::new(),
        }
    }

    pub fn count_down(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.zero.notify_all();
        }
    }

    /// `true` if the count reached zero within `timeout`.
    pub fn wait_for(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut count = self.count.lock();
        while *count != 0 {
            if self.zero.wait_until(&mut count, deadline).timed_out() {
                return *count == 0;
            }
        }
        true
    }

    pub fn wait(&self) {
        assert!(self.wait_for(TIMEOUT), "latch timed out");
    }
}

/// Polls `condition` until it holds or `TIMEOUT` elapses.
pub fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }
    condition()
}
