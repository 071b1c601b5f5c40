use crate::{
    config::PoolConfig,
    error::Rejected,
    executor::Executor,
    task::{ExceptionHandler, IgnoreExceptions, Task},
};
use core::sync::atomic::{AtomicBool, Ordering};
use derive_more::Debug;
use rayon::{ThreadPool, ThreadPoolBuildError};
use std::sync::Arc;

/// Shared worker pool backed by a `rayon::ThreadPool`.
///
/// Once `shutdown` is called every further `execute` is refused with
/// `Rejected::PoolShutdown`; tasks already handed to rayon still run.
/// Failures of tasks run directly on the pool go to its exception handler
/// with no key.
#[must_use]
#[derive(Debug)]
pub struct ThreadPoolExecutor {
    pool: ThreadPool,
    shutdown: AtomicBool,
    #[debug(skip)]
    handler: Arc<dyn ExceptionHandler<()>>,
}

impl ThreadPoolExecutor {
    /// Build a pool from `config`.
    ///
    /// # Errors
    /// When rayon fails to spawn the worker threads.
    pub fn new(config: &PoolConfig) -> Result<Self, ThreadPoolBuildError> {
        config.builder().build().map(Self::from_pool)
    }

    /// Wrap an existing rayon pool.
    pub fn from_pool(pool: ThreadPool) -> Self {
        Self {
            pool,
            shutdown: AtomicBool::new(false),
            handler: Arc::new(IgnoreExceptions),
        }
    }

    /// Route failures of unkeyed tasks to `handler`.
    pub fn with_exception_handler(mut self, handler: impl ExceptionHandler<()> + 'static) -> Self {
        self.handler = Arc::new(handler);
        self
    }

    /// Stop accepting tasks. Idempotent.
    pub fn shutdown(&self) {
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            tracing::debug!("thread pool shut down");
        }
    }

    /// Whether `shutdown` has been called.
    #[must_use]
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Number of worker threads.
    #[must_use]
    pub fn current_num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }
}

impl Executor for ThreadPoolExecutor {
    fn execute(&self, task: Task) -> Result<(), Rejected> {
        if self.is_shutdown() {
            return Err(Rejected::PoolShutdown);
        }
        let handler = Arc::clone(&self.handler);
        self.pool.spawn(move || {
            if let Err(error) = task.run() {
                handler.on_task_exception(None, &error);
            }
        });
        Ok(())
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use crate::error::TaskError;
    use std::{sync::mpsc, time::Duration};

    #[test]
    fn named_threads() {
        let config = PoolConfig::default()
            .with_num_threads(2)
            .with_thread_name_prefix("worker");
        let pool = ThreadPoolExecutor::new(&config).unwrap();
        assert_eq!(pool.current_num_threads(), 2);

        let (tx, rx) = mpsc::channel();
        pool.execute(Task::from_fn(move || {
            let name = std::thread::current().name().map(str::to_owned);
            tx.send(name).unwrap();
        }))
        .unwrap();
        let name = rx.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert!(name.starts_with("worker-"), "{name}");
    }

    #[test]
    fn rejects_after_shutdown() {
        let pool = ThreadPoolExecutor::new(&PoolConfig::default().with_num_threads(1)).unwrap();
        assert!(!pool.is_shutdown());
        pool.shutdown();
        pool.shutdown();
        assert!(pool.is_shutdown());
        assert_eq!(
            pool.execute(Task::from_fn(|| {})),
            Err(Rejected::PoolShutdown)
        );
    }

    #[test]
    fn unkeyed_failure_reaches_handler() {
        let (tx, rx) = mpsc::channel();
        let tx = std::sync::Mutex::new(tx);
        let pool = ThreadPoolExecutor::new(&PoolConfig::default().with_num_threads(1))
            .unwrap()
            .with_exception_handler(move |key: Option<&()>, error: &TaskError| {
                tx.lock().unwrap().send((key.is_none(), error.to_string())).unwrap();
            });
        pool.execute(Task::new(|| Err("x"))).unwrap();
        let (no_key, message) = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(no_key);
        assert_eq!(message, "x");
    }
}
