mod queue;
mod registry;
mod runner;

use crate::{
    error::Rejected,
    executor::{Executor, pool::ThreadPoolExecutor},
    sequential::registry::Registry,
    sync::Arc,
    task::{ExceptionHandler, IgnoreExceptions, KeyedTask, Task},
};
use core::{fmt, hash::Hash};

/// Runs tasks sharing a key one at a time, in submission order, while tasks
/// of different keys run in parallel on a shared pool.
///
/// No thread is dedicated to a key: each key with pending work owns a small
/// runner that feeds its queue to the pool one task at a time and
/// unregisters itself as soon as the queue runs dry, so idle keys cost
/// nothing.
///
/// A failing task is reported to the exception handler together with its key
/// and does not stop later tasks of that key. If the pool refuses to continue
/// a key's chain (it was shut down), the tasks already queued for the key run
/// inline on the thread that saw the refusal, and every later submission for
/// that key fails with `Rejected::QueueClosed`.
pub struct KeySequentialExecutor<K, E = ThreadPoolExecutor> {
    shared: Arc<Shared<K, E>>,
}

pub(crate) struct Shared<K, E> {
    pool: E,
    registry: Registry<K>,
    handler: Box<dyn ExceptionHandler<K>>,
}

impl<K, E> KeySequentialExecutor<K, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    E: Executor + 'static,
{
    /// Sequence tasks on `pool`, discarding task failures.
    pub fn new(pool: E) -> Self {
        Self::with_exception_handler(pool, IgnoreExceptions)
    }

    /// Sequence tasks on `pool`, reporting task failures to `handler`.
    pub fn with_exception_handler(pool: E, handler: impl ExceptionHandler<K> + 'static) -> Self {
        Self {
            shared: Arc::new(Shared {
                pool,
                registry: Registry::new(),
                handler: Box::new(handler),
            }),
        }
    }

    /// Queue `task` behind every task previously submitted under `key`.
    ///
    /// Returns once the task is queued, not once it has run.
    ///
    /// # Errors
    /// - `Rejected::QueueClosed` if the key's queue was closed after the pool
    ///   refused to continue its chain.
    /// - Whatever the pool returns when it refuses to start a new chain.
    pub fn submit(&self, key: K, task: Task) -> Result<(), Rejected> {
        let runner = match self.shared.registry.enqueue(key, task) {
            Ok(Some(runner)) => runner,
            Ok(None) => return Ok(()),
            Err(_closed) => return Err(Rejected::QueueClosed),
        };
        tracing::trace!("key runner created");
        runner.trigger(&self.shared)
    }
}

impl<K, E> KeySequentialExecutor<K, E> {
    /// Number of keys with a task pending or running. Keys closed after a
    /// pool refusal are not counted.
    #[must_use]
    pub fn active_keys(&self) -> usize {
        self.shared.registry.len()
    }

    /// The pool tasks run on.
    pub fn pool(&self) -> &E {
        &self.shared.pool
    }
}

impl<K, E> Executor<KeyedTask<K>> for KeySequentialExecutor<K, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    E: Executor + 'static,
{
    fn execute(&self, task: KeyedTask<K>) -> Result<(), Rejected> {
        let (key, task) = task.into_parts();
        self.submit(key, task)
    }
}

impl<K, E> Clone for KeySequentialExecutor<K, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<K, E> fmt::Debug for KeySequentialExecutor<K, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeySequentialExecutor")
            .field("active_keys", &self.active_keys())
            .finish_non_exhaustive()
    }
}
