mod semaphore;

use crate::{
    bounded::semaphore::{Permit, Semaphore},
    config::{BoundedConfig, BoundedStrategy},
    error::Rejected,
    executor::{Executor, pool::ThreadPoolExecutor},
    sequential::KeySequentialExecutor,
    sync::{Arc, AtomicBool, Mutex, Ordering},
    task::{ExceptionHandler, Finally, KeyedTask, Task},
};
use core::{hash::Hash, num::NonZeroUsize, time::Duration};
use derive_more::{Debug, Deref};

/// Limits how many tasks may be admitted and not yet completed on a
/// downstream executor.
///
/// Every admitted task holds a permit until it finishes, fails, panics, or is
/// dropped unrun (for instance because the downstream executor refused it).
/// Once all permits are reclaimed by `drain`, the executor is drained for
/// good and refuses every later task with `Rejected::Drained`.
///
/// Admission and the drained check happen under one lock, which `drain`
/// also holds while it reclaims the permits. Under `BoundedStrategy::Block`
/// that lock is held while waiting for a permit, so concurrent blocking
/// submitters queue up behind each other. The accessors never take it.
#[must_use]
#[derive(Debug)]
pub struct BoundedExecutor<E> {
    config: BoundedConfig,
    semaphore: Arc<Semaphore>,
    admission: Mutex<()>,
    /// Only written with `admission` held.
    drained: AtomicBool,
    downstream: E,
}

impl<E> BoundedExecutor<E> {
    /// Admit at most `max_tasks` in-flight tasks into `downstream`.
    pub fn new(max_tasks: NonZeroUsize, strategy: BoundedStrategy, downstream: E) -> Self {
        Self::with_config(BoundedConfig::new(max_tasks).with_strategy(strategy), downstream)
    }

    /// Same as `new`, from a `BoundedConfig`.
    pub fn with_config(config: BoundedConfig, downstream: E) -> Self {
        Self {
            config,
            semaphore: Arc::new(Semaphore::new(config.max_tasks.get())),
            admission: Mutex::new(()),
            drained: AtomicBool::new(false),
            downstream,
        }
    }

    /// Configured capacity.
    #[must_use]
    pub fn max_tasks(&self) -> NonZeroUsize {
        self.config.max_tasks
    }

    /// Configured admission strategy.
    #[must_use]
    pub fn strategy(&self) -> BoundedStrategy {
        self.config.strategy
    }

    /// Permits currently free. Zero once drained.
    #[must_use]
    pub fn available_permits(&self) -> usize {
        self.semaphore.available()
    }

    /// Whether a `drain` has succeeded. Never waits on a blocked submitter.
    #[must_use]
    pub fn is_drained(&self) -> bool {
        self.drained.load(Ordering::Acquire)
    }

    /// The executor admitted tasks are forwarded to.
    pub fn downstream(&self) -> &E {
        &self.downstream
    }

    /// Wait up to `timeout` for every admitted task to complete, then refuse
    /// all further tasks.
    ///
    /// Returns `false`, with no other effect, if some task is still running
    /// when the timeout elapses; the call may be retried. Once it has returned
    /// `true` it keeps returning `true` immediately. `Duration::MAX` waits
    /// without a deadline.
    pub fn drain(&self, timeout: Duration) -> bool {
        let _admission = self.admission.lock();
        if self.is_drained() {
            return true;
        }
        if !self
            .semaphore
            .try_acquire_many_for(self.config.max_tasks.get(), timeout)
        {
            tracing::debug!(?timeout, "bounded executor drain timed out");
            return false;
        }
        self.drained.store(true, Ordering::Release);
        tracing::debug!(max_tasks = self.config.max_tasks.get(), "bounded executor drained");
        true
    }

    fn admit(&self) -> Result<Permit, Rejected> {
        let _admission = self.admission.lock();
        if self.is_drained() {
            return Err(Rejected::Drained);
        }
        match self.config.strategy {
            BoundedStrategy::Block => self.semaphore.acquire(),
            BoundedStrategy::Reject => {
                if !self.semaphore.try_acquire() {
                    return Err(Rejected::LimitExceeded {
                        max_tasks: self.config.max_tasks,
                    });
                }
            }
        }
        Ok(Permit::adopt(&self.semaphore))
    }
}

impl<T, E> Executor<T> for BoundedExecutor<E>
where
    T: Finally,
    E: Executor<T>,
{
    /// Admit `task` according to the strategy and forward it downstream.
    ///
    /// If the downstream executor refuses the task, its permit is released
    /// before the refusal is handed back.
    fn execute(&self, task: T) -> Result<(), Rejected> {
        let permit = self.admit()?;
        self.downstream.execute(task.finally(move || drop(permit)))
    }
}

/// A `KeySequentialExecutor` behind a `BoundedExecutor`: per-key ordering
/// with a global cap on in-flight tasks.
///
/// Dereferences to the underlying `BoundedExecutor` for `drain` and the
/// permit accessors.
#[must_use]
#[derive(Debug, Deref)]
pub struct KeySequentialBoundedExecutor<K, E = ThreadPoolExecutor> {
    inner: BoundedExecutor<KeySequentialExecutor<K, E>>,
}

impl<K, E> KeySequentialBoundedExecutor<K, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    E: Executor + 'static,
{
    /// Sequence tasks on `pool` with admission settings `config`.
    pub fn new(config: BoundedConfig, pool: E) -> Self {
        Self {
            inner: BoundedExecutor::with_config(config, KeySequentialExecutor::new(pool)),
        }
    }

    /// Same as `new`, reporting task failures to `handler`.
    pub fn with_exception_handler(
        config: BoundedConfig,
        pool: E,
        handler: impl ExceptionHandler<K> + 'static,
    ) -> Self {
        Self {
            inner: BoundedExecutor::with_config(
                config,
                KeySequentialExecutor::with_exception_handler(pool, handler),
            ),
        }
    }

    /// Admit `task` and queue it behind earlier tasks of `key`.
    ///
    /// # Errors
    /// Any admission refusal (`LimitExceeded`, `Drained`) or refusal of the
    /// sequential executor.
    pub fn submit(&self, key: K, task: Task) -> Result<(), Rejected> {
        self.inner.execute(KeyedTask::new(key, task))
    }
}

impl<K, E> KeySequentialBoundedExecutor<K, E> {
    /// Number of keys with a task pending or running.
    #[must_use]
    pub fn active_keys(&self) -> usize {
        self.inner.downstream().active_keys()
    }
}

impl<K, E> Executor<KeyedTask<K>> for KeySequentialBoundedExecutor<K, E>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    E: Executor + 'static,
{
    fn execute(&self, task: KeyedTask<K>) -> Result<(), Rejected> {
        self.inner.execute(task)
    }
}
