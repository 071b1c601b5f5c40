use core::num::NonZeroUsize;
use rayon::ThreadPoolBuilder;

/// What a `BoundedExecutor` does with a submission once `max_tasks` tasks are
/// in flight.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoundedStrategy {
    /// Block the submitting thread until a permit frees up.
    ///
    /// The wait is not interruptible, so a stalled downstream pool stalls the
    /// submitter as well.
    #[default]
    Block,
    /// Fail immediately with `Rejected::LimitExceeded`.
    Reject,
}

/// Admission settings of a `BoundedExecutor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedConfig {
    /// Maximum number of admitted tasks that have not yet completed.
    pub max_tasks: NonZeroUsize,
    /// Behaviour once `max_tasks` is reached.
    pub strategy: BoundedStrategy,
}

impl BoundedConfig {
    /// `max_tasks` with the default `Block` strategy.
    pub const fn new(max_tasks: NonZeroUsize) -> Self {
        Self {
            max_tasks,
            strategy: BoundedStrategy::Block,
        }
    }

    /// Replace the admission strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: BoundedStrategy) -> Self {
        self.strategy = strategy;
        self
    }
}

/// Settings of the rayon-backed `ThreadPoolExecutor`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Number of worker threads; `0` lets rayon pick one per logical CPU.
    pub num_threads: usize,
    /// Worker threads are named `{prefix}-{index}` when set.
    pub thread_name_prefix: Option<String>,
}

impl PoolConfig {
    /// Set the number of worker threads.
    #[must_use]
    pub fn with_num_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    /// Set the worker thread name prefix.
    #[must_use]
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = Some(prefix.into());
        self
    }

    pub(crate) fn builder(&self) -> ThreadPoolBuilder {
        let builder = ThreadPoolBuilder::new().num_threads(self.num_threads);
        match self.thread_name_prefix.clone() {
            Some(prefix) => builder.thread_name(move |idx| format!("{prefix}-{idx}")),
            None => builder,
        }
    }
}
