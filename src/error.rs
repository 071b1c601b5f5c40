use crate::types::BoxError;
use core::num::NonZeroUsize;
use thiserror::Error;

/// Signal returned when a submission is refused.
///
/// A rejected task has not run and will never run; it is dropped before the
/// error reaches the caller.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum Rejected {
    /// The key's queue stopped accepting tasks after the underlying pool
    /// refused a continuation.
    #[error("task queue for the key is closed")]
    QueueClosed,
    /// The bounded executor is at capacity and uses `BoundedStrategy::Reject`.
    #[error("task limit of {max_tasks} exceeded")]
    LimitExceeded {
        /// Configured capacity.
        max_tasks: NonZeroUsize,
    },
    /// The bounded executor has been drained and admits nothing anymore.
    #[error("executor drained")]
    Drained,
    /// The underlying pool is shut down.
    #[error("underlying pool is shut down")]
    PoolShutdown,
}

/// Failure of a task body, delivered to an `ExceptionHandler`.
///
/// Never surfaces to the submitter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TaskError {
    /// The body returned an error.
    #[error(transparent)]
    Failed(BoxError),
    /// The body panicked.
    #[error("task panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },
}

impl TaskError {
    /// Wrap an arbitrary error returned by a task body.
    pub fn failed(error: impl Into<BoxError>) -> Self {
        Self::Failed(error.into())
    }

    /// The error returned by the body, if it did not panic.
    #[must_use]
    pub fn as_failure(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Failed(error) => Some(error.as_ref()),
            Self::Panicked { .. } => None,
        }
    }

    /// Whether the body panicked.
    #[must_use]
    pub fn is_panic(&self) -> bool {
        matches!(self, Self::Panicked { .. })
    }
}
