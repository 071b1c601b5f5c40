use crate::{
    error::TaskError,
    types::{BoxError, TaskResult},
    utils::{OnDrop, PanicMessage},
};
use core::hash::{Hash, Hasher};
use derive_more::{Debug, Display};
use std::panic::{self, AssertUnwindSafe};

type Body = Box<dyn FnOnce() -> TaskResult + Send + 'static>;

/// A unit of work submitted for execution.
///
/// Running a task never unwinds into the caller: both a returned error and a
/// panic come back as a `TaskError`.
#[must_use]
#[derive(Debug)]
pub struct Task {
    #[debug(skip)]
    body: Body,
}

impl Task {
    /// A task whose body may fail with any error convertible into a boxed
    /// error.
    pub fn new<F, E>(body: F) -> Self
    where
        F: FnOnce() -> Result<(), E> + Send + 'static,
        E: Into<BoxError>,
    {
        Self::from_body(Box::new(move || body().map_err(TaskError::failed)))
    }

    /// A task whose body cannot fail (other than by panicking).
    pub fn from_fn<F>(body: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self::from_body(Box::new(move || {
            body();
            Ok(())
        }))
    }

    fn from_body(body: Body) -> Self {
        Self { body }
    }

    /// Run the body on the current thread.
    pub fn run(self) -> TaskResult {
        let Self { body } = self;
        match panic::catch_unwind(AssertUnwindSafe(body)) {
            Ok(result) => result,
            Err(payload) => Err(TaskError::Panicked {
                message: payload.message(),
            }),
        }
    }
}

/// Work that can carry a completion hook.
pub trait Finally: Sized + Send + 'static {
    /// Attach `hook`, to run exactly once after the body finishes, whatever
    /// its outcome, or when the work is dropped without ever running.
    fn finally<F>(self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static;
}

impl Finally for Task {
    fn finally<F>(self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let guard = OnDrop::new(hook);
        Self::from_body(Box::new(move || {
            let _guard = guard;
            self.run()
        }))
    }
}

/// A task paired with the key it is sequenced under.
///
/// Equality and hashing look at the key only.
#[must_use]
#[derive(Debug, Display)]
#[display("{key}")]
pub struct KeyedTask<K> {
    key: K,
    task: Task,
}

impl<K> KeyedTask<K> {
    /// Pair `task` with `key`.
    pub fn new(key: K, task: Task) -> Self {
        Self { key, task }
    }

    /// The key this task is sequenced under.
    pub fn key(&self) -> &K {
        &self.key
    }

    /// Split into key and task.
    pub fn into_parts(self) -> (K, Task) {
        let Self { key, task } = self;
        (key, task)
    }

    /// Run the task on the current thread, ignoring the key.
    pub fn run(self) -> TaskResult {
        self.task.run()
    }
}

impl<K: PartialEq> PartialEq for KeyedTask<K> {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl<K: Eq> Eq for KeyedTask<K> {}

impl<K: Hash> Hash for KeyedTask<K> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

impl<K: Send + 'static> Finally for KeyedTask<K> {
    fn finally<F>(self, hook: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let Self { key, task } = self;
        Self {
            key,
            task: task.finally(hook),
        }
    }
}

/// Receives failures of task bodies.
///
/// `key` is `Some` when the task was submitted under a key and `None` for
/// tasks run directly on a pool. Implemented for any
/// `Fn(Option<&K>, &TaskError)`.
pub trait ExceptionHandler<K: ?Sized>: Send + Sync {
    /// Called on the thread that ran the failed task, before the next task of
    /// the same key is scheduled.
    fn on_task_exception(&self, key: Option<&K>, error: &TaskError);
}

impl<K: ?Sized, F> ExceptionHandler<K> for F
where
    F: Fn(Option<&K>, &TaskError) + Send + Sync,
{
    fn on_task_exception(&self, key: Option<&K>, error: &TaskError) {
        self(key, error);
    }
}

/// Discards task failures. The default handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreExceptions;

impl<K: ?Sized> ExceptionHandler<K> for IgnoreExceptions {
    fn on_task_exception(&self, _key: Option<&K>, _error: &TaskError) {}
}

/// Reports task failures as `tracing` error events.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogExceptions;

impl<K: core::fmt::Debug + ?Sized> ExceptionHandler<K> for LogExceptions {
    fn on_task_exception(&self, key: Option<&K>, error: &TaskError) {
        tracing::error!(?key, %error, "task failed");
    }
}
