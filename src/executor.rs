/// The rayon-backed worker pool.
pub mod pool;

use crate::{error::Rejected, task::Task, utils::OnDrop};
use std::{cell::RefCell, collections::VecDeque, sync::Arc};

/// Something that accepts units of work for execution.
///
/// This is the seam between the sequencing/admission layers and whatever
/// actually runs tasks. `execute` either takes ownership of the task and
/// guarantees it will be run (or dropped, if the pool is torn down), or
/// refuses it with `Rejected`, in which case the task has already been
/// dropped.
pub trait Executor<T = Task>: Send + Sync {
    /// Submit `task`.
    ///
    /// # Errors
    /// `Rejected` when the executor refuses the task; the task does not run.
    fn execute(&self, task: T) -> Result<(), Rejected>;
}

impl<T, E: Executor<T> + ?Sized> Executor<T> for &E {
    fn execute(&self, task: T) -> Result<(), Rejected> {
        (**self).execute(task)
    }
}

impl<T, E: Executor<T> + ?Sized> Executor<T> for Arc<E> {
    fn execute(&self, task: T) -> Result<(), Rejected> {
        (**self).execute(task)
    }
}

impl<T, E: Executor<T> + ?Sized> Executor<T> for Box<E> {
    fn execute(&self, task: T) -> Result<(), Rejected> {
        (**self).execute(task)
    }
}

/// Runs every task inline, on the submitting thread. Never rejects.
///
/// A task submitted from inside a task that is already running on this
/// executor is queued and run once the running task returns, by the
/// outermost `execute` on the thread. Chains that keep resubmitting, such as
/// a busy key of a `KeySequentialExecutor`, thus run in a loop instead of
/// growing the stack.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectExecutor;

thread_local! {
    /// Tasks waiting for the outermost `DirectExecutor::execute` on this
    /// thread; `None` when no such call is in progress.
    static PENDING: RefCell<Option<VecDeque<Task>>> = const { RefCell::new(None) };
}

impl Executor for DirectExecutor {
    fn execute(&self, task: Task) -> Result<(), Rejected> {
        let first = PENDING.with_borrow_mut(|pending| match pending {
            Some(queued) => {
                queued.push_back(task);
                None
            }
            None => {
                *pending = Some(VecDeque::new());
                Some(task)
            }
        });
        let Some(mut task) = first else {
            return Ok(());
        };
        let _reset = OnDrop::new(|| PENDING.set(None));
        loop {
            if let Err(error) = task.run() {
                tracing::debug!(%error, "inline task failed");
            }
            match PENDING.with_borrow_mut(|pending| pending.as_mut().and_then(VecDeque::pop_front)) {
                Some(next) => task = next,
                None => return Ok(()),
            }
        }
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn nested_submission_runs_after_the_current_task() {
        let log = Arc::new(Mutex::new(vec![]));
        let outer = {
            let log = Arc::clone(&log);
            Task::from_fn(move || {
                let inner = {
                    let log = Arc::clone(&log);
                    Task::from_fn(move || log.lock().unwrap().push("inner"))
                };
                DirectExecutor.execute(inner).unwrap();
                log.lock().unwrap().push("outer");
            })
        };
        DirectExecutor.execute(outer).unwrap();
        assert_eq!(*log.lock().unwrap(), ["outer", "inner"]);

        // The thread is back to running submissions immediately.
        let again = Arc::clone(&log);
        DirectExecutor
            .execute(Task::from_fn(move || again.lock().unwrap().push("again")))
            .unwrap();
        assert_eq!(*log.lock().unwrap(), ["outer", "inner", "again"]);
    }

    #[test]
    fn failing_task_does_not_stop_queued_ones() {
        let log = Arc::new(Mutex::new(vec![]));
        let after = Arc::clone(&log);
        DirectExecutor
            .execute(Task::new(move || {
                DirectExecutor
                    .execute(Task::from_fn(move || after.lock().unwrap().push("after")))
                    .unwrap();
                Err("x")
            }))
            .unwrap();
        assert_eq!(*log.lock().unwrap(), ["after"]);
    }
}
