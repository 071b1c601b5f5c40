use crate::{
    error::Rejected,
    executor::Executor,
    sequential::{Shared, queue::TaskQueue},
    sync::Arc,
    task::Task,
};
use core::hash::Hash;

/// Drives the tasks of one key on the shared pool, one at a time.
///
/// The chain is a trampoline: a step runs the head of the queue and then
/// submits the next step to the pool as a fresh task, so a long backlog
/// neither grows the stack nor pins a worker. Exactly one step of a runner is
/// ever outstanding, which is what keeps the key's tasks sequential.
///
/// Lifecycle: active while registered; retired (unregistered) once its queue
/// is found empty twice, the second time under the registry lock; closed for
/// good if the pool refuses a step, in which case it stays registered so the
/// key keeps refusing submissions.
#[derive(Debug)]
pub(crate) struct KeyRunner<K> {
    key: K,
    queue: TaskQueue,
}

impl<K> KeyRunner<K> {
    pub(crate) fn new(key: K, first: Task) -> Self {
        Self {
            key,
            queue: TaskQueue::with_task(first),
        }
    }

    pub(crate) fn key(&self) -> &K {
        &self.key
    }

    pub(crate) fn queue(&self) -> &TaskQueue {
        &self.queue
    }
}

impl<K> KeyRunner<K>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
{
    /// Start the chain of a runner that was just registered.
    ///
    /// If the pool refuses, the head of the queue (the caller's own task) is
    /// dropped unrun and the error is handed back; anything other submitters
    /// queued in the meantime was accepted and still runs, inline. The runner
    /// is unregistered only after that inline drain.
    pub(crate) fn trigger<E>(self: &Arc<Self>, shared: &Arc<Shared<K, E>>) -> Result<(), Rejected>
    where
        E: Executor + 'static,
    {
        self.schedule(shared).inspect_err(|_| {
            drop(self.queue.dequeue());
            self.close_and_drain(shared);
            // No chain ever ran for this runner, so once its queue is empty the
            // key may start afresh.
            shared.registry.remove(self);
        })
    }

    fn schedule<E>(self: &Arc<Self>, shared: &Arc<Shared<K, E>>) -> Result<(), Rejected>
    where
        E: Executor + 'static,
    {
        let runner = Arc::clone(self);
        let chain = Arc::clone(shared);
        shared
            .pool
            .execute(Task::from_fn(move || runner.step(&chain)))
    }

    fn step<E>(self: Arc<Self>, shared: &Arc<Shared<K, E>>)
    where
        E: Executor + 'static,
    {
        if let Some(task) = self.queue.dequeue() {
            self.run(task, shared);
        }
        // Fast check first; the locked re-check closes the window where a
        // submitter found this runner registered just as it went idle.
        if self.queue.is_empty() && shared.registry.retire_if_idle(&self) {
            tracing::trace!("key runner retired");
            return;
        }
        if self.schedule(shared).is_err() {
            // Stays registered, closed, so later submissions for the key are
            // refused instead of racing the inline drain.
            self.close_and_drain(shared);
        }
    }

    fn run<E>(&self, task: Task, shared: &Shared<K, E>) {
        if let Err(error) = task.run() {
            shared.handler.on_task_exception(Some(&self.key), &error);
        }
    }

    /// The pool refused this chain. Stop accepting tasks for the key and run
    /// whatever is queued on the current thread.
    fn close_and_drain<E>(&self, shared: &Shared<K, E>) {
        self.queue.close();
        let mut inline = 0usize;
        while let Some(task) = self.queue.dequeue() {
            self.run(task, shared);
            inline += 1;
        }
        tracing::warn!(inline, "pool rejected key runner, queued tasks ran inline");
    }
}
