use crate::{sync::Mutex, task::Task};
use std::collections::VecDeque;

/// FIFO of pending tasks for one key.
///
/// Every operation takes the same lock, so operations are atomic with respect
/// to each other. Once closed, `enqueue` refuses new tasks while `dequeue`
/// keeps handing out the ones already queued.
#[derive(Debug)]
pub(crate) struct TaskQueue {
    state: Mutex<QueueState>,
}

#[derive(Debug)]
struct QueueState {
    tasks: VecDeque<Task>,
    accepting: bool,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self {
            state: Mutex::new(QueueState {
                tasks: VecDeque::new(),
                accepting: true,
            }),
        }
    }
}

impl TaskQueue {
    pub(crate) fn with_task(task: Task) -> Self {
        Self {
            state: Mutex::new(QueueState {
                tasks: VecDeque::from([task]),
                accepting: true,
            }),
        }
    }

    /// Hands `task` back if the queue is closed.
    pub(crate) fn enqueue(&self, task: Task) -> Result<(), Task> {
        let mut state = self.state.lock();
        if !state.accepting {
            return Err(task);
        }
        state.tasks.push_back(task);
        Ok(())
    }

    pub(crate) fn dequeue(&self) -> Option<Task> {
        self.state.lock().tasks.pop_front()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.state.lock().tasks.is_empty()
    }

    pub(crate) fn is_closed(&self) -> bool {
        !self.state.lock().accepting
    }

    /// Stop accepting tasks. Already queued tasks stay queued.
    pub(crate) fn close(&self) {
        self.state.lock().accepting = false;
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use std::{
        sync::{Arc, Mutex as StdMutex},
        thread,
        time::Duration,
    };

    fn recording(log: &Arc<StdMutex<Vec<usize>>>, idx: usize) -> Task {
        let log = Arc::clone(log);
        Task::from_fn(move || log.lock().unwrap().push(idx))
    }

    #[test]
    fn enqueue_dequeue_across_threads() {
        let queue = Arc::new(TaskQueue::default());
        let log = Arc::new(StdMutex::new(vec![]));

        let producer = {
            let queue = Arc::clone(&queue);
            let log = Arc::clone(&log);
            thread::spawn(move || {
                for idx in 0..100 {
                    assert!(queue.enqueue(recording(&log, idx)).is_ok());
                }
            })
        };

        let mut dequeued = 0;
        while dequeued < 100 {
            match queue.dequeue() {
                Some(task) => {
                    task.run().unwrap();
                    dequeued += 1;
                }
                None => thread::sleep(Duration::from_millis(1)),
            }
        }
        producer.join().unwrap();

        assert!(queue.is_empty());
        assert_eq!(*log.lock().unwrap(), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn close_refuses_new_but_keeps_queued() {
        let log = Arc::new(StdMutex::new(vec![]));
        let queue = TaskQueue::with_task(recording(&log, 0));
        assert!(queue.enqueue(recording(&log, 1)).is_ok());

        queue.close();
        let refused = queue.enqueue(recording(&log, 2)).unwrap_err();
        assert!(!queue.is_empty());

        while let Some(task) = queue.dequeue() {
            task.run().unwrap();
        }
        assert!(queue.is_empty());
        assert_eq!(*log.lock().unwrap(), [0, 1]);

        // The refused task is handed back intact.
        refused.run().unwrap();
        assert_eq!(*log.lock().unwrap(), [0, 1, 2]);
    }

    #[test]
    fn close_is_idempotent() {
        let queue = TaskQueue::default();
        assert!(!queue.is_closed());
        queue.close();
        queue.close();
        assert!(queue.is_closed());
        assert!(queue.enqueue(Task::from_fn(|| {})).is_err());
        assert!(queue.dequeue().is_none());
    }
}
