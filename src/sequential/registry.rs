use crate::{
    sequential::runner::KeyRunner,
    sync::{Arc, Mutex},
    task::Task,
    types::HashMap,
};
use core::hash::Hash;
use rustc_hash::FxBuildHasher;
use std::collections::hash_map::Entry;

/// Key to runner map.
///
/// A live runner is present exactly while its key has a task pending or
/// running. A runner whose chain the pool refused stays behind, closed, so
/// the key keeps refusing submissions.
/// Lock order is registry first, then a runner's queue.
#[derive(Debug)]
pub(crate) struct Registry<K> {
    runners: Mutex<HashMap<K, Arc<KeyRunner<K>>>>,
}

impl<K> Registry<K> {
    pub(crate) fn new() -> Self {
        Self {
            runners: Mutex::new(HashMap::with_hasher(FxBuildHasher)),
        }
    }

    /// Number of live (not closed) runners.
    pub(crate) fn len(&self) -> usize {
        self.runners
            .lock()
            .values()
            .filter(|runner| !runner.queue().is_closed())
            .count()
    }
}

impl<K: Eq + Hash + Clone> Registry<K> {
    /// Queue `task` under `key`.
    ///
    /// Returns the runner when it was created by this call; the caller must
    /// then trigger it. Hands `task` back if the key's queue is closed.
    pub(crate) fn enqueue(&self, key: K, task: Task) -> Result<Option<Arc<KeyRunner<K>>>, Task> {
        let mut runners = self.runners.lock();
        match runners.entry(key) {
            Entry::Occupied(entry) => entry.get().queue().enqueue(task).map(|()| None),
            Entry::Vacant(entry) => {
                let runner = Arc::new(KeyRunner::new(entry.key().clone(), task));
                entry.insert(Arc::clone(&runner));
                Ok(Some(runner))
            }
        }
    }

    /// Remove `runner` if its queue is still empty once the registry is
    /// locked. A `false` return means a task slipped in and the chain must
    /// go on.
    pub(crate) fn retire_if_idle(&self, runner: &Arc<KeyRunner<K>>) -> bool {
        let mut runners = self.runners.lock();
        if !runner.queue().is_empty() {
            return false;
        }
        Self::remove_locked(&mut runners, runner);
        true
    }

    pub(crate) fn remove(&self, runner: &Arc<KeyRunner<K>>) {
        Self::remove_locked(&mut self.runners.lock(), runner);
    }

    fn remove_locked(runners: &mut HashMap<K, Arc<KeyRunner<K>>>, runner: &Arc<KeyRunner<K>>) {
        // A closed runner may already have been replaced by a fresh one.
        if runners
            .get(runner.key())
            .is_some_and(|current| Arc::ptr_eq(current, runner))
        {
            runners.remove(runner.key());
        }
    }
}
