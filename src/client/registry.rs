use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::task::{Outcome, Task};
use crate::err::*;
use crate::id::IdGenerator;
use crate::protocol::{Progress, RequestId};

/// The `PendingRegistry` owns the tasks of all outstanding requests, keyed by request id,
/// together with the generator their ids come from. Both live under one lock so an id can
/// never be generated while it is still registered.
///
/// Tasks are only ever mutated after the registry lock has been released.
pub(crate) struct PendingRegistry {
    state: Mutex<RegistryState>,
}

struct RegistryState {
    tasks: HashMap<RequestId, Arc<Task>>,
    ids: IdGenerator,
    closed: bool,
}

impl PendingRegistry {
    pub(crate) fn new() -> PendingRegistry {
        PendingRegistry {
            state: Mutex::new(RegistryState {
                tasks: HashMap::new(),
                ids: IdGenerator::new(),
                closed: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a new task under a freshly generated id.
    pub(crate) fn register(&self, expects_binary: bool) -> RpcResult<(RequestId, Arc<Task>)> {
        let mut state = self.lock();
        if state.closed {
            return Err(RpcError::ConnectionClosed);
        }

        // generated ids may collide with ids chosen by the caller
        let id = loop {
            let id = state.ids.generate();
            if !state.tasks.contains_key(&id) {
                break id;
            }
        };

        let task = Arc::new(Task::new(expects_binary));
        state.tasks.insert(id.clone(), task.clone());
        Ok((id, task))
    }

    /// Register a new task under the given id. Errors if the id is already in use.
    pub(crate) fn add(&self, id: RequestId, expects_binary: bool) -> RpcResult<Arc<Task>> {
        let mut state = self.lock();
        if state.closed {
            return Err(RpcError::ConnectionClosed);
        }
        if state.tasks.contains_key(&id) {
            return Err(RpcError::DuplicateId(id));
        }

        let task = Arc::new(Task::new(expects_binary));
        state.tasks.insert(id, task.clone());
        Ok(task)
    }

    pub(crate) fn get(&self, id: &RequestId) -> Option<Arc<Task>> {
        self.lock().tasks.get(id).cloned()
    }

    /// Make the task registered under `id` terminal. Unknown ids are ignored, they belong to
    /// requests that were already released, retired or never made.
    pub(crate) fn resolve(&self, id: &RequestId, outcome: Outcome) -> bool {
        match self.get(id) {
            Some(task) => {
                let resolved = match outcome {
                    Ok(reply) => task.set_result(reply),
                    Err(error) => task.set_error(error),
                };
                if !resolved {
                    debug!("Ignoring duplicate outcome for request {}", id);
                }
                resolved
            }
            None => {
                debug!("Ignoring outcome for unknown request {}", id);
                false
            }
        }
    }

    pub(crate) fn progress(&self, progress: Progress) -> bool {
        match self.get(&progress.id) {
            Some(task) => task.add_progress(progress),
            None => {
                debug!("Ignoring progress for unknown request {}", &progress.id);
                false
            }
        }
    }

    /// Remove the entry for a request whose outcome has been consumed and recycle its id.
    /// Does nothing unless `id` still maps to `task`.
    pub(crate) fn release(&self, id: &RequestId, task: &Arc<Task>) -> bool {
        self.remove(id, task, true)
    }

    /// Remove the entry for a request nobody waits for any more without recycling its id,
    /// so a late reply can not be mistaken for the reply to a newer request.
    pub(crate) fn retire(&self, id: &RequestId, task: &Arc<Task>) -> bool {
        self.remove(id, task, false)
    }

    /// Remove the entry for `id` if it still maps to `task`, optionally recycling the id.
    pub(crate) fn remove(&self, id: &RequestId, task: &Arc<Task>, recycle: bool) -> bool {
        let mut state = self.lock();
        match state.tasks.get(id) {
            Some(registered) if Arc::ptr_eq(registered, task) => {
                state.tasks.remove(id);
                if recycle {
                    state.ids.recycle(id);
                }
                true
            }
            _ => false,
        }
    }

    /// Fail every registered task with `error` and refuse new registrations. Returns the
    /// number of tasks failed.
    pub(crate) fn drain_all(&self, error: RpcError) -> usize {
        let tasks: Vec<Arc<Task>> = {
            let mut state = self.lock();
            state.closed = true;
            state.tasks.drain().map(|(_, task)| task).collect()
        };

        for task in tasks.iter() {
            task.set_error(error.clone());
        }

        tasks.len()
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().tasks.len()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::Reply;
    use serde_json::json;
    use std::collections::HashSet;

    #[test]
    fn test_add_duplicate_id() {
        let registry = PendingRegistry::new();
        registry.add("a".into(), false).unwrap();
        assert_eq!(
            Err(RpcError::DuplicateId("a".into())),
            registry.add("a".into(), false).map(|_| ())
        );
    }

    #[test]
    fn test_register_skips_ids_in_use() {
        let registry = PendingRegistry::new();
        registry.add(RequestId::Int(0), false).unwrap();
        registry.add(RequestId::Int(1), false).unwrap();
        let (id, _) = registry.register(false).unwrap();
        assert_eq!(RequestId::Int(2), id);
    }

    #[test]
    fn test_resolve_unknown_id_is_ignored() {
        let registry = PendingRegistry::new();
        assert!(!registry.resolve(&RequestId::Int(9), Ok(Reply::new(json!(1)))));
        assert!(!registry.progress(Progress { id: 9.into(), operation: "x".into(), amount: 0.1 }));
        assert_eq!(0, registry.len());
    }

    #[test]
    fn test_release_recycles_and_retire_does_not() {
        let registry = PendingRegistry::new();
        let (a, task_a) = registry.register(false).unwrap();
        let (b, task_b) = registry.register(false).unwrap();

        // a stale task for the same id is not removed
        let stale = Arc::new(Task::new(false));
        assert!(!registry.release(&a, &stale));
        assert_eq!(2, registry.len());

        assert!(registry.retire(&b, &task_b));
        assert!(registry.release(&a, &task_a));
        assert_eq!(0, registry.len());

        let (next, _) = registry.register(false).unwrap();
        assert_eq!(a, next);
        let (next, _) = registry.register(false).unwrap();
        assert_eq!(RequestId::Int(2), next);
    }

    #[test]
    fn test_drain_all() {
        let registry = PendingRegistry::new();
        let tasks: Vec<_> = (0..3).map(|_| registry.register(false).unwrap().1).collect();

        assert_eq!(3, registry.drain_all(RpcError::ConnectionClosed));
        for task in tasks {
            assert_eq!(Some(Err(RpcError::ConnectionClosed)), task.try_result());
        }
        assert!(registry.is_closed());
        assert_eq!(0, registry.drain_all(RpcError::ConnectionClosed));
        assert_eq!(Err(RpcError::ConnectionClosed), registry.register(false).map(|_| ()));
    }

    #[test]
    fn test_generated_ids_never_alias_live_ids() {
        let registry = Arc::new(PendingRegistry::new());
        let live = Arc::new(Mutex::new(HashSet::new()));

        let threads: Vec<_> = (0..8)
            .map(|thread| {
                let registry = registry.clone();
                let live = live.clone();
                std::thread::spawn(move || {
                    let mut mine = Vec::new();
                    for i in 0..500 {
                        let (id, task) = registry.register(false).unwrap();
                        let fresh = live.lock().unwrap().insert(id.clone());
                        assert!(fresh, "id {} handed out twice", id);
                        mine.push((id, task));

                        if (i + thread) % 3 != 0 {
                            let (id, task) = mine.swap_remove((i * 7) % mine.len());
                            // remove from the live set before the id can be generated again
                            live.lock().unwrap().remove(&id);
                            if i % 5 == 0 {
                                registry.retire(&id, &task);
                            } else {
                                registry.release(&id, &task);
                            }
                        }
                    }
                })
            })
            .collect();

        for thread in threads {
            thread.join().unwrap();
        }
    }
}
