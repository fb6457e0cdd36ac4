use std::collections::VecDeque;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::err::*;
use crate::protocol::{Progress, Reply};

pub(crate) type Outcome = RpcResult<Reply>;

/// The state of one outstanding request: queued progress plus, once terminal, the
/// outcome. The first outcome set wins; once terminal nothing else is accepted.
///
/// Each task has its own monitor so that waiting on one request never contends with
/// the resolution of another.
pub(crate) struct Task {
    state: Mutex<TaskState>,
    changed: Condvar,
    expects_binary: bool,
}

struct TaskState {
    progress: VecDeque<Progress>,
    outcome: Option<Outcome>,
}

impl Task {
    pub(crate) fn new(expects_binary: bool) -> Task {
        Task {
            state: Mutex::new(TaskState {
                progress: VecDeque::new(),
                outcome: None,
            }),
            changed: Condvar::new(),
            expects_binary,
        }
    }

    fn lock(&self) -> MutexGuard<'_, TaskState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn expects_binary(&self) -> bool {
        self.expects_binary
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.lock().outcome.is_some()
    }

    /// Queue a progress update. Ignored once the task is terminal.
    pub(crate) fn add_progress(&self, progress: Progress) -> bool {
        {
            let mut state = self.lock();
            if state.outcome.is_some() {
                return false;
            }
            state.progress.push_back(progress);
        }
        self.changed.notify_all();
        true
    }

    pub(crate) fn set_result(&self, reply: Reply) -> bool {
        self.resolve(Ok(reply))
    }

    pub(crate) fn set_error(&self, error: RpcError) -> bool {
        self.resolve(Err(error))
    }

    /// Make the task terminal. Returns false, leaving the task untouched, if it already was.
    pub(crate) fn resolve(&self, outcome: Outcome) -> bool {
        {
            let mut state = self.lock();
            if state.outcome.is_some() {
                return false;
            }
            state.outcome = Some(outcome);
        }
        self.changed.notify_all();
        true
    }

    pub(crate) fn try_result(&self) -> Option<Outcome> {
        self.lock().outcome.clone()
    }

    /// Block until the task is terminal and return its outcome, dropping any progress not
    /// yet drained. On timeout the task is left as it is.
    pub(crate) fn wait(&self, timeout: Option<Duration>) -> Outcome {
        let deadline = timeout.and_then(|timeout| Instant::now().checked_add(timeout));
        let mut state = self.lock();
        loop {
            if let Some(outcome) = state.outcome.clone() {
                state.progress.clear();
                return outcome;
            }

            state = match deadline {
                None => self.changed.wait(state).unwrap_or_else(PoisonError::into_inner),
                Some(deadline) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(RpcError::Timeout(timeout.unwrap_or_default()));
                    }
                    self.changed
                        .wait_timeout(state, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0
                }
            };
        }
    }

    /// Block until a progress update is available and take it. `None` once the queue is
    /// empty and the task is terminal.
    pub(crate) fn next_progress(&self) -> Option<Progress> {
        let mut state = self.lock();
        loop {
            if let Some(progress) = state.progress.pop_front() {
                return Some(progress);
            }
            if state.outcome.is_some() {
                return None;
            }
            state = self.changed.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    pub(crate) fn progress(&self) -> ProgressIter<'_> {
        ProgressIter { task: self }
    }
}

/// Progress updates of one request in arrival order. Iteration blocks while the request is
/// outstanding and ends once it is terminal and every queued update has been taken.
pub struct ProgressIter<'a> {
    task: &'a Task,
}

impl<'a> Iterator for ProgressIter<'a> {
    type Item = Progress;

    fn next(&mut self) -> Option<Self::Item> {
        self.task.next_progress()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn progress(amount: f64) -> Progress {
        Progress {
            id: 1.into(),
            operation: "op".into(),
            amount,
        }
    }

    #[test]
    fn test_first_outcome_wins() {
        let task = Task::new(false);
        assert!(task.resolve(Ok(Reply::new(json!(1)))));
        assert!(!task.resolve(Ok(Reply::new(json!(2)))));
        assert!(!task.set_error(RpcError::ConnectionClosed));
        assert_eq!(Some(Ok(Reply::new(json!(1)))), task.try_result());
        assert_eq!(Ok(Reply::new(json!(1))), task.wait(None));
    }

    #[test]
    fn test_progress_after_outcome_is_ignored() {
        let task = Task::new(false);
        assert!(task.add_progress(progress(0.5)));
        task.set_error(RpcError::ConnectionClosed);
        assert!(!task.add_progress(progress(0.9)));

        let amounts: Vec<f64> = task.progress().map(|p| p.amount).collect();
        assert_eq!(vec![0.5], amounts);
    }

    #[test]
    fn test_progress_is_restartable() {
        let task = Task::new(false);
        task.add_progress(progress(0.1));
        task.add_progress(progress(0.2));
        task.add_progress(progress(0.3));

        assert_eq!(Some(0.1), task.progress().next().map(|p| p.amount));

        task.resolve(Ok(Reply::new(json!(null))));
        let rest: Vec<f64> = task.progress().map(|p| p.amount).collect();
        assert_eq!(vec![0.2, 0.3], rest);
        assert_eq!(0, task.progress().count());
    }

    #[test]
    fn test_wait_timeout_leaves_task_pending() {
        let task = Task::new(false);
        let timeout = Duration::from_millis(20);
        assert_eq!(Err(RpcError::Timeout(timeout)), task.wait(Some(timeout)));
        assert!(!task.is_ready());

        task.resolve(Ok(Reply::new(json!("late"))));
        assert_eq!(Ok(Reply::new(json!("late"))), task.wait(Some(timeout)));
    }

    #[test]
    fn test_wait_clears_undrained_progress() {
        let task = Task::new(false);
        task.add_progress(progress(0.1));
        task.resolve(Ok(Reply::new(json!(null))));
        task.wait(None).unwrap();
        assert_eq!(None, task.progress().next());
    }

    #[test]
    fn test_waiters_are_woken_by_other_thread() {
        let task = Arc::new(Task::new(false));

        let waiters: Vec<_> = (0..4)
            .map(|_| {
                let task = task.clone();
                std::thread::spawn(move || task.wait(None))
            })
            .collect();

        let drainer = {
            let task = task.clone();
            std::thread::spawn(move || task.progress().map(|p| p.amount).collect::<Vec<_>>())
        };

        std::thread::sleep(Duration::from_millis(20));
        task.add_progress(progress(0.3));
        task.add_progress(progress(0.7));
        task.resolve(Ok(Reply::new(json!({"done": true}))));

        for waiter in waiters {
            assert_eq!(Ok(Reply::new(json!({"done": true}))), waiter.join().unwrap());
        }
        let drained = drainer.join().unwrap();
        // waiters drop whatever the drainer has not taken yet
        assert!([0.3, 0.7].starts_with(&drained));
    }
}
