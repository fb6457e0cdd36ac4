use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::registry::PendingRegistry;
use super::task::{ProgressIter, Task};
use crate::err::*;
use crate::protocol::{Reply, RequestId};

/// An outstanding request. Drop the `Handle` once you are no longer interested in the outcome.
///
/// Dropping a handle whose request is still outstanding retires its id for the lifetime of
/// the connection, so that a late reply is never mistaken for the reply to another request.
pub struct Handle {
    id: RequestId,
    method: String,
    task: Arc<Task>,
    registry: Arc<PendingRegistry>,
}

impl Handle {
    pub(crate) fn new(
        id: RequestId,
        method: String,
        task: Arc<Task>,
        registry: Arc<PendingRegistry>,
    ) -> Handle {
        Handle {
            id,
            method,
            task,
            registry,
        }
    }

    pub fn id(&self) -> &RequestId {
        &self.id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// True once the request has a result or an error.
    pub fn is_ready(&self) -> bool {
        self.task.is_ready()
    }

    /// The outcome if the request is no longer outstanding, without blocking.
    pub fn try_result(&self) -> Option<RpcResult<Reply>> {
        let outcome = self.task.try_result()?;
        self.registry.release(&self.id, &self.task);
        Some(outcome)
    }

    /// The progress updates received for this request, in order. Iterating blocks until the
    /// next update arrives and ends once the request is no longer outstanding.
    pub fn progress(&self) -> ProgressIter<'_> {
        self.task.progress()
    }

    /// Block until the request has a result or an error, at most `timeout` if given.
    /// Progress updates not taken yet are dropped.
    ///
    /// On `RpcError::Timeout` the request stays outstanding and `wait` may be called again.
    pub fn wait(&self, timeout: Option<Duration>) -> RpcResult<Reply> {
        let outcome = self.task.wait(timeout);
        if self.task.is_ready() {
            self.registry.release(&self.id, &self.task);
        }
        outcome
    }
}

impl fmt::Debug for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("id", &self.id)
            .field("method", &self.method)
            .field("ready", &self.is_ready())
            .finish()
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if self.task.is_ready() {
            self.registry.release(&self.id, &self.task);
        } else {
            self.registry.retire(&self.id, &self.task);
        }
    }
}
