use std::thread::JoinHandle;

use tokio::sync::mpsc::UnboundedSender;

use crate::client::Command;
use crate::err::{RpcError, RpcResult};

/// A way to stop the background worker of a client and to wait for it to stop.
pub(crate) struct Stopper {
    command_sender: UnboundedSender<Command>,
    join_handle: JoinHandle<RpcResult<()>>,
}

impl Stopper {
    pub(crate) fn new(
        command_sender: UnboundedSender<Command>,
        join_handle: JoinHandle<RpcResult<()>>,
    ) -> Self {
        Self { command_sender, join_handle }
    }

    /// Send a stop signal to the worker and then wait for it to terminate
    pub(crate) fn stop(self) -> RpcResult<()> {
        // ignore error if the worker already stopped
        let _ = self.command_sender.send(Command::Stop);
        self.join()
    }

    /// Wait for the worker to terminate without sending a stop signal
    pub(crate) fn join(self) -> RpcResult<()> {
        if self.join_handle.thread().id() == std::thread::current().id() {
            // called from a handler running on the worker itself
            return Ok(());
        }
        self.join_handle
            .join()
            .map_err(|_| RpcError::InternalError("client worker panicked".into()))?
    }
}
