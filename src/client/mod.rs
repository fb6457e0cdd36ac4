mod core;
pub mod builder;
pub mod connector;
pub mod dispatch;
pub mod handle;
mod registry;
mod task;

pub(crate) use self::core::Command;
use self::dispatch::*;
use self::handle::Handle;
use self::registry::PendingRegistry;
use self::connector::Connector;
use self::builder::ClientBuilder;
pub use self::task::ProgressIter;
use crate::err::*;
use crate::protocol::*;
use crate::stopper::Stopper;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;

/// A JSON-RPC client. Provides a blocking API for making any number of concurrent requests
/// over one connection. Share it between threads by reference or in an `Arc`.
///
/// The connection is served by a background worker thread owned by the client. It is
/// stopped when the client is closed or dropped.
pub struct Client {
    command_sender: UnboundedSender<Command>,
    registry: Arc<PendingRegistry>,
    stopper: Mutex<Option<Stopper>>,
}

impl Client {
    pub(crate) fn start(
        connector: Connector,
        connect_timeout: Duration,
        on_invalid_message: Option<InvalidMessageHandler>,
        on_binary: Option<BinaryHandler>,
    ) -> RpcResult<Client> {
        let registry = Arc::new(PendingRegistry::new());
        let dispatcher = Dispatcher::new(registry.clone(), on_invalid_message, on_binary);
        let (command_sender, command_receiver) = tokio::sync::mpsc::unbounded_channel();

        let join_handle =
            self::core::start(connector, connect_timeout, dispatcher, command_receiver)?;
        let stopper = Stopper::new(command_sender.clone(), join_handle);

        Ok(Client {
            command_sender,
            registry,
            stopper: Mutex::new(Some(stopper)),
        })
    }

    /// Connect to the server at `uri` with the default settings. See `ClientBuilder` for more
    /// options.
    pub fn connect(uri: &str) -> RpcResult<Client> {
        ClientBuilder::new(uri).connect()
    }

    pub fn builder(uri: &str) -> ClientBuilder {
        ClientBuilder::new(uri)
    }

    /// Send a request for `method` with the given params. Use the returned `Handle` to follow
    /// progress and get the result. `null` params are omitted.
    pub fn call(&self, method: &str, params: Value) -> RpcResult<Handle> {
        self.send(Request::new(method).with_params(params))
    }

    /// Send the given request. If it has no id one is generated.
    ///
    /// Errors with `RpcError::DuplicateId` if the request carries an id that is still in use.
    pub fn send(&self, request: Request) -> RpcResult<Handle> {
        let (id, task) = match &request.id {
            Some(id) => (id.clone(), self.registry.add(id.clone(), request.expects_binary)?),
            None => self.registry.register(request.expects_binary)?,
        };
        let handle = Handle::new(id, request.method.clone(), task, self.registry.clone());

        let frames = request.to_frames(Some(handle.id()))?;
        self.command_sender.send(Command::Send(frames))?;

        Ok(handle)
    }

    /// Send a notification: a request without id. There will be no reply.
    pub fn notify(&self, method: &str, params: Value) -> RpcResult<()> {
        self.send_notification(Request::new(method).with_params(params))
    }

    /// Send the given request as a notification. Its id, if any, is ignored.
    pub fn send_notification(&self, request: Request) -> RpcResult<()> {
        if self.registry.is_closed() {
            return Err(RpcError::ConnectionClosed);
        }
        let frames = request.to_frames(None)?;
        self.command_sender.send(Command::Send(frames))?;
        Ok(())
    }

    /// Block until the request has a result or an error, at most `timeout` if given. The
    /// request's id becomes available for reuse.
    ///
    /// On `RpcError::Timeout` the request stays outstanding: a later reply still completes it.
    pub fn result_of(&self, handle: &Handle, timeout: Option<Duration>) -> RpcResult<Reply> {
        handle.wait(timeout)
    }

    /// Ask the server to cancel the request. This is only a hint: the server may still reply
    /// normally, with an error, or not at all. Does nothing if the request is not outstanding.
    pub fn cancel(&self, handle: &Handle) -> RpcResult<()> {
        if handle.is_ready() {
            return Ok(());
        }
        debug!("Cancelling request {} ({})", handle.id(), handle.method());
        self.send_notification(Request::cancel(handle.id()))
    }

    /// Make a request and wait for its result.
    pub fn request(
        &self,
        method: &str,
        params: Value,
        timeout: Option<Duration>,
    ) -> RpcResult<Value> {
        let handle = self.call(method, params)?;
        let reply = handle.wait(timeout)?;
        Ok(reply.result)
    }

    /// Make a request with serializable params and deserialize its result.
    pub fn request_as<TParams, TResult>(
        &self,
        method: &str,
        params: &TParams,
        timeout: Option<Duration>,
    ) -> RpcResult<TResult>
    where
        TParams: Serialize,
        TResult: DeserializeOwned,
    {
        let params = serde_json::to_value(params)?;
        let handle = self.call(method, params)?;
        handle.wait(timeout)?.result_as()
    }

    /// The number of requests registered and not yet released.
    pub fn pending_count(&self) -> usize {
        self.registry.len()
    }

    /// False once the connection is closed, by either side.
    pub fn is_open(&self) -> bool {
        !self.registry.is_closed()
    }

    /// Close the connection and stop the worker. Every outstanding request fails with
    /// `RpcError::ConnectionClosed` before this returns.
    pub fn close(&self) -> RpcResult<()> {
        let stopper = self
            .stopper
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let result = match stopper {
            Some(stopper) => stopper.stop(),
            None => Ok(()),
        };
        self.registry.drain_all(RpcError::ConnectionClosed);
        result
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        let _ = self.close();
    }
}
