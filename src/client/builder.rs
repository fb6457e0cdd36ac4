use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use super::connector::Connector;
use super::dispatch::{BinaryHandler, InvalidMessageHandler};
use super::Client;
use crate::err::*;
use crate::transport::memory::MemoryTransport;

pub const DEFAULT_URI: &str = "localhost:5000";
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Configures and connects a `Client`.
/// ```no_run
/// # use t2_rpc::prelude::*;
/// # fn main() -> RpcResult<()> {
/// let client = ClientBuilder::new("localhost:5000")
///     .connect_timeout(std::time::Duration::from_secs(1))
///     .on_invalid_message(|raw, error| eprintln!("{}: {}", error, raw))
///     .connect()?;
/// #     Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    uri: String,
    secure: bool,
    connect_timeout: Duration,
    on_invalid_message: Option<InvalidMessageHandler>,
    on_binary: Option<BinaryHandler>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_URI)
    }
}

impl ClientBuilder {
    /// `uri` is either `host:port` or a full `ws://` or `wss://` URI.
    pub fn new(uri: impl Into<String>) -> Self {
        ClientBuilder {
            uri: uri.into(),
            secure: false,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            on_invalid_message: None,
            on_binary: None,
        }
    }

    /// Use `wss` rather than `ws` if the URI has no scheme.
    pub fn secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    pub fn connect_timeout(mut self, connect_timeout: Duration) -> Self {
        self.connect_timeout = connect_timeout;
        self
    }

    /// Called on the client's worker thread with every frame that could not be used. By
    /// default these are logged.
    pub fn on_invalid_message<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &RpcError) + Send + Sync + 'static,
    {
        self.on_invalid_message = Some(Arc::new(handler));
        self
    }

    /// Called on the client's worker thread with every binary frame that does not follow a reply.
    pub fn on_binary<F>(mut self, handler: F) -> Self
    where
        F: Fn(Bytes) + Send + Sync + 'static,
    {
        self.on_binary = Some(Arc::new(handler));
        self
    }

    /// Connect over WebSocket.
    pub fn connect(self) -> RpcResult<Client> {
        let connector = Connector::new_websocket(&self.uri, self.secure)?;
        self.connect_with(connector)
    }

    /// Connect over an in-process transport. See `transport::memory::pair`.
    pub fn connect_memory(self, transport: MemoryTransport) -> RpcResult<Client> {
        self.connect_with(Connector::new_memory(transport))
    }

    pub fn connect_with(self, connector: Connector) -> RpcResult<Client> {
        Client::start(connector, self.connect_timeout, self.on_invalid_message, self.on_binary)
    }
}
