use url::Url;

use crate::err::RpcResult;
use crate::transport::memory::MemoryTransport;
use crate::transport::{ws, Transport};

/// Where a client gets its connection from.
pub enum Connector {
    WebSocket(Url),
    Memory(MemoryTransport),
}

impl Connector {
    pub(crate) async fn connect(self) -> RpcResult<Box<dyn Transport>> {
        match self {
            Connector::WebSocket(url) => {
                debug!("Connecting to {}", url);
                Ok(Box::new(ws::connect(&url).await?))
            }
            Connector::Memory(transport) => Ok(Box::new(transport)),
        }
    }

    pub fn new_websocket(uri: &str, secure: bool) -> RpcResult<Self> {
        Ok(Self::WebSocket(ws::parse_uri(uri, secure)?))
    }

    pub fn new_memory(transport: MemoryTransport) -> Self {
        Self::Memory(transport)
    }
}
