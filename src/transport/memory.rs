use bytes::Bytes;
use futures::{Sink, Stream};
use serde_json::Value;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use super::Frame;
use crate::err::*;

/// The client side of an in-process connection. See `pair`.
pub struct MemoryTransport {
    sender: UnboundedSender<Frame>,
    receiver: UnboundedReceiver<Frame>,
}

/// The server side of an in-process connection. Dropping it closes the connection.
pub struct MemoryPeer {
    sender: UnboundedSender<Frame>,
    receiver: UnboundedReceiver<Frame>,
}

/// Create a connected transport and peer.
pub fn pair() -> (MemoryTransport, MemoryPeer) {
    let (client_sender, peer_receiver) = tokio::sync::mpsc::unbounded_channel();
    let (peer_sender, client_receiver) = tokio::sync::mpsc::unbounded_channel();

    let transport = MemoryTransport {
        sender: client_sender,
        receiver: client_receiver,
    };

    let peer = MemoryPeer {
        sender: peer_sender,
        receiver: peer_receiver,
    };

    (transport, peer)
}

impl MemoryPeer {
    pub fn send(&self, frame: Frame) -> RpcResult<()> {
        self.sender.send(frame)?;
        Ok(())
    }

    pub fn send_text(&self, text: impl Into<String>) -> RpcResult<()> {
        self.send(Frame::Text(text.into()))
    }

    pub fn send_json(&self, value: &Value) -> RpcResult<()> {
        self.send_text(serde_json::to_string(value)?)
    }

    pub fn send_binary(&self, data: impl Into<Bytes>) -> RpcResult<()> {
        self.send(Frame::Binary(data.into()))
    }

    /// Receive the next frame sent by the client. `None` once the client has closed.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.receiver.recv().await
    }

    /// Blocking `recv`. Must not be called from within an async context.
    pub fn recv_blocking(&mut self) -> Option<Frame> {
        self.receiver.blocking_recv()
    }

    /// Blocking receive of the next frame, parsed as JSON.
    pub fn recv_json_blocking(&mut self) -> RpcResult<Value> {
        match self.recv_blocking() {
            Some(Frame::Text(text)) => Ok(serde_json::from_str(&text)?),
            Some(Frame::Binary(data)) => Err(RpcError::MalformedMessage(format!(
                "expected a text frame, got {} bytes of binary",
                data.len()
            ))),
            None => Err(RpcError::ConnectionClosed),
        }
    }
}

impl Stream for MemoryTransport {
    type Item = RpcResult<Frame>;

    fn poll_next(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx).map(|frame| frame.map(Ok))
    }
}

impl Sink<Frame> for MemoryTransport {
    type Error = RpcError;

    fn poll_ready(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn start_send(self: std::pin::Pin<&mut Self>, item: Frame) -> Result<(), Self::Error> {
        self.sender.send(item)?;
        Ok(())
    }

    fn poll_flush(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }

    fn poll_close(
        self: std::pin::Pin<&mut Self>,
        _cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        std::task::Poll::Ready(Ok(()))
    }
}
