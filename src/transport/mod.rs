use bytes::Bytes;

use crate::err::*;

pub mod memory;
pub mod ws;

/// A single WebSocket message as seen by the client. The transport does not look inside.
#[derive(Clone, PartialEq, Debug)]
pub enum Frame {
    Text(String),
    Binary(Bytes),
}

/// A full-duplex connection carrying frames. The stream ends when the peer closes the connection.
pub trait Transport:
    'static
    + futures::Stream<Item = RpcResult<Frame>>
    + futures::Sink<Frame, Error = RpcError>
    + Send
    + Unpin
{
}

impl<T> Transport for T where
    T: 'static
        + futures::Stream<Item = RpcResult<Frame>>
        + futures::Sink<Frame, Error = RpcError>
        + Send
        + Unpin
{
}
