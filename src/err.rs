use std::time::Duration;
use thiserror::Error;

use crate::protocol::{ErrorDetails, RequestId};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RpcError{
    #[error("Connection closed")]
    ConnectionClosed,
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    #[error("Request failed: Timeout after {0:?}")]
    Timeout(Duration),
    #[error("Request failed: {0}")]
    Server(ErrorDetails),

    #[error("Request ID {0} is already in use")]
    DuplicateId(RequestId),

    #[error("Malformed message: {0}")]
    MalformedMessage(String),
    #[error("Serialize message failed: {0}")]
    UnserializableMessage(String),
    #[error("Unexpected result: {0}")]
    UnexpectedResult(String),

    #[error("WebSocket error: {0}")]
    WebSocket(String),
    #[error("IO error: {0}")]
    IOError(String),
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl RpcError {
    /// The JSON-RPC error code if this error was reported by the server.
    pub fn code(&self) -> Option<i64> {
        match self {
            RpcError::Server(details) => Some(details.code),
            _ => None,
        }
    }
}

impl From<ErrorDetails> for RpcError {
    fn from(details: ErrorDetails) -> Self {
        RpcError::Server(details)
    }
}

impl From<std::io::Error> for RpcError {
    fn from(error: std::io::Error) -> Self {
        RpcError::IOError(error.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for RpcError {
    fn from(_error: tokio::sync::mpsc::error::SendError<T>) -> Self {
        RpcError::ConnectionClosed
    }
}

impl From<serde_json::error::Error> for RpcError {
    fn from(error: serde_json::error::Error) -> Self {
        RpcError::UnserializableMessage(error.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for RpcError {
    fn from(error: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error;
        match error {
            Error::ConnectionClosed | Error::AlreadyClosed => RpcError::ConnectionClosed,
            Error::Io(e) => RpcError::IOError(e.to_string()),
            Error::Url(e) => RpcError::InvalidUri(e.to_string()),
            e => RpcError::WebSocket(e.to_string()),
        }
    }
}

impl From<url::ParseError> for RpcError {
    fn from(error: url::ParseError) -> Self {
        RpcError::InvalidUri(error.to_string())
    }
}

pub type RpcResult<T> = Result<T, RpcError>;
