use crate::err::{RpcError, RpcResult};
use crate::transport::Frame;
use bytes::Bytes;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

pub const JSONRPC_VERSION: &str = "2.0";
pub const CANCEL_METHOD: &str = "cancel";

/// Correlation identifier of a request. Unique among the requests currently outstanding
/// on one connection only.
#[derive(Clone, Deserialize, Serialize, PartialEq, Eq, Hash, Debug)]
#[serde(untagged)]
pub enum RequestId {
    Int(i64),
    Str(String),
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RequestId::Int(id) => write!(f, "{}", id),
            RequestId::Str(id) => write!(f, "\"{}\"", id),
        }
    }
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        RequestId::Int(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        RequestId::Str(id.to_string())
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        RequestId::Str(id)
    }
}

/// An outgoing call. The binary payload, if not empty, is sent as a binary frame
/// directly after the JSON text frame.
#[derive(Clone, PartialEq, Debug)]
pub struct Request {
    pub id: Option<RequestId>,
    pub method: String,
    pub params: Option<Value>,
    pub binary: Bytes,
    /// The server answers this request with a binary frame right after the reply.
    pub expects_binary: bool,
}

impl Request {
    pub fn new(method: impl Into<String>) -> Request {
        Request {
            id: None,
            method: method.into(),
            params: None,
            binary: Bytes::new(),
            expects_binary: false,
        }
    }

    /// The advisory cancel request for the request with the given `id`.
    pub fn cancel(id: &RequestId) -> Request {
        Request::new(CANCEL_METHOD).with_params(serde_json::json!({ "id": id }))
    }

    pub fn with_id(mut self, id: impl Into<RequestId>) -> Request {
        self.id = Some(id.into());
        self
    }

    /// `null` params are left out of the message.
    pub fn with_params(mut self, params: Value) -> Request {
        self.params = match params {
            Value::Null => None,
            params => Some(params),
        };
        self
    }

    pub fn with_binary(mut self, binary: impl Into<Bytes>) -> Request {
        self.binary = binary.into();
        self
    }

    pub fn expecting_binary(mut self) -> Request {
        self.expects_binary = true;
        self
    }

    /// Encode as wire frames. `id` overrides the id stored in the request, `None` encodes a
    /// notification.
    pub(crate) fn to_frames(&self, id: Option<&RequestId>) -> RpcResult<Vec<Frame>> {
        let msg = RequestMsg {
            jsonrpc: JSONRPC_VERSION,
            id,
            method: &self.method,
            params: self.params.as_ref(),
        };
        let mut frames = vec![Frame::Text(serde_json::to_string(&msg)?)];
        if !self.binary.is_empty() {
            frames.push(Frame::Binary(self.binary.clone()));
        }
        Ok(frames)
    }
}

#[derive(Serialize)]
struct RequestMsg<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<&'a RequestId>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<&'a Value>,
}

/// The successful outcome of a request.
#[derive(Clone, PartialEq, Debug)]
pub struct Reply {
    pub result: Value,
    /// Binary frame that followed the reply. Empty unless the request expected one.
    pub binary: Bytes,
}

impl Reply {
    pub fn new(result: Value) -> Reply {
        Reply {
            result,
            binary: Bytes::new(),
        }
    }

    pub fn with_binary(mut self, binary: Bytes) -> Reply {
        self.binary = binary;
        self
    }

    /// Deserialize the result into `T`.
    pub fn result_as<T: DeserializeOwned>(&self) -> RpcResult<T> {
        T::deserialize(&self.result).map_err(|e| RpcError::UnexpectedResult(e.to_string()))
    }
}

/// The `error` object of an error reply.
#[derive(Clone, Deserialize, Serialize, PartialEq, Debug)]
pub struct ErrorDetails {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} (code {})", self.message, self.code)?;
        if let Some(data) = &self.data {
            write!(f, ": {}", data)?;
        }
        Ok(())
    }
}

/// An intermediate status update of a pending request.
#[derive(Clone, Deserialize, Serialize, PartialEq, Debug)]
pub struct Progress {
    pub id: RequestId,
    pub operation: String,
    pub amount: f64,
}

/// An inbound text message, classified by shape.
#[derive(Clone, PartialEq, Debug)]
pub enum Message {
    Reply { id: RequestId, result: Value },
    Error { id: Option<RequestId>, error: ErrorDetails },
    Progress(Progress),
}

impl Message {
    /// Classify a text frame. Unknown fields are ignored.
    ///
    /// - contains `error`: an error reply
    /// - contains `result`: a reply
    /// - neither, and no `id`: a progress notification
    /// - anything else is malformed
    pub fn parse(text: &str) -> RpcResult<Message> {
        let value: Value = serde_json::from_str(text).map_err(|e| malformed(e))?;
        let mut obj = match value {
            Value::Object(obj) => obj,
            _ => return Err(malformed("message is not a JSON object")),
        };

        if let Some(error) = obj.remove("error") {
            let error = ErrorDetails::deserialize(error)
                .map_err(|e| malformed(format!("invalid error: {}", e)))?;
            let id = parse_id(obj.remove("id"))?;
            return Ok(Message::Error { id, error });
        }

        if let Some(result) = obj.remove("result") {
            let id = parse_id(obj.remove("id"))?.ok_or_else(|| malformed("reply without id"))?;
            return Ok(Message::Reply { id, result });
        }

        if parse_id(obj.remove("id"))?.is_some() {
            return Err(malformed("message with id has neither result nor error"));
        }

        parse_progress(obj)
    }
}

fn parse_progress(mut obj: Map<String, Value>) -> RpcResult<Message> {
    let params = obj
        .remove("params")
        .ok_or_else(|| malformed("notification without params"))?;
    let progress = Progress::deserialize(params)
        .map_err(|e| malformed(format!("invalid progress: {}", e)))?;
    Ok(Message::Progress(progress))
}

fn parse_id(id: Option<Value>) -> RpcResult<Option<RequestId>> {
    match id {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(id)) => Ok(Some(RequestId::Str(id))),
        Some(Value::Number(id)) => id
            .as_i64()
            .map(|id| Some(RequestId::Int(id)))
            .ok_or_else(|| malformed(format!("id {} is not an integer", id))),
        Some(id) => Err(malformed(format!("invalid id {}", id))),
    }
}

fn malformed(reason: impl fmt::Display) -> RpcError {
    RpcError::MalformedMessage(reason.to_string())
}
