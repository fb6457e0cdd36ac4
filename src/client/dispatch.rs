use std::sync::Arc;

use bytes::Bytes;
use serde_json::Value;

use super::registry::PendingRegistry;
use crate::debug::frame_to_string;
use crate::err::*;
use crate::protocol::{Message, Reply, RequestId};
use crate::transport::Frame;

/// Receives the raw content of every frame that could not be used, with the reason.
pub type InvalidMessageHandler = Arc<dyn Fn(&str, &RpcError) + Send + Sync>;

/// Receives binary frames that do not belong to any reply.
pub type BinaryHandler = Arc<dyn Fn(Bytes) + Send + Sync>;

/// Routes inbound frames into the registry. Never fails: anything it can not use is
/// reported to the invalid message handler and otherwise ignored.
pub(crate) struct Dispatcher {
    registry: Arc<PendingRegistry>,
    // a reply whose binary frame has not arrived yet. `None` result: the reply matched no
    // outstanding request and its binary frame, if any, is dropped
    awaiting_binary: Option<(RequestId, Option<Value>)>,
    on_invalid_message: Option<InvalidMessageHandler>,
    on_binary: Option<BinaryHandler>,
}

impl Dispatcher {
    pub(crate) fn new(
        registry: Arc<PendingRegistry>,
        on_invalid_message: Option<InvalidMessageHandler>,
        on_binary: Option<BinaryHandler>,
    ) -> Dispatcher {
        Dispatcher {
            registry,
            awaiting_binary: None,
            on_invalid_message,
            on_binary,
        }
    }

    pub(crate) fn dispatch(&mut self, frame: Frame) {
        match frame {
            Frame::Text(text) => self.dispatch_text(&text),
            Frame::Binary(data) => self.dispatch_binary(data),
        }
    }

    fn dispatch_text(&mut self, text: &str) {
        self.flush_awaiting_binary();

        let msg = match Message::parse(text) {
            Ok(msg) => msg,
            Err(e) => return self.invalid(text, &e),
        };

        match msg {
            Message::Reply { id, result } => match self.registry.get(&id) {
                Some(task) if !task.is_ready() => {
                    if task.expects_binary() {
                        self.awaiting_binary = Some((id, Some(result)));
                    } else {
                        self.registry.resolve(&id, Ok(Reply::new(result)));
                    }
                }
                _ => {
                    debug!("Ignoring reply for unknown or completed request {}", id);
                    self.awaiting_binary = Some((id, None));
                }
            },
            Message::Error { id: Some(id), error } => {
                self.registry.resolve(&id, Err(RpcError::Server(error)));
            }
            Message::Error { id: None, error } => {
                self.invalid(text, &RpcError::Server(error));
            }
            Message::Progress(progress) => {
                self.registry.progress(progress);
            }
        }
    }

    fn dispatch_binary(&mut self, data: Bytes) {
        match self.awaiting_binary.take() {
            Some((id, Some(result))) => {
                self.registry.resolve(&id, Ok(Reply::new(result).with_binary(data)));
                return;
            }
            Some((id, None)) => {
                debug!("Ignoring {} byte binary payload of reply to request {}", data.len(), id);
                return;
            }
            None => {}
        }

        match &self.on_binary {
            Some(on_binary) => on_binary(data),
            None => self.invalid(
                &frame_to_string(&Frame::Binary(data)),
                &RpcError::MalformedMessage("binary frame without a reply awaiting it".into()),
            ),
        }
    }

    /// Resolve a held reply without its binary payload.
    fn flush_awaiting_binary(&mut self) {
        if let Some((id, Some(result))) = self.awaiting_binary.take() {
            warn!("Reply to request {} was not followed by its binary payload", id);
            self.registry.resolve(&id, Ok(Reply::new(result)));
        }
    }

    /// The connection is gone. Fail everything still outstanding.
    pub(crate) fn finish(&mut self) {
        self.flush_awaiting_binary();
        let failed = self.registry.drain_all(RpcError::ConnectionClosed);
        if failed > 0 {
            debug!("Connection closed with {} requests outstanding", failed);
        }
    }

    fn invalid(&self, raw: &str, error: &RpcError) {
        match &self.on_invalid_message {
            Some(on_invalid_message) => on_invalid_message(raw, error),
            None => warn!("Ignoring invalid message: {}: {}", error, raw),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn setup() -> (Dispatcher, Arc<PendingRegistry>, Arc<Mutex<Vec<String>>>) {
        let registry = Arc::new(PendingRegistry::new());
        let invalid = Arc::new(Mutex::new(Vec::new()));
        let on_invalid: InvalidMessageHandler = {
            let invalid = invalid.clone();
            Arc::new(move |raw: &str, _: &RpcError| invalid.lock().unwrap().push(raw.to_string()))
        };
        let dispatcher = Dispatcher::new(registry.clone(), Some(on_invalid), None);
        (dispatcher, registry, invalid)
    }

    fn text(value: Value) -> Frame {
        Frame::Text(value.to_string())
    }

    #[test]
    fn test_binary_tail_is_attached_to_reply() {
        let (mut dispatcher, registry, invalid) = setup();
        let (id, task) = registry.register(true).unwrap();

        dispatcher.dispatch(text(json!({"jsonrpc": "2.0", "id": id, "result": {"w": 2}})));
        assert!(!task.is_ready());

        dispatcher.dispatch(Frame::Binary(Bytes::from_static(b"png")));
        let reply = task.try_result().unwrap().unwrap();
        assert_eq!(json!({"w": 2}), reply.result);
        assert_eq!(Bytes::from_static(b"png"), reply.binary);
        assert!(invalid.lock().unwrap().is_empty());
    }

    #[test]
    fn test_missing_binary_tail_is_flushed_by_next_text() {
        let (mut dispatcher, registry, _) = setup();
        let (a, task_a) = registry.register(true).unwrap();
        let (b, task_b) = registry.register(false).unwrap();

        dispatcher.dispatch(text(json!({"id": a, "result": 1})));
        dispatcher.dispatch(text(json!({"id": b, "result": 2})));

        assert_eq!(Some(Ok(Reply::new(json!(1)))), task_a.try_result());
        assert_eq!(Some(Ok(Reply::new(json!(2)))), task_b.try_result());
    }

    #[test]
    fn test_orphan_binary_is_reported() {
        let (mut dispatcher, _, invalid) = setup();
        dispatcher.dispatch(Frame::Binary(Bytes::from_static(&[1, 2])));
        assert_eq!(vec!["BINARY 0102 (2 bytes)".to_string()], *invalid.lock().unwrap());
    }

    #[test]
    fn test_orphan_binary_goes_to_binary_handler() {
        let registry = Arc::new(PendingRegistry::new());
        let received = Arc::new(Mutex::new(Vec::new()));
        let on_binary: BinaryHandler = {
            let received = received.clone();
            Arc::new(move |data: Bytes| received.lock().unwrap().push(data))
        };
        let mut dispatcher = Dispatcher::new(registry, None, Some(on_binary));

        dispatcher.dispatch(Frame::Binary(Bytes::from_static(b"x")));
        assert_eq!(vec![Bytes::from_static(b"x")], *received.lock().unwrap());
    }

    #[test]
    fn test_binary_tail_of_unmatched_reply_is_dropped() {
        let (mut dispatcher, registry, invalid) = setup();
        let (id, task) = registry.register(true).unwrap();

        // unknown id
        dispatcher.dispatch(text(json!({"id": 41, "result": "late"})));
        dispatcher.dispatch(Frame::Binary(Bytes::from_static(b"late")));

        // completed request
        dispatcher.dispatch(text(json!({"id": id, "result": 1})));
        dispatcher.dispatch(Frame::Binary(Bytes::from_static(b"one")));
        dispatcher.dispatch(text(json!({"id": id, "result": 2})));
        dispatcher.dispatch(Frame::Binary(Bytes::from_static(b"two")));

        assert!(invalid.lock().unwrap().is_empty());
        let reply = task.try_result().unwrap().unwrap();
        assert_eq!(json!(1), reply.result);
        assert_eq!(Bytes::from_static(b"one"), reply.binary);

        // only the frame right after the reply is taken as its tail
        dispatcher.dispatch(Frame::Binary(Bytes::from_static(b"x")));
        assert_eq!(1, invalid.lock().unwrap().len());
    }

    #[test]
    fn test_malformed_and_idless_errors_are_reported() {
        let (mut dispatcher, registry, invalid) = setup();
        let (id, task) = registry.register(false).unwrap();

        dispatcher.dispatch(Frame::Text("{not json".into()));
        dispatcher.dispatch(text(json!({
            "id": null,
            "error": {"code": -32700, "message": "parse error"}
        })));
        dispatcher.dispatch(text(json!({"id": id, "result": true})));

        assert_eq!(2, invalid.lock().unwrap().len());
        assert_eq!(Some(Ok(Reply::new(json!(true)))), task.try_result());
    }

    #[test]
    fn test_finish_fails_outstanding_and_flushes_held_reply() {
        let (mut dispatcher, registry, _) = setup();
        let (a, task_a) = registry.register(true).unwrap();
        let (_, task_b) = registry.register(false).unwrap();

        dispatcher.dispatch(text(json!({"id": a, "result": "partial"})));
        dispatcher.finish();

        assert_eq!(Some(Ok(Reply::new(json!("partial")))), task_a.try_result());
        assert_eq!(Some(Err(RpcError::ConnectionClosed)), task_b.try_result());
    }
}
