use std::pin::Pin;
use std::task::{Context, Poll};

use futures::{ready, Sink, Stream};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use url::Url;

use super::Frame;
use crate::err::*;

/// Frames over a WebSocket connection. Ping and pong are answered by tungstenite and never
/// surface as frames. A close frame ends the stream.
pub struct WebSocketTransport<S = MaybeTlsStream<TcpStream>> {
    stream: WebSocketStream<S>,
}

impl<S> WebSocketTransport<S> {
    pub fn new(stream: WebSocketStream<S>) -> Self {
        Self { stream }
    }
}

/// Build the URI to connect to. `uri` may be a bare `host:port`, in which case the scheme
/// is `wss` if `secure` and `ws` otherwise.
pub fn parse_uri(uri: &str, secure: bool) -> RpcResult<Url> {
    let uri = if uri.contains("://") {
        uri.to_string()
    } else {
        let scheme = if secure { "wss" } else { "ws" };
        format!("{}://{}", scheme, uri)
    };
    let url = Url::parse(&uri)?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        scheme => Err(RpcError::InvalidUri(format!("unsupported scheme '{}'", scheme))),
    }
}

pub async fn connect(url: &Url) -> RpcResult<WebSocketTransport> {
    let (stream, _) = tokio_tungstenite::connect_async(url.as_str())
        .await
        .map_err(|e| RpcError::ConnectionFailed(format!("{}: {}", url, e)))?;
    Ok(WebSocketTransport::new(stream))
}

impl<S> Stream for WebSocketTransport<S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    type Item = RpcResult<Frame>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            let msg = ready!(Pin::new(&mut this.stream).poll_next(cx));
            let frame = match msg {
                Some(Ok(Message::Text(text))) => Frame::Text(text.as_str().to_string()),
                Some(Ok(Message::Binary(data))) => Frame::Binary(data),
                Some(Ok(Message::Close(_))) | None => return Poll::Ready(None),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Poll::Ready(Some(Err(e.into()))),
            };
            return Poll::Ready(Some(Ok(frame)));
        }
    }
}

impl<S> Sink<Frame> for WebSocketTransport<S>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    type Error = RpcError;

    fn poll_ready(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.get_mut().stream).poll_ready(cx).map_err(RpcError::from)
    }

    fn start_send(self: Pin<&mut Self>, item: Frame) -> Result<(), Self::Error> {
        let msg = match item {
            Frame::Text(text) => Message::Text(text.into()),
            Frame::Binary(data) => Message::Binary(data),
        };
        Pin::new(&mut self.get_mut().stream).start_send(msg)?;
        Ok(())
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.get_mut().stream).poll_flush(cx).map_err(RpcError::from)
    }

    fn poll_close(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Pin::new(&mut self.get_mut().stream).poll_close(cx).map_err(RpcError::from)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_uri() {
        assert_eq!("ws://localhost:5000/", parse_uri("localhost:5000", false).unwrap().as_str());
        assert_eq!("wss://localhost:5000/", parse_uri("localhost:5000", true).unwrap().as_str());
        assert_eq!("ws://host:1/path", parse_uri("ws://host:1/path", true).unwrap().as_str());
        assert!(matches!(parse_uri("http://host:1", false), Err(RpcError::InvalidUri(_))));
    }
}
