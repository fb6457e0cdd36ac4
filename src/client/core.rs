use std::time::Duration;

use futures::SinkExt;
use futures::StreamExt;
use tokio::sync::mpsc::UnboundedReceiver;

use super::connector::Connector;
use super::dispatch::Dispatcher;
use crate::err::*;
use crate::transport::{Frame, Transport};

pub(crate) enum Command {
    /// Frames written back to back, nothing from other commands in between.
    Send(Vec<Frame>),
    Stop,
}

/// The background half of a client. Owns the connection: it is the only place frames are
/// read from or written to the socket.
pub(crate) struct ClientCore<TTransport>
where
    TTransport: Transport,
{
    transport: TTransport,
    dispatcher: Dispatcher,
    command_receiver: UnboundedReceiver<Command>,
}

/// Connect on a new worker thread with its own runtime and run the client core there.
/// Returns once the connection is established, or with the reason it could not be.
pub(crate) fn start(
    connector: Connector,
    connect_timeout: Duration,
    dispatcher: Dispatcher,
    command_receiver: UnboundedReceiver<Command>,
) -> RpcResult<std::thread::JoinHandle<RpcResult<()>>> {
    let (ready_sender, ready_receiver) = std::sync::mpsc::channel::<RpcResult<()>>();

    let join_handle = std::thread::Builder::new()
        .name("t2-rpc-io".into())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(e) => {
                    let _ = ready_sender.send(Err(e.into()));
                    return Ok(());
                }
            };

            runtime.block_on(async move {
                let connected = tokio::time::timeout(connect_timeout, connector.connect()).await;
                let transport = match connected {
                    Ok(Ok(transport)) => transport,
                    Ok(Err(e)) => {
                        let _ = ready_sender.send(Err(e));
                        return Ok(());
                    }
                    Err(_) => {
                        let _ = ready_sender.send(Err(RpcError::ConnectionFailed(format!(
                            "no connection after {:?}",
                            connect_timeout
                        ))));
                        return Ok(());
                    }
                };
                let _ = ready_sender.send(Ok(()));

                let core = ClientCore {
                    transport,
                    dispatcher,
                    command_receiver,
                };
                core.run().await
            })
        })?;

    match ready_receiver.recv() {
        Ok(Ok(())) => Ok(join_handle),
        Ok(Err(e)) => {
            let _ = join_handle.join();
            Err(e)
        }
        Err(_) => Err(RpcError::InternalError("worker thread exited while connecting".into())),
    }
}

impl<TTransport> ClientCore<TTransport>
where
    TTransport: Transport,
{
    async fn run(mut self) -> RpcResult<()> {
        debug!("Client worker started");
        let result = self.main_loop().await;
        match &result {
            Ok(()) => debug!("Client worker stopped"),
            Err(e) => error!("Client worker stopped: {}", e),
        }
        self.dispatcher.finish();
        result
    }

    async fn main_loop(&mut self) -> RpcResult<()> {
        loop {
            tokio::select! {
                // frame from server
                frame = self.transport.next() => {
                    match frame {
                        Some(frame) => self.after_receive(frame?),
                        None => {
                            debug!("Connection closed by peer");
                            return Ok(())
                        }
                    }
                },
                // frames from client
                command = self.command_receiver.recv() => {
                    match command {
                        Some(Command::Send(frames)) => self.send(frames).await?,
                        Some(Command::Stop) | None => {
                            // ignore error, the peer may already be gone
                            let _ = self.transport.close().await;
                            return Ok(())
                        }
                    }
                }
            }
        }
    }

    async fn send(&mut self, frames: Vec<Frame>) -> RpcResult<()> {
        for frame in frames {
            if log_enabled!(log::Level::Trace) {
                trace!("<-- {}", crate::debug::frame_to_string(&frame));
            }
            self.transport.feed(frame).await?;
        }
        self.transport.flush().await?;
        Ok(())
    }

    fn after_receive(&mut self, frame: Frame) {
        if log_enabled!(log::Level::Trace) {
            trace!("--> {}", crate::debug::frame_to_string(&frame));
        }
        self.dispatcher.dispatch(frame);
    }
}
