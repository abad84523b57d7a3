//! Per-connection read loop.

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitStream;
use futures_util::StreamExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::ws::hub::Hub;
use crate::ws::registry::SocketSink;
use crate::ws::types::{ClientId, WsError};

/// One upgraded socket, registered with the hub for its whole life.
pub struct Connection {
    client_id: ClientId,
    stream: SplitStream<WebSocket>,
    sink: Arc<SocketSink>,
    hub: Hub,
}

impl Connection {
    /// Splits the socket, registers the write half and greets the client.
    pub async fn accept(socket: WebSocket, hub: Hub) -> Self {
        let (writer, stream) = socket.split();
        let sink = Arc::new(SocketSink::new(writer));
        let client_id = hub.register(sink.clone()).await;
        Self {
            client_id,
            stream,
            sink,
            hub,
        }
    }

    /// Reads until the peer leaves, the registry drops us, or a frame is bad.
    ///
    /// The connection is always unregistered on return.
    ///
    /// # Errors
    ///
    /// Returns the transport or protocol error that ended the loop.
    pub async fn run(mut self) -> Result<(), WsError> {
        let outcome = loop {
            tokio::select! {
                incoming = self.stream.next() => {
                    match incoming {
                        Some(Ok(msg)) => match self.handle_incoming_message(msg).await {
                            Ok(true) => break Ok(()),
                            Ok(false) => {}
                            Err(e) => break Err(e),
                        },
                        Some(Err(e)) => {
                            warn!(client_id = %self.client_id, error = %e, "Read failed");
                            break Err(WsError::AxumWs(e));
                        }
                        None => {
                            debug!(client_id = %self.client_id, "Stream ended");
                            break Ok(());
                        }
                    }
                }

                () = self.sink.closed() => {
                    debug!(client_id = %self.client_id, "Removed by hub");
                    break Ok(());
                }
            }
        };

        self.hub.unregister(&self.client_id).await;
        self.sink.shutdown().await;
        info!(client_id = %self.client_id, "Connection closed");
        outcome
    }

    async fn handle_incoming_message(&mut self, message: Message) -> Result<bool, WsError> {
        match message {
            Message::Text(text) => {
                if let Err(e) = self.hub.handle_inbound(self.client_id, text.as_str()).await {
                    warn!(client_id = %self.client_id, error = %e, "Dropping connection");
                    return Err(e);
                }
                Ok(false)
            }
            Message::Binary(data) => {
                warn!(client_id = %self.client_id, len = data.len(), "Unexpected binary from client");
                Err(WsError::Protocol("binary frames are not envelopes".into()))
            }
            Message::Ping(_) | Message::Pong(_) => {
                // Control frames prove liveness; the pong reply is queued by the socket.
                self.hub.registry().touch(&self.client_id);
                Ok(false)
            }
            Message::Close(_) => {
                info!(client_id = %self.client_id, "Client initiated close");
                Ok(true)
            }
        }
    }
}
