//! Thread-safe registry of live hub connections.
//!
//! The registry is the only owner of connection entries. Every mutation goes
//! through one mutex that is held for the map operation only; callers snapshot
//! the sinks and perform socket writes outside the lock.

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::debug;

use crate::ws::types::{ClientId, WsError};

/// Write half of a connection as seen by the hub.
#[async_trait]
pub trait EnvelopeSink: Send + Sync {
    /// Writes one text frame.
    async fn send_text(&self, text: String) -> Result<(), WsError>;

    /// Marks the sink closed. Must not block; the owning read loop performs
    /// the actual close handshake.
    fn close(&self);

    /// Returns `true` once `close` has been called.
    fn is_closed(&self) -> bool;
}

/// `EnvelopeSink` over the write half of an axum websocket.
pub struct SocketSink {
    writer: tokio::sync::Mutex<SplitSink<WebSocket, Message>>,
    closed: AtomicBool,
    close_signal: Notify,
}

impl SocketSink {
    /// Wraps a websocket write half.
    #[must_use]
    pub fn new(writer: SplitSink<WebSocket, Message>) -> Self {
        Self {
            writer: tokio::sync::Mutex::new(writer),
            closed: AtomicBool::new(false),
            close_signal: Notify::new(),
        }
    }

    /// Resolves once the registry has closed this sink.
    pub async fn closed(&self) {
        if self.is_closed() {
            return;
        }
        self.close_signal.notified().await;
    }

    /// Sends the close frame. Errors are ignored, the peer may already be gone.
    pub async fn shutdown(&self) {
        let mut writer = self.writer.lock().await;
        let _ = writer.send(Message::Close(None)).await;
        let _ = writer.close().await;
    }
}

#[async_trait]
impl EnvelopeSink for SocketSink {
    async fn send_text(&self, text: String) -> Result<(), WsError> {
        if self.is_closed() {
            return Err(WsError::Closed);
        }
        self.writer
            .lock()
            .await
            .send(Message::Text(text.into()))
            .await
            .map_err(WsError::AxumWs)
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.close_signal.notify_one();
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct ConnectionEntry {
    sink: Arc<dyn EnvelopeSink>,
    last_activity: Instant,
}

/// Registry of live connections keyed by client id.
#[derive(Default)]
pub struct ConnectionRegistry {
    connections: Mutex<HashMap<ClientId, ConnectionEntry>>,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a connection and returns the new live count.
    pub fn insert(&self, client_id: ClientId, sink: Arc<dyn EnvelopeSink>) -> usize {
        let mut connections = self.connections.lock();
        connections.insert(
            client_id,
            ConnectionEntry {
                sink,
                last_activity: Instant::now(),
            },
        );
        connections.len()
    }

    /// Removes a connection and closes its sink under the same lock.
    ///
    /// Returns `false` if the connection was already gone.
    pub fn remove(&self, client_id: &ClientId) -> bool {
        let mut connections = self.connections.lock();
        match connections.remove(client_id) {
            Some(entry) => {
                entry.sink.close();
                debug!(client_id = %client_id, remaining = connections.len(), "Connection removed");
                true
            }
            None => false,
        }
    }

    /// Removes every listed connection in one critical section.
    ///
    /// Returns how many were actually present.
    pub fn remove_many(&self, client_ids: &[ClientId]) -> usize {
        if client_ids.is_empty() {
            return 0;
        }
        let mut connections = self.connections.lock();
        let mut removed = 0;
        for id in client_ids {
            if let Some(entry) = connections.remove(id) {
                entry.sink.close();
                removed += 1;
            }
        }
        removed
    }

    /// Refreshes the last activity timestamp of a connection.
    pub fn touch(&self, client_id: &ClientId) -> bool {
        match self.connections.lock().get_mut(client_id) {
            Some(entry) => {
                entry.last_activity = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Time elapsed since the connection last proved it was alive.
    #[must_use]
    pub fn idle_for(&self, client_id: &ClientId) -> Option<Duration> {
        self.connections
            .lock()
            .get(client_id)
            .map(|entry| entry.last_activity.elapsed())
    }

    /// Returns the sink of a single connection.
    #[must_use]
    pub fn sink(&self, client_id: &ClientId) -> Option<Arc<dyn EnvelopeSink>> {
        self.connections
            .lock()
            .get(client_id)
            .map(|entry| Arc::clone(&entry.sink))
    }

    /// Copies out every `(id, sink)` pair so writes can happen without the lock.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(ClientId, Arc<dyn EnvelopeSink>)> {
        self.connections
            .lock()
            .iter()
            .map(|(id, entry)| (*id, Arc::clone(&entry.sink)))
            .collect()
    }

    /// Returns `true` if the connection is registered.
    #[must_use]
    pub fn contains(&self, client_id: &ClientId) -> bool {
        self.connections.lock().contains_key(client_id)
    }

    /// Number of live connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.lock().len()
    }

    /// Returns `true` when no connection is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.lock().is_empty()
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// In-memory sink recording every frame; can be told to fail writes.
    #[derive(Default)]
    pub struct RecordingSink {
        pub frames: Mutex<Vec<String>>,
        pub fail_writes: AtomicBool,
        closed: AtomicBool,
    }

    impl RecordingSink {
        pub fn healthy() -> Arc<Self> {
            Arc::new(Self::default())
        }

        pub fn dead() -> Arc<Self> {
            let sink = Self::default();
            sink.fail_writes.store(true, Ordering::SeqCst);
            Arc::new(sink)
        }

        pub fn kinds(&self) -> Vec<String> {
            self.frames
                .lock()
                .iter()
                .filter_map(|f| crate::ws::Envelope::decode(f).ok())
                .map(|e| e.kind)
                .collect()
        }
    }

    #[async_trait]
    impl EnvelopeSink for RecordingSink {
        async fn send_text(&self, text: String) -> Result<(), WsError> {
            if self.is_closed() {
                return Err(WsError::Closed);
            }
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(WsError::Protocol("broken pipe".into()));
            }
            self.frames.lock().push(text);
            Ok(())
        }

        fn close(&self) {
            self.closed.store(true, Ordering::SeqCst);
        }

        fn is_closed(&self) -> bool {
            self.closed.load(Ordering::SeqCst)
        }
    }
}
