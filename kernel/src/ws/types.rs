//! Wire types for the real-time hub.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Envelope type tags exchanged over the socket.
pub mod kinds {
    /// Keepalive ping, sent by either side.
    pub const PING: &str = "ping";
    /// Answer to a keepalive ping.
    pub const PONG: &str = "pong";
    /// Client liveness beacon, treated like `pong`.
    pub const HEARTBEAT: &str = "heartbeat";
    /// Hello sent to a freshly upgraded connection.
    pub const CONNECTED: &str = "connected";
    /// Attendance device status change.
    pub const DEVICE_STATUS: &str = "device_status";
    /// A user was recorded by an attendance device.
    pub const ATTENDANCE_EVENT: &str = "attendance_event";
    /// Pairing code for the messaging session.
    pub const WHATSAPP_QR: &str = "whatsapp_qr";
    /// Messaging session status change.
    pub const WHATSAPP_STATUS: &str = "whatsapp_status";
    /// Live connection count.
    pub const CONNECTION_STATUS: &str = "connection_status";
    /// Client command asking for a fresh pairing code.
    pub const REFRESH_WHATSAPP: &str = "refresh_whatsapp";

    /// Client-originated types forwarded to the injected handler.
    pub const CLIENT_COMMANDS: &[&str] = &[REFRESH_WHATSAPP];
}

/// Opaque identifier handed to each upgraded connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    /// Generates a fresh random id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The only unit exchanged on the wire: `{ "type": ..., "payload": ... }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Type tag.
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific payload.
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    /// Builds an envelope from a tag and payload.
    #[must_use]
    pub fn new(kind: impl Into<String>, payload: Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }

    /// A payload-less keepalive ping.
    #[must_use]
    pub fn ping() -> Self {
        Self::new(kinds::PING, Value::Null)
    }

    /// A payload-less keepalive answer.
    #[must_use]
    pub fn pong() -> Self {
        Self::new(kinds::PONG, Value::Null)
    }

    /// Decodes an envelope from a text frame.
    ///
    /// # Errors
    ///
    /// Returns `WsError::Protocol` if the frame is not a JSON envelope.
    pub fn decode(text: &str) -> Result<Self, WsError> {
        serde_json::from_str(text).map_err(|e| WsError::Protocol(format!("malformed envelope: {e}")))
    }

    /// Encodes the envelope to a text frame payload.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized.
    pub fn encode(&self) -> Result<String, WsError> {
        serde_json::to_string(self).map_err(WsError::Serialization)
    }

    /// Classifies an inbound envelope for routing.
    #[must_use]
    pub fn inbound_kind(&self) -> InboundKind {
        match self.kind.as_str() {
            kinds::PING => InboundKind::Ping,
            kinds::PONG | kinds::HEARTBEAT => InboundKind::Liveness,
            other if kinds::CLIENT_COMMANDS.contains(&other) => InboundKind::Command,
            _ => InboundKind::Unknown,
        }
    }
}

/// Routing class of a client-originated envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InboundKind {
    /// Client ping; answered with `pong`.
    Ping,
    /// `pong` or `heartbeat`; refreshes last activity.
    Liveness,
    /// Business command for the injected handler.
    Command,
    /// Anything else; ignored.
    Unknown,
}

/// Outcome of one fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the envelope was written to.
    pub delivered: usize,
    /// Connections removed because the write failed.
    pub removed: usize,
}

/// Errors raised on a single connection. None of them is fatal to the hub.
#[derive(Debug, Error)]
pub enum WsError {
    /// Bad handshake or undecodable envelope.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Socket-level failure reported by axum.
    #[error("WebSocket connection error: {0}")]
    AxumWs(#[from] axum::Error),

    /// A bounded write did not complete in time.
    #[error("Write timed out after {0:?}")]
    WriteTimeout(Duration),

    /// An outbound envelope could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[source] serde_json::Error),

    /// The connection was already removed from the registry.
    #[error("Connection closed")]
    Closed,
}
