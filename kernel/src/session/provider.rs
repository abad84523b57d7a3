//! Seams to the external messaging account.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Errors raised by the messaging session or its lifecycle.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// No connected session is available for sending.
    #[error("Messaging session unavailable: {0}")]
    Unavailable(String),
    /// The provider rejected or failed a send.
    #[error("{0}")]
    SendFailed(String),
    /// The provider could not be reached.
    #[error("Provider Error: {0}")]
    Provider(String),
}

/// A document sent as a standalone message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    /// File name shown to the recipient.
    pub file_name: String,
    /// MIME type of `content`.
    pub mime_type: String,
    /// Raw bytes.
    pub content: Vec<u8>,
    /// Optional caption.
    pub caption: Option<String>,
}

/// Account details reported by the provider once connected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    /// Address of the logged-in account.
    #[serde(default)]
    pub jid: Option<String>,
    /// Display name of the account.
    #[serde(default)]
    pub push_name: Option<String>,
    /// Platform reported by the paired device.
    #[serde(default)]
    pub platform: Option<String>,
}

/// A live, authenticated messaging session.
#[async_trait]
pub trait MessagingSession: Send + Sync {
    /// Sends a text message to `address`.
    async fn send_text(&self, address: &str, body: &str) -> Result<(), SessionError>;

    /// Sends a document to `address`.
    async fn send_document(&self, address: &str, document: &Document) -> Result<(), SessionError>;
}

/// Control surface of the provider that owns the session.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Asks the provider to start a pairing flow; a challenge event follows.
    async fn start_pairing(&self) -> Result<(), SessionError>;

    /// Logs the account out; a logged-out event follows.
    async fn logout(&self) -> Result<(), SessionError>;
}
