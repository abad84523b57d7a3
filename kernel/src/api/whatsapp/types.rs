//! Request/Response Types for the WhatsApp session API.

use serde::Serialize;

use crate::session::{ClientInfo, SessionStatus};

/// Response of `GET /api/whatsapp/status`.
#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    /// Wire name of the state.
    pub status: String,
    /// Shorthand for `status == "connected"`.
    pub connected: bool,
    /// Pending pairing image, if any.
    pub qr_code_base64: Option<String>,
    /// Account details while connected.
    pub client_info: Option<ClientInfo>,
}

impl From<SessionStatus> for StatusResponse {
    fn from(status: SessionStatus) -> Self {
        Self {
            status: status.state.to_string(),
            connected: status.is_connected(),
            qr_code_base64: status.qr_payload,
            client_info: status.client_info,
        }
    }
}

/// Generic acknowledgement.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResponse {
    /// Always `true`; failures use the error body.
    pub success: bool,
    /// Human readable outcome.
    pub message: String,
}

impl ActionResponse {
    /// Successful acknowledgement with `message`.
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }
}
