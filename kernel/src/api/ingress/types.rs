//! Request/Response Types for device and attendance ingress.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Body of `POST /api/devices/status`.
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceStatusRequest {
    /// Reported device status, e.g. `online`.
    pub status: String,
}

/// User id as sent by attendance devices: text or a bare number.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    /// Numeric id.
    Number(i64),
    /// Textual id.
    Text(String),
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s.trim()),
        }
    }
}

/// Body of `POST /api/attendance`.
#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceRequest {
    /// Id reported by the device.
    pub user_id: UserRef,
}

/// How many live clients received the event.
#[derive(Debug, Clone, Serialize)]
pub struct BroadcastResponse {
    /// Always `true`.
    pub success: bool,
    /// Connections that accepted the frame.
    pub delivered: usize,
}
