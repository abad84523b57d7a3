//! Messaging session state.

use serde::Serialize;
use std::fmt;

use crate::session::provider::ClientInfo;

/// Lifecycle state of the external messaging session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// No session and no pending pairing.
    #[default]
    Disconnected,
    /// A pairing code was issued and waits to be scanned.
    AwaitingScan,
    /// Authenticated and able to send.
    Connected,
    /// The account was logged out; credentials are gone.
    LoggedOut,
}

impl SessionState {
    /// Returns `true` if a transition from `self` to `next` is allowed.
    #[must_use]
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::{AwaitingScan, Connected, Disconnected, LoggedOut};
        match (self, next) {
            (a, b) if a == b => true,
            (_, Connected) => true,
            (Disconnected | LoggedOut, AwaitingScan) => true,
            (Connected, LoggedOut | Disconnected) => true,
            (AwaitingScan, Disconnected | LoggedOut) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::AwaitingScan => write!(f, "awaiting_scan"),
            Self::Connected => write!(f, "connected"),
            Self::LoggedOut => write!(f, "logged_out"),
        }
    }
}

/// Point-in-time view of the session for status endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionStatus {
    /// Current state.
    pub state: SessionState,
    /// Pending pairing payload, never set while connected.
    pub qr_payload: Option<String>,
    /// Account details while connected.
    pub client_info: Option<ClientInfo>,
}

impl SessionStatus {
    /// Shorthand for `state == Connected`.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state == SessionState::Connected
    }
}
