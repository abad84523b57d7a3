//! Provider events delivered by the gateway webhook.

use serde::Deserialize;
use std::sync::Arc;

use crate::session::lifecycle::SessionLifecycle;
use crate::session::provider::{ClientInfo, MessagingSession};

/// Event surfaced by the messaging provider.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProviderEvent {
    /// The account is authenticated.
    Connected {
        /// Account details, if the provider shares them.
        #[serde(default)]
        client_info: Option<ClientInfo>,
    },
    /// A pairing code was issued; may be empty when none is available.
    Qr {
        /// Base64 pairing image.
        #[serde(default)]
        code: String,
    },
    /// The account was logged out.
    LoggedOut,
    /// Another client took over the account.
    Replaced,
}

impl ProviderEvent {
    /// Drives the lifecycle with this event.
    ///
    /// `session` becomes the active handle on `Connected`.
    pub async fn apply(self, lifecycle: &SessionLifecycle, session: Arc<dyn MessagingSession>) {
        match self {
            Self::Connected { client_info } => lifecycle.on_connected(session, client_info).await,
            Self::Qr { code } => lifecycle.on_pairing_challenge(&code).await,
            Self::LoggedOut => lifecycle.on_logged_out().await,
            Self::Replaced => lifecycle.on_replaced_elsewhere().await,
        }
    }
}
