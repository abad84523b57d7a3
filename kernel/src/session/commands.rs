//! Client commands received through the hub.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

use crate::session::lifecycle::SessionLifecycle;
use crate::ws::{kinds, ClientId, Envelope, EnvelopeHandler};

/// Routes `refresh_whatsapp` commands to the session lifecycle.
pub struct SessionCommands {
    lifecycle: Arc<SessionLifecycle>,
}

impl SessionCommands {
    /// Wraps the lifecycle.
    #[must_use]
    pub fn new(lifecycle: Arc<SessionLifecycle>) -> Self {
        Self { lifecycle }
    }
}

#[async_trait]
impl EnvelopeHandler for SessionCommands {
    async fn handle(&self, client_id: ClientId, envelope: Envelope) {
        if envelope.kind != kinds::REFRESH_WHATSAPP {
            return;
        }
        match self.lifecycle.refresh().await {
            Ok(outcome) => info!(client_id = %client_id, ?outcome, "Refresh handled"),
            Err(e) => warn!(client_id = %client_id, error = %e, "Refresh failed"),
        }
    }
}
