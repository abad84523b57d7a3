//! Shared application state handed to every HTTP handler.

use axum::extract::FromRef;
use std::sync::Arc;
use tracing::info;

use crate::directory::RecipientDirectory;
use crate::infrastructure::config::{DispatchSettings, Settings};
use crate::notify::{FixedIntervalGate, NotificationDispatcher, RateGate, TextStatementRenderer};
use crate::session::{
    GatewayClient, MessagingSession, SessionCommands, SessionError, SessionLifecycle,
    SessionProvider,
};
use crate::ws::{ConnectionRegistry, Hub};

/// Everything the routes need, cheap to clone.
#[derive(Clone)]
pub struct AppState {
    /// Real-time hub.
    pub hub: Hub,
    /// Messaging session owner.
    pub sessions: Arc<SessionLifecycle>,
    /// Bulk notification sender.
    pub dispatcher: Arc<NotificationDispatcher>,
    /// User records.
    pub directory: Arc<dyn RecipientDirectory>,
    /// Handle installed when the provider reports `connected`.
    pub messaging: Option<Arc<dyn MessagingSession>>,
    /// Dispatch defaults.
    pub dispatch: DispatchSettings,
}

impl FromRef<AppState> for Hub {
    fn from_ref(state: &AppState) -> Self {
        state.hub.clone()
    }
}

/// Assembles [`AppState`] from its collaborators.
pub struct AppStateBuilder {
    hub: Hub,
    directory: Arc<dyn RecipientDirectory>,
    dispatch: DispatchSettings,
    gate: Option<Arc<dyn RateGate>>,
    messaging: Option<Arc<dyn MessagingSession>>,
    provider: Option<Arc<dyn SessionProvider>>,
}

impl AppStateBuilder {
    /// Starts from a hub and a directory with default dispatch settings.
    pub fn new(hub: Hub, directory: Arc<dyn RecipientDirectory>) -> Self {
        Self {
            hub,
            directory,
            dispatch: DispatchSettings::default(),
            gate: None,
            messaging: None,
            provider: None,
        }
    }

    /// Dispatch settings; also sets the default pacing.
    #[must_use]
    pub fn dispatch(mut self, dispatch: DispatchSettings) -> Self {
        self.dispatch = dispatch;
        self
    }

    /// Overrides the pacing between sends.
    #[must_use]
    pub fn rate_gate(mut self, gate: Arc<dyn RateGate>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Session handle and provider control.
    #[must_use]
    pub fn messaging(
        mut self,
        session: Arc<dyn MessagingSession>,
        provider: Arc<dyn SessionProvider>,
    ) -> Self {
        self.messaging = Some(session);
        self.provider = Some(provider);
        self
    }

    /// Wires the lifecycle into the hub and builds the state.
    #[must_use]
    pub fn build(self) -> AppState {
        let sessions = Arc::new(SessionLifecycle::new(
            Arc::new(self.hub.clone()),
            self.provider,
        ));
        self.hub
            .set_handler(Arc::new(SessionCommands::new(Arc::clone(&sessions))));

        let gate = self
            .gate
            .unwrap_or_else(|| Arc::new(FixedIntervalGate::new(self.dispatch.send_interval())));
        let dispatcher = NotificationDispatcher::new(
            Arc::clone(&sessions),
            gate,
            self.dispatch.country_code.clone(),
        )
        .with_statements(Arc::clone(&self.directory), Arc::new(TextStatementRenderer));

        AppState {
            hub: self.hub,
            sessions,
            dispatcher: Arc::new(dispatcher),
            directory: self.directory,
            messaging: self.messaging,
            dispatch: self.dispatch,
        }
    }
}

impl AppState {
    /// Builds the production state from settings.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Provider` if the gateway settings are invalid.
    pub fn from_settings(
        settings: &Settings,
        directory: Arc<dyn RecipientDirectory>,
    ) -> Result<Self, SessionError> {
        let hub = Hub::new(Arc::new(ConnectionRegistry::new()), &settings.hub);
        let mut builder = AppStateBuilder::new(hub, directory).dispatch(settings.dispatch.clone());

        if let Some(gateway) = &settings.gateway {
            let client = Arc::new(GatewayClient::new(gateway)?);
            info!(base_url = %gateway.base_url, "Messaging gateway configured");
            builder = builder.messaging(client.clone(), client);
        } else {
            info!("No messaging gateway configured, notifications stay unavailable");
        }

        Ok(builder.build())
    }
}
