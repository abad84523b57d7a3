//! Messaging session lifecycle.
//!
//! Provider events are the only inputs. Each accepted transition is pushed to
//! every hub client as `whatsapp_status` or `whatsapp_qr`. Transitions not
//! allowed by [`SessionState::can_transition_to`] are dropped.
//!
//! A transition and its broadcast run under one async lock, so clients see
//! status changes in the order they were applied.

use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::infrastructure::audit::{self, AuditEvent};
use crate::session::provider::{ClientInfo, MessagingSession, SessionError, SessionProvider};
use crate::session::state::{SessionState, SessionStatus};
use crate::ws::{kinds, Broadcaster, Envelope};

/// Result of a user-triggered refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The session is already connected; nothing was requested.
    AlreadyConnected,
    /// The provider was asked for a new pairing code.
    PairingRequested,
}

#[derive(Default)]
struct Inner {
    state: SessionState,
    qr_payload: Option<String>,
    client_info: Option<ClientInfo>,
    session: Option<Arc<dyn MessagingSession>>,
}

impl Inner {
    /// Moves to `next` if the table allows it.
    fn advance(&mut self, next: SessionState) -> bool {
        if !self.state.can_transition_to(next) {
            debug!(from = %self.state, to = %next, "Session transition rejected");
            return false;
        }
        self.state = next;
        true
    }
}

/// Process-wide owner of the messaging session state.
pub struct SessionLifecycle {
    inner: Mutex<Inner>,
    // Held across transition + broadcast; never taken by readers.
    transitions: tokio::sync::Mutex<()>,
    broadcaster: Arc<dyn Broadcaster>,
    provider: Option<Arc<dyn SessionProvider>>,
}

impl SessionLifecycle {
    /// Creates a lifecycle in `Disconnected`.
    ///
    /// Without a provider `refresh` and `logout` fail with `Provider`.
    pub fn new(broadcaster: Arc<dyn Broadcaster>, provider: Option<Arc<dyn SessionProvider>>) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            transitions: tokio::sync::Mutex::new(()),
            broadcaster,
            provider,
        }
    }

    /// Returns a snapshot of the current state.
    pub fn status(&self) -> SessionStatus {
        let inner = self.inner.lock();
        SessionStatus {
            state: inner.state,
            qr_payload: inner.qr_payload.clone(),
            client_info: inner.client_info.clone(),
        }
    }

    /// Current state only.
    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// The provider authenticated the account.
    pub async fn on_connected(&self, session: Arc<dyn MessagingSession>, client_info: Option<ClientInfo>) {
        let _serial = self.transitions.lock().await;
        {
            let mut inner = self.inner.lock();
            if !inner.advance(SessionState::Connected) {
                return;
            }
            inner.qr_payload = None;
            inner.session = Some(session);
            inner.client_info.clone_from(&client_info);
        }
        info!(account = ?client_info.as_ref().and_then(|c| c.jid.as_deref()), "Messaging session connected");

        let mut payload = status_payload(SessionState::Connected, "WhatsApp connected");
        if let Some(client_info) = client_info {
            payload["client_info"] = serde_json::to_value(client_info).unwrap_or(Value::Null);
        }
        self.publish(kinds::WHATSAPP_STATUS, payload).await;
    }

    /// The provider issued a pairing code.
    ///
    /// Ignored while connected. An empty payload announces that no code is
    /// available without entering `AwaitingScan`.
    pub async fn on_pairing_challenge(&self, payload: &str) {
        let _serial = self.transitions.lock().await;
        let envelope_payload = {
            let mut inner = self.inner.lock();
            if !inner.state.can_transition_to(SessionState::AwaitingScan) {
                debug!(state = %inner.state, "Pairing challenge ignored");
                return;
            }
            if payload.is_empty() {
                json!({
                    "qr_code_base64": Value::Null,
                    "logged_in": false,
                    "message": "no pairing code available",
                })
            } else {
                inner.advance(SessionState::AwaitingScan);
                inner.qr_payload = Some(payload.to_string());
                json!({ "qr_code_base64": payload, "logged_in": false })
            }
        };
        self.publish(kinds::WHATSAPP_QR, envelope_payload).await;
    }

    /// The account was logged out by the user or the provider.
    pub async fn on_logged_out(&self) {
        let _serial = self.transitions.lock().await;
        if !self.drop_session(SessionState::LoggedOut) {
            return;
        }
        warn!("Messaging session logged out");
        audit::log_audit(&AuditEvent::SessionLoggedOut {
            reason: "logged out".into(),
        });
        self.publish(
            kinds::WHATSAPP_STATUS,
            status_payload(SessionState::LoggedOut, "WhatsApp logged out, pair again to reconnect"),
        )
        .await;
    }

    /// Another client took over the account.
    pub async fn on_replaced_elsewhere(&self) {
        let _serial = self.transitions.lock().await;
        if !self.drop_session(SessionState::Disconnected) {
            return;
        }
        warn!("Messaging session replaced by another client");
        self.publish(
            kinds::WHATSAPP_STATUS,
            status_payload(SessionState::Disconnected, "WhatsApp session opened elsewhere"),
        )
        .await;
    }

    /// Returns the live session handle.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Unavailable` unless the state is `Connected`.
    pub fn active_session(&self) -> Result<Arc<dyn MessagingSession>, SessionError> {
        let inner = self.inner.lock();
        match (&inner.state, &inner.session) {
            (SessionState::Connected, Some(session)) => Ok(Arc::clone(session)),
            (state, _) => Err(SessionError::Unavailable(format!("session is {state}"))),
        }
    }

    /// User-triggered re-pairing.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Provider` if no provider is configured or it
    /// refuses to start pairing.
    pub async fn refresh(&self) -> Result<RefreshOutcome, SessionError> {
        {
            let _serial = self.transitions.lock().await;
            if self.state() == SessionState::Connected {
                self.publish(
                    kinds::WHATSAPP_STATUS,
                    status_payload(SessionState::Connected, "WhatsApp already connected"),
                )
                .await;
                return Ok(RefreshOutcome::AlreadyConnected);
            }
        }

        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| SessionError::Provider("no session provider configured".into()))?;
        provider.start_pairing().await?;
        info!("Pairing requested");
        Ok(RefreshOutcome::PairingRequested)
    }

    /// Asks the provider to log the account out.
    ///
    /// The state changes when the provider confirms through `on_logged_out`.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Provider` if no provider is configured or the
    /// call fails.
    pub async fn logout(&self) -> Result<(), SessionError> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| SessionError::Provider("no session provider configured".into()))?;
        provider.logout().await
    }

    /// Moves to `next` and forgets the session; `false` if the table refused.
    fn drop_session(&self, next: SessionState) -> bool {
        let mut inner = self.inner.lock();
        if !inner.advance(next) {
            return false;
        }
        inner.session = None;
        inner.client_info = None;
        inner.qr_payload = None;
        true
    }

    async fn publish(&self, kind: &str, payload: Value) {
        self.broadcaster.publish(Envelope::new(kind, payload)).await;
    }
}

fn status_payload(state: SessionState, message: &str) -> Value {
    json!({
        "status": state.to_string(),
        "connected": state == SessionState::Connected,
        "message": message,
    })
}
