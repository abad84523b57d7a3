//! HTTP gateway adapter for the messaging account.
//!
//! The gateway process holds the actual account connection. The kernel talks
//! to it over a small JSON API and receives its events through the webhook in
//! `api::whatsapp`.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, instrument};

use crate::infrastructure::config::GatewaySettings;
use crate::session::provider::{Document, MessagingSession, SessionError, SessionProvider};

/// Client for the messaging gateway; acts as both session and provider.
#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: Url,
    api_token: Option<SecretString>,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl GatewayClient {
    /// Builds a client from settings.
    ///
    /// # Errors
    ///
    /// Returns `SessionError::Provider` if the base URL is invalid or the
    /// HTTP client cannot be built.
    pub fn new(settings: &GatewaySettings) -> Result<Self, SessionError> {
        let mut base = settings.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)
            .map_err(|e| SessionError::Provider(format!("invalid gateway URL '{base}': {e}")))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| SessionError::Provider(e.to_string()))?;
        Ok(Self {
            client,
            base_url,
            api_token: settings.api_token.clone(),
        })
    }

    async fn post(&self, path: &str, body: Value) -> Result<(), SessionError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| SessionError::Provider(e.to_string()))?;
        let mut request = self.client.post(url).json(&body);
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| SessionError::SendFailed(format!("gateway unreachable: {e}")))?;
        let status = response.status();
        if status.is_success() {
            debug!(path, %status, "Gateway call succeeded");
            return Ok(());
        }

        let text = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<Value>(&text)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or(text);
        Err(SessionError::SendFailed(format!(
            "HTTP {}: {}",
            status.as_u16(),
            detail.trim()
        )))
    }
}

#[async_trait]
impl MessagingSession for GatewayClient {
    #[instrument(skip(self, body))]
    async fn send_text(&self, address: &str, body: &str) -> Result<(), SessionError> {
        self.post("messages/text", json!({ "to": address, "body": body }))
            .await
    }

    #[instrument(skip(self, document), fields(file_name = %document.file_name))]
    async fn send_document(&self, address: &str, document: &Document) -> Result<(), SessionError> {
        self.post(
            "messages/document",
            json!({
                "to": address,
                "file_name": document.file_name,
                "mime_type": document.mime_type,
                "caption": document.caption,
                "content_base64": STANDARD.encode(&document.content),
            }),
        )
        .await
    }
}

#[async_trait]
impl SessionProvider for GatewayClient {
    async fn start_pairing(&self) -> Result<(), SessionError> {
        self.post("session/pair", Value::Null)
            .await
            .map_err(|e| SessionError::Provider(e.to_string()))
    }

    async fn logout(&self) -> Result<(), SessionError> {
        self.post("session/logout", Value::Null)
            .await
            .map_err(|e| SessionError::Provider(e.to_string()))
    }
}
