//! Messaging gateway configuration.
//!
//! The gateway is the HTTP bridge in front of the external messaging account.

use secrecy::SecretString;
use serde::Deserialize;

/// Messaging gateway settings.
#[derive(Debug, Deserialize, Clone)]
pub struct GatewaySettings {
    /// Base URL of the gateway, e.g. `http://127.0.0.1:3000/`.
    pub base_url: String,
    /// Bearer token sent with every gateway request.
    pub api_token: Option<SecretString>,
    /// Request timeout in seconds (default: 15)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_request_timeout_secs() -> u64 {
    15
}
