//! Notification dispatch configuration.

use serde::Deserialize;
use std::time::Duration;

/// Template used when a dispatch request does not carry its own.
pub const DEFAULT_TEMPLATE: &str = "Hello {name}, your savings balance for {month} {year} is {balance}.";

/// Settings for bulk notification dispatch.
#[derive(Debug, Deserialize, Clone)]
pub struct DispatchSettings {
    /// Pause between two consecutive sends in milliseconds (default: 300)
    #[serde(default = "default_send_interval_ms")]
    pub send_interval_ms: u64,

    /// Country calling code prepended to local numbers (default: "62")
    #[serde(default = "default_country_code")]
    pub country_code: String,

    /// Template used when the request omits `message_template`
    #[serde(default = "default_template")]
    pub default_template: String,
}

impl DispatchSettings {
    /// Send interval as a `Duration`.
    #[must_use]
    pub fn send_interval(&self) -> Duration {
        Duration::from_millis(self.send_interval_ms)
    }
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            send_interval_ms: default_send_interval_ms(),
            country_code: default_country_code(),
            default_template: default_template(),
        }
    }
}

fn default_send_interval_ms() -> u64 {
    300
}

fn default_country_code() -> String {
    "62".to_string()
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}
