//! Real-time hub configuration.

use serde::Deserialize;
use std::time::Duration;

/// Hub keepalive and write bounds.
#[derive(Debug, Deserialize, Clone)]
pub struct HubSettings {
    /// Interval between keepalive pings in seconds (default: 30)
    #[serde(default = "default_keepalive_interval_secs")]
    pub keepalive_interval_secs: u64,

    /// Upper bound for a single socket write in seconds (default: 5)
    #[serde(default = "default_write_timeout_secs")]
    pub write_timeout_secs: u64,
}

impl HubSettings {
    /// Keepalive interval as a `Duration`.
    #[must_use]
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs.max(1))
    }

    /// Write timeout as a `Duration`.
    #[must_use]
    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout_secs.max(1))
    }
}

impl Default for HubSettings {
    fn default() -> Self {
        Self {
            keepalive_interval_secs: default_keepalive_interval_secs(),
            write_timeout_secs: default_write_timeout_secs(),
        }
    }
}

fn default_keepalive_interval_secs() -> u64 {
    30
}

fn default_write_timeout_secs() -> u64 {
    5
}
