//! Configuration management for the Tally kernel.
//!
//! Settings are layered: built-in defaults first, then environment variables
//! prefixed with `TALLY` using `__` as the section separator, e.g.
//! `TALLY__DATABASE__URL=sqlite://tally.db`.
//!
//! # Example
//!
//! ```no_run
//! use tally_kernel::infrastructure::config::Settings;
//!
//! let settings = Settings::new().expect("Failed to load configuration");
//! ```

pub mod database;
pub mod dispatch;
pub mod gateway;
pub mod hub;
pub mod server;
pub mod telemetry;

pub use database::DatabaseSettings;
pub use dispatch::{DispatchSettings, DEFAULT_TEMPLATE};
pub use gateway::GatewaySettings;
pub use hub::HubSettings;
pub use server::ServerSettings;
pub use telemetry::TelemetrySettings;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Top-level configuration for the Tally kernel.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// Server settings.
    pub server: ServerSettings,
    /// Telemetry settings.
    pub telemetry: TelemetrySettings,
    /// Database settings.
    pub database: DatabaseSettings,
    /// Hub keepalive settings.
    #[serde(default)]
    pub hub: HubSettings,
    /// Notification dispatch settings.
    #[serde(default)]
    pub dispatch: DispatchSettings,
    /// Messaging gateway; without it the session stays disconnected.
    pub gateway: Option<GatewaySettings>,
}

impl Settings {
    /// Creates a new settings instance from environment variables and defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be built or deserialized.
    pub fn new() -> Result<Self, ConfigError> {
        Self::from_environment(Environment::with_prefix("TALLY").separator("__"))
    }

    /// Builds settings from defaults overlaid with the given environment source.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be built or deserialized.
    pub fn from_environment(environment: Environment) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("telemetry.service_name", "tally-kernel")?
            .set_default("telemetry.sampling_ratio", 1.0)?
            .set_default("database.url", "sqlite://tally.db")?
            .add_source(environment)
            .build()?;

        s.try_deserialize()
    }
}

/// Helper for strong typing addresses
pub struct BindAddress(pub String, pub u16);

impl BindAddress {
    /// Converts the bind address to a `SocketAddr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the IP address string cannot be parsed.
    pub fn to_socket_addr(&self) -> anyhow::Result<std::net::SocketAddr> {
        let ip = self
            .0
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid IP address '{}': {e}", self.0))?;
        Ok(std::net::SocketAddr::new(ip, self.1))
    }
}

impl From<&ServerSettings> for BindAddress {
    fn from(server: &ServerSettings) -> Self {
        Self(server.host.clone(), server.port)
    }
}
