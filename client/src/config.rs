use std::time::Duration;

use crate::ClientError;

/// Client configuration with builder-style setters.
///
/// Defaults: base delay 1s, max delay 30s, jitter up to 2s, ping every 25s,
/// pong timeout 60s, at most 10 reconnect attempts.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Hub endpoint, `ws://host:port/ws`.
    pub url: String,
    /// First backoff step.
    pub base_delay: Duration,
    /// Backoff ceiling before jitter.
    pub max_delay: Duration,
    /// Upper bound of the random delay added to each backoff.
    pub jitter_range: Duration,
    /// Interval between client pings while open.
    pub ping_interval: Duration,
    /// How long a ping may stay unanswered.
    pub pong_timeout: Duration,
    /// Reconnects allowed before giving up.
    pub max_attempts: u32,
}

impl ClientConfig {
    /// Configuration for `url` with default timings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            jitter_range: Duration::from_secs(2),
            ping_interval: Duration::from_secs(25),
            pong_timeout: Duration::from_secs(60),
            max_attempts: 10,
        }
    }

    /// Sets the first backoff step.
    #[must_use]
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    /// Sets the backoff ceiling.
    #[must_use]
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the jitter bound; zero disables jitter.
    #[must_use]
    pub fn jitter_range(mut self, range: Duration) -> Self {
        self.jitter_range = range;
        self
    }

    /// Sets the ping interval.
    #[must_use]
    pub fn ping_interval(mut self, interval: Duration) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Sets the pong timeout.
    #[must_use]
    pub fn pong_timeout(mut self, timeout: Duration) -> Self {
        self.pong_timeout = timeout;
        self
    }

    /// Sets the reconnect budget.
    #[must_use]
    pub fn max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Backoff before jitter: `min(max_delay, base_delay * 2^attempt)`.
    #[must_use]
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }

    /// Checks that the endpoint is a websocket URL.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidUrl` for unparsable URLs or other schemes.
    pub fn validate(&self) -> Result<(), ClientError> {
        let url = url::Url::parse(&self.url)
            .map_err(|e| ClientError::InvalidUrl(format!("{}: {e}", self.url)))?;
        match url.scheme() {
            "ws" | "wss" => Ok(()),
            other => Err(ClientError::InvalidUrl(format!(
                "{}: unsupported scheme '{other}'",
                self.url
            ))),
        }
    }
}
