//! Pacing between consecutive sends.

use async_trait::async_trait;
use std::time::Duration;

/// Awaited by the dispatcher between two sends.
#[async_trait]
pub trait RateGate: Send + Sync {
    /// Returns when the next send may start.
    async fn wait(&self);
}

/// Sleeps a fixed interval on the tokio clock.
#[derive(Debug, Clone, Copy)]
pub struct FixedIntervalGate {
    interval: Duration,
}

impl FixedIntervalGate {
    /// Gate pausing `interval` between sends.
    #[must_use]
    pub const fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// The configured pause.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }
}

#[async_trait]
impl RateGate for FixedIntervalGate {
    async fn wait(&self) {
        if !self.interval.is_zero() {
            tokio::time::sleep(self.interval).await;
        }
    }
}

/// No pacing at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct Unthrottled;

#[async_trait]
impl RateGate for Unthrottled {
    async fn wait(&self) {}
}
