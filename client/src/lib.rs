//! Tally Client - reconnecting connection to the Tally real-time hub.
//!
//! One [`ReconnectingClient`] represents a logical connection that survives
//! many physical ones. Drops are retried with exponential backoff plus
//! jitter; half-open sockets are detected by a pong watchdog.
//!
//! The reconnect rules live in [`ClientMachine`], a pure transition function
//! that can be exercised without a socket. The client task only owns the
//! transport and the timers and feeds their outcomes back into the machine.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Reconnect and keepalive configuration.
pub mod config;
/// Tokio task that owns the socket and the timers.
pub mod driver;
/// Wire envelope.
pub mod envelope;
/// Pure reconnect state machine.
pub mod machine;

pub use config::ClientConfig;
pub use driver::ReconnectingClient;
pub use envelope::Envelope;
pub use machine::{ClientEvent, ClientMachine, ClientState, Effect, Event};

/// Errors raised before the client task starts.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The endpoint is not a `ws://` or `wss://` URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}
