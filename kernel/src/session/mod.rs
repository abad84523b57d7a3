//! External messaging session: lifecycle state machine and provider seams.

pub mod commands;
pub mod events;
pub mod gateway;
pub mod lifecycle;
pub mod provider;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;

pub use commands::SessionCommands;
pub use events::ProviderEvent;
pub use gateway::GatewayClient;
pub use lifecycle::{RefreshOutcome, SessionLifecycle};
pub use provider::{ClientInfo, Document, MessagingSession, SessionError, SessionProvider};
pub use state::{SessionState, SessionStatus};
