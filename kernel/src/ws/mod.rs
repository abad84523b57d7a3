//! Real-time hub: upgraded sockets, keepalive and broadcast.

pub mod connection;
pub mod handler;
pub mod hub;
pub mod registry;
pub mod types;

pub use hub::{Broadcaster, EnvelopeHandler, Hub};
pub use registry::{ConnectionRegistry, EnvelopeSink};
pub use types::{kinds, BroadcastReport, ClientId, Envelope, InboundKind, WsError};
