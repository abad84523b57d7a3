//! Tally Kernel - real-time hub and messaging backend.
//!
//! This crate provides the server side of the Tally system: a WebSocket hub
//! with keepalive and broadcast, the lifecycle of the external WhatsApp
//! session, and bulk notification dispatch over that session.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// REST API handlers and routes.
pub mod api;
/// Read access to users and their transactions.
pub mod directory;
/// Infrastructure components (config, server, telemetry).
pub mod infrastructure;
/// Bulk notification dispatch.
pub mod notify;
/// External messaging session lifecycle.
pub mod session;
/// Shared application state.
pub mod state;
/// WebSocket hub for real-time updates.
pub mod ws;
