//! REST API for the Tally kernel.
//!
//! Notification dispatch, messaging session control, the provider webhook and
//! device ingress. Real-time updates go through the hub at `/ws`.

pub mod error;
pub mod ingress;
pub mod notifications;
pub mod routes;
pub mod whatsapp;

pub use error::ApiError;
pub use routes::routes;
