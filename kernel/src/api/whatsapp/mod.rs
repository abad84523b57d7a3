//! REST API endpoints for the WhatsApp session.

pub mod handlers;
pub mod types;

pub use handlers::{logout_session, provider_event, refresh_session, session_status};
pub use types::{ActionResponse, StatusResponse};
