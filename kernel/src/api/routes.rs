//! Route table for the REST API.

use axum::{
    routing::{get, post},
    Router,
};

use crate::api::{ingress, notifications, whatsapp};
use crate::state::AppState;

/// REST routes, mounted under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/notifications/whatsapp",
            post(notifications::send_whatsapp_notifications),
        )
        .route("/api/whatsapp/status", get(whatsapp::session_status))
        .route("/api/whatsapp/refresh", post(whatsapp::refresh_session))
        .route("/api/whatsapp/logout", post(whatsapp::logout_session))
        .route("/api/whatsapp/events", post(whatsapp::provider_event))
        .route("/api/devices/status", post(ingress::device_status))
        .route("/api/attendance", post(ingress::attendance))
}
