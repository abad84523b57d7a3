//! Handlers for the messaging session.

use axum::{
    extract::{Json, State},
    http::StatusCode,
};
use std::sync::Arc;
use tracing::info;

use crate::api::error::ApiError;
use crate::api::whatsapp::types::{ActionResponse, StatusResponse};
use crate::session::{ProviderEvent, RefreshOutcome};
use crate::state::AppState;

/// GET /api/whatsapp/status
pub async fn session_status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(state.sessions.status().into())
}

/// POST /api/whatsapp/refresh
///
/// Requests a new pairing code unless the session is already connected.
pub async fn refresh_session(
    State(state): State<AppState>,
) -> Result<Json<ActionResponse>, ApiError> {
    let message = match state.sessions.refresh().await? {
        RefreshOutcome::AlreadyConnected => "WhatsApp already connected",
        RefreshOutcome::PairingRequested => "Pairing requested, a QR code will follow",
    };
    Ok(Json(ActionResponse::ok(message)))
}

/// POST /api/whatsapp/logout
///
/// The state changes once the provider confirms through the webhook.
pub async fn logout_session(
    State(state): State<AppState>,
) -> Result<Json<ActionResponse>, ApiError> {
    state.sessions.logout().await?;
    Ok(Json(ActionResponse::ok("Logout requested")))
}

/// POST /api/whatsapp/events
///
/// Webhook called by the messaging gateway.
pub async fn provider_event(
    State(state): State<AppState>,
    Json(event): Json<ProviderEvent>,
) -> Result<StatusCode, ApiError> {
    let session = state
        .messaging
        .as_ref()
        .map(Arc::clone)
        .ok_or(ApiError::GatewayNotConfigured)?;
    info!(?event, "Provider event received");
    event.apply(&state.sessions, session).await;
    Ok(StatusCode::NO_CONTENT)
}
