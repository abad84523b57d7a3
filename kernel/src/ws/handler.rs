//! WebSocket upgrade handler.

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::{info, warn};

use crate::ws::connection::Connection;
use crate::ws::hub::Hub;
use crate::ws::types::WsError;

/// Path of the upgrade endpoint.
pub const WS_PATH: &str = "/ws";

/// Handles WebSocket upgrade requests.
///
/// A request that is not a valid upgrade is answered with a protocol error.
/// The handshake is not authenticated.
pub async fn handle_ws_upgrade(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(hub): State<Hub>,
) -> Response {
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            let error = WsError::Protocol(rejection.body_text());
            warn!(error = %error, "Rejected websocket handshake");
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": error.to_string(), "error_type": "protocol" })),
            )
                .into_response();
        }
    };

    info!("WebSocket upgrade requested");
    ws.on_upgrade(move |socket| async move {
        let connection = Connection::accept(socket, hub).await;
        if let Err(e) = connection.run().await {
            tracing::debug!(error = %e, "WebSocket connection ended with error");
        }
    })
}
