use crate::api;
use crate::infrastructure::config::{BindAddress, Settings};
use crate::state::AppState;
use crate::ws::handler::{handle_ws_upgrade, WS_PATH};
use axum::{extract::State, routing::get, Json, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{json, Value};
use std::future::Future;

async fn health_check() -> &'static str {
    "OK"
}

async fn readiness(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ready",
        "connections": state.hub.connection_count(),
        "session": state.sessions.state().to_string(),
    }))
}

/// Builds the full router: REST API, websocket upgrade and health checks.
///
/// `/metrics` is mounted only when a Prometheus handle is supplied.
pub fn app_router(state: AppState, metrics: Option<PrometheusHandle>) -> Router {
    let mut app = api::routes()
        .route(WS_PATH, get(handle_ws_upgrade))
        .route("/health/live", get(health_check))
        .route("/health/ready", get(readiness))
        .with_state(state);

    if let Some(handle) = metrics {
        app = app.route("/metrics", get(move || std::future::ready(handle.render())));
    }
    app
}

/// Runs the HTTP server with WebSocket support until `shutdown` resolves.
///
/// The hub keepalive runs for as long as the server does.
///
/// # Errors
///
/// Returns an error if the server fails to start or encounters an error while running.
pub async fn run_server(
    config: &Settings,
    state: AppState,
    metrics: Option<PrometheusHandle>,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let keepalive = state.hub.spawn_keepalive();
    let app = app_router(state, metrics);

    let addr = BindAddress::from(&config.server).to_socket_addr()?;
    tracing::info!("Tally kernel listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await;

    keepalive.abort();
    served?;
    Ok(())
}
