//! Shared test utilities for integration tests.
//!
//! Boots the kernel's full router on an ephemeral port, backed by an
//! in-memory directory and a mocked messaging gateway.

#![allow(dead_code)]

use anyhow::Result;
use serde_json::{Value, json};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tally_client::{ClientConfig, ClientEvent, Envelope};
use tally_kernel::directory::SqlDirectory;
use tally_kernel::infrastructure::config::{GatewaySettings, HubSettings};
use tally_kernel::infrastructure::server::app_router;
use tally_kernel::notify::Unthrottled;
use tally_kernel::session::GatewayClient;
use tally_kernel::state::{AppState, AppStateBuilder};
use tally_kernel::ws::{ConnectionRegistry, Hub};
use tokio::net::TcpListener;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// How long a test waits for any single event.
pub const WAIT: Duration = Duration::from_secs(5);

/// Integration test context providing shared resources.
pub struct IntegrationTestContext {
    /// Application state behind the server
    pub state: AppState,
    /// Address the server listens on
    pub addr: SocketAddr,
    /// Mocked messaging gateway
    pub gateway: MockServer,
}

impl IntegrationTestContext {
    /// Starts a server whose gateway accepts every request.
    pub async fn new() -> Result<Self> {
        Self::with_hub(HubSettings::default()).await
    }

    /// Starts a server with custom hub timings.
    pub async fn with_hub(settings: HubSettings) -> Result<Self> {
        let gateway = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&gateway)
            .await;

        let directory = SqlDirectory::connect("sqlite::memory:", 1).await?;
        directory.bootstrap_schema().await?;
        seed_users(&directory).await?;

        let client = Arc::new(GatewayClient::new(&GatewaySettings {
            base_url: gateway.uri(),
            api_token: None,
            request_timeout_secs: 5,
        })?);
        let hub = Hub::new(Arc::new(ConnectionRegistry::new()), &settings);
        let state = AppStateBuilder::new(hub, Arc::new(directory))
            .rate_gate(Arc::new(Unthrottled))
            .messaging(client.clone(), client)
            .build();

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let router = app_router(state.clone(), None);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                eprintln!("test server failed: {e}");
            }
        });

        Ok(Self {
            state,
            addr,
            gateway,
        })
    }

    /// Websocket URL of the hub.
    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Client configuration with short backoff and no jitter.
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.ws_url())
            .base_delay(Duration::from_millis(20))
            .max_delay(Duration::from_millis(200))
            .jitter_range(Duration::ZERO)
    }

    /// POSTs JSON to a kernel route.
    pub async fn post(&self, route: &str, body: Value) -> Result<reqwest::Response> {
        Ok(reqwest::Client::new()
            .post(format!("http://{}{route}", self.addr))
            .json(&body)
            .send()
            .await?)
    }

    /// Marks the messaging session connected through the webhook.
    pub async fn connect_session(&self) -> Result<()> {
        let response = self
            .post("/api/whatsapp/events", json!({ "event": "connected" }))
            .await?;
        anyhow::ensure!(response.status() == 204, "webhook returned {}", response.status());
        Ok(())
    }

    /// Gateway request paths seen so far.
    pub async fn gateway_paths(&self) -> Vec<String> {
        self.gateway
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .map(|r| r.url.path().to_string())
            .collect()
    }
}

async fn seed_users(directory: &SqlDirectory) -> Result<()> {
    sqlx::query(
        "INSERT INTO users (id, name, phone, balance) VALUES \
         (1, 'Ani', '081234567890', 250000), \
         (2, 'Budi', '', 0), \
         (3, 'Citra', '+62 812 0000 1111', 75000)",
    )
    .execute(directory.pool())
    .await?;
    sqlx::query(
        "INSERT INTO transactions (user_id, kind, amount, note, created_at) VALUES \
         (1, 'deposit', 50000, NULL, '2024-08-02 09:00:00'), \
         (3, 'withdrawal', 10000, 'books', '2024-08-20 10:30:00')",
    )
    .execute(directory.pool())
    .await?;
    Ok(())
}

/// Waits for the next client event.
pub async fn next_event(events: &mut UnboundedReceiver<ClientEvent>) -> Result<ClientEvent> {
    timeout(WAIT, events.recv())
        .await?
        .ok_or_else(|| anyhow::anyhow!("event stream ended"))
}

/// Waits for the next business message of `kind`, skipping others.
pub async fn next_message(
    events: &mut UnboundedReceiver<ClientEvent>,
    kind: &str,
) -> Result<Envelope> {
    loop {
        if let ClientEvent::Message(envelope) = next_event(events).await? {
            if envelope.kind == kind {
                return Ok(envelope);
            }
        }
    }
}

/// Polls `check` until it holds or `WAIT` elapses.
pub async fn eventually(mut check: impl FnMut() -> bool) -> Result<()> {
    let deadline = tokio::time::Instant::now() + WAIT;
    while !check() {
        anyhow::ensure!(tokio::time::Instant::now() < deadline, "condition not met in time");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    Ok(())
}
