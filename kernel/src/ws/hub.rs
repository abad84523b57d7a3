//! Connection hub: registration, keepalive, inbound routing and broadcast.

use async_trait::async_trait;
use futures_util::future::join_all;
use parking_lot::RwLock;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::infrastructure::config::HubSettings;
use crate::ws::registry::{ConnectionRegistry, EnvelopeSink};
use crate::ws::types::{kinds, BroadcastReport, ClientId, Envelope, InboundKind, WsError};

/// Receives recognized client commands (e.g. `refresh_whatsapp`).
#[async_trait]
pub trait EnvelopeHandler: Send + Sync {
    /// Handles one command from `client_id`.
    async fn handle(&self, client_id: ClientId, envelope: Envelope);
}

/// Anything that can fan an envelope out to live clients.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Publishes an envelope to every live connection.
    async fn publish(&self, envelope: Envelope) -> BroadcastReport;
}

struct HubInner {
    registry: Arc<ConnectionRegistry>,
    handler: RwLock<Option<Arc<dyn EnvelopeHandler>>>,
    keepalive_interval: Duration,
    write_timeout: Duration,
}

/// The server side of the real-time channel.
///
/// Cheap to clone; all clones share one registry.
#[derive(Clone)]
pub struct Hub {
    inner: Arc<HubInner>,
}

impl Hub {
    /// Creates a hub over an injected registry.
    #[must_use]
    pub fn new(registry: Arc<ConnectionRegistry>, settings: &HubSettings) -> Self {
        Self {
            inner: Arc::new(HubInner {
                registry,
                handler: RwLock::new(None),
                keepalive_interval: settings.keepalive_interval(),
                write_timeout: settings.write_timeout(),
            }),
        }
    }

    /// Creates a hub with its own registry and default settings.
    #[must_use]
    pub fn standalone() -> Self {
        Self::new(Arc::new(ConnectionRegistry::new()), &HubSettings::default())
    }

    /// Installs the handler for client commands.
    pub fn set_handler(&self, handler: Arc<dyn EnvelopeHandler>) {
        *self.inner.handler.write() = Some(handler);
    }

    /// Returns the registry backing this hub.
    #[must_use]
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.inner.registry
    }

    /// Number of live connections.
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Registers a freshly upgraded connection and greets it.
    ///
    /// The hello carries the new id and the live count; everybody else learns
    /// the new count through `connection_status`.
    pub async fn register(&self, sink: Arc<dyn EnvelopeSink>) -> ClientId {
        let client_id = ClientId::generate();
        let total = self.inner.registry.insert(client_id, Arc::clone(&sink));
        metrics::gauge!("tally_ws_connections").set(total as f64);
        info!(client_id = %client_id, total_connections = total, "Connection registered");

        let hello = Envelope::new(
            kinds::CONNECTED,
            json!({
                "message": "Connected to Tally real-time hub",
                "client_id": client_id.to_string(),
                "total_connections": total,
            }),
        );
        if let Err(e) = self.write(sink.as_ref(), &hello).await {
            warn!(client_id = %client_id, error = %e, "Hello failed, dropping connection");
            // Announces the corrected count.
            self.unregister(&client_id).await;
            return client_id;
        }

        self.announce_count().await;
        client_id
    }

    /// Removes a connection after its read loop ended.
    pub async fn unregister(&self, client_id: &ClientId) {
        if self.inner.registry.remove(client_id) {
            let total = self.inner.registry.len();
            metrics::gauge!("tally_ws_connections").set(total as f64);
            info!(client_id = %client_id, total_connections = total, "Connection unregistered");
            self.announce_count().await;
        }
    }

    /// Builds an envelope and writes it to every registered connection.
    pub async fn broadcast(&self, kind: &str, payload: Value) -> BroadcastReport {
        self.publish(Envelope::new(kind, payload)).await
    }

    /// Broadcasts a `device_status` change.
    pub async fn notify_device_status(&self, status: &str) -> BroadcastReport {
        self.broadcast(kinds::DEVICE_STATUS, json!({ "status": status }))
            .await
    }

    /// Broadcasts an `attendance_event`; `user` carries the looked-up profile if any.
    pub async fn notify_attendance(&self, user_id: &str, user: Option<Value>) -> BroadcastReport {
        let mut payload = json!({ "user_id": user_id });
        if let Some(user) = user {
            payload["user"] = user;
        }
        self.broadcast(kinds::ATTENDANCE_EVENT, payload).await
    }

    /// Writes one envelope to a single connection.
    ///
    /// # Errors
    ///
    /// Returns `WsError::Closed` if the connection is unknown, or the write
    /// error; a failed write also removes the connection.
    pub async fn send_to(&self, client_id: &ClientId, envelope: &Envelope) -> Result<(), WsError> {
        let sink = self.inner.registry.sink(client_id).ok_or(WsError::Closed)?;
        if let Err(e) = self.write(sink.as_ref(), envelope).await {
            self.unregister(client_id).await;
            return Err(e);
        }
        Ok(())
    }

    /// Sends one `ping` to every connection; failed writes are removed.
    pub async fn keepalive_tick(&self) -> BroadcastReport {
        let report = self.fan_out(&Envelope::ping()).await;
        if report.removed > 0 {
            debug!(removed = report.removed, "Keepalive pruned dead connections");
            self.announce_count().await;
        }
        report
    }

    /// Starts the shared keepalive ticker.
    pub fn spawn_keepalive(&self) -> JoinHandle<()> {
        let hub = self.clone();
        let period = self.inner.keepalive_interval;
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                hub.keepalive_tick().await;
            }
        })
    }

    /// Decodes and routes one inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns `WsError::Protocol` if the frame is not an envelope; the caller
    /// drops the connection.
    pub async fn handle_inbound(&self, client_id: ClientId, text: &str) -> Result<(), WsError> {
        let envelope = Envelope::decode(text)?;
        match envelope.inbound_kind() {
            InboundKind::Liveness => {
                self.inner.registry.touch(&client_id);
            }
            InboundKind::Ping => {
                self.inner.registry.touch(&client_id);
                // A failed pong already unregistered the connection.
                let _ = self.send_to(&client_id, &Envelope::pong()).await;
            }
            InboundKind::Command => {
                self.inner.registry.touch(&client_id);
                let handler = self.inner.handler.read().clone();
                match handler {
                    Some(handler) => handler.handle(client_id, envelope).await,
                    None => debug!(kind = %envelope.kind, "No command handler installed"),
                }
            }
            InboundKind::Unknown => {
                debug!(client_id = %client_id, kind = %envelope.kind, "Ignoring unrecognized envelope");
            }
        }
        Ok(())
    }

    async fn announce_count(&self) {
        let envelope = Envelope::new(
            kinds::CONNECTION_STATUS,
            json!({ "total_connections": self.inner.registry.len() }),
        );
        // Survivors of this round learn the final count on the next change.
        self.fan_out(&envelope).await;
    }

    /// Snapshot, write outside the lock, then prune failures in a second pass.
    async fn fan_out(&self, envelope: &Envelope) -> BroadcastReport {
        let targets = self.inner.registry.snapshot();
        if targets.is_empty() {
            return BroadcastReport::default();
        }

        let writes = targets.iter().map(|(id, sink)| async move {
            match self.write(sink.as_ref(), envelope).await {
                Ok(()) => None,
                Err(e) => {
                    warn!(client_id = %id, kind = %envelope.kind, error = %e, "Write failed, removing connection");
                    Some(*id)
                }
            }
        });
        let failed: Vec<ClientId> = join_all(writes).await.into_iter().flatten().collect();

        let removed = self.inner.registry.remove_many(&failed);
        if removed > 0 {
            metrics::counter!("tally_ws_connections_pruned_total").increment(removed as u64);
            metrics::gauge!("tally_ws_connections").set(self.inner.registry.len() as f64);
        }
        BroadcastReport {
            delivered: targets.len() - failed.len(),
            removed,
        }
    }

    async fn write(&self, sink: &dyn EnvelopeSink, envelope: &Envelope) -> Result<(), WsError> {
        let text = envelope.encode()?;
        match timeout(self.inner.write_timeout, sink.send_text(text)).await {
            Ok(result) => result,
            Err(_) => Err(WsError::WriteTimeout(self.inner.write_timeout)),
        }
    }
}

#[async_trait]
impl Broadcaster for Hub {
    async fn publish(&self, envelope: Envelope) -> BroadcastReport {
        let report = self.fan_out(&envelope).await;
        metrics::counter!("tally_ws_broadcasts_total").increment(1);
        debug!(kind = %envelope.kind, delivered = report.delivered, removed = report.removed, "Broadcast sent");
        if report.removed > 0 {
            self.announce_count().await;
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ws::registry::testing::RecordingSink;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingHandler {
        seen: Mutex<Vec<(ClientId, String)>>,
    }

    #[async_trait]
    impl EnvelopeHandler for RecordingHandler {
        async fn handle(&self, client_id: ClientId, envelope: Envelope) {
            self.seen.lock().push((client_id, envelope.kind));
        }
    }

    #[tokio::test]
    async fn register_sends_hello_with_id_and_count() {
        let hub = Hub::standalone();
        let sink = RecordingSink::healthy();
        let id = hub.register(sink.clone()).await;

        let frames = sink.frames.lock().clone();
        let hello = Envelope::decode(&frames[0]).unwrap();
        assert_eq!(hello.kind, kinds::CONNECTED);
        assert_eq!(hello.payload["client_id"], id.to_string());
        assert_eq!(hello.payload["total_connections"], 1);
        assert_eq!(hub.connection_count(), 1);
    }

    #[tokio::test]
    async fn failed_hello_unregisters_and_announces_the_count() {
        let hub = Hub::standalone();
        let alive = RecordingSink::healthy();
        hub.register(alive.clone()).await;

        let dead = RecordingSink::dead();
        let id = hub.register(dead.clone()).await;

        assert_eq!(hub.connection_count(), 1);
        assert!(!hub.registry().contains(&id));
        assert!(dead.is_closed());
        let last = alive.frames.lock().last().cloned().unwrap();
        let last = Envelope::decode(&last).unwrap();
        assert_eq!(last.kind, kinds::CONNECTION_STATUS);
        assert_eq!(last.payload["total_connections"], 1);
    }

    #[tokio::test]
    async fn broadcast_with_dead_connection_shrinks_registry() {
        let hub = Hub::standalone();
        let alive_a = RecordingSink::healthy();
        let alive_b = RecordingSink::healthy();
        let dead = RecordingSink::healthy();
        hub.register(alive_a.clone()).await;
        hub.register(alive_b.clone()).await;
        hub.register(dead.clone()).await;
        assert_eq!(hub.connection_count(), 3);

        dead.fail_writes.store(true, std::sync::atomic::Ordering::SeqCst);
        let report = hub
            .broadcast(kinds::WHATSAPP_STATUS, json!({ "status": "connected" }))
            .await;

        assert_eq!(report, BroadcastReport { delivered: 2, removed: 1 });
        assert_eq!(hub.connection_count(), 2);
        for sink in [&alive_a, &alive_b] {
            let statuses = sink
                .kinds()
                .into_iter()
                .filter(|k| k == kinds::WHATSAPP_STATUS)
                .count();
            assert_eq!(statuses, 1);
        }
        assert!(dead.is_closed());
    }

    #[tokio::test]
    async fn k_failures_among_n_leave_n_minus_k() {
        for (n, k) in [(1, 1), (4, 0), (5, 2), (6, 6)] {
            let hub = Hub::standalone();
            let mut sinks = Vec::new();
            for _ in 0..n {
                let sink = RecordingSink::healthy();
                hub.register(sink.clone()).await;
                sinks.push(sink);
            }
            for sink in sinks.iter().take(k) {
                sink.fail_writes.store(true, std::sync::atomic::Ordering::SeqCst);
            }

            let report = hub.broadcast(kinds::DEVICE_STATUS, json!({"status": "online"})).await;
            assert_eq!(report.removed, k);
            assert_eq!(hub.connection_count(), n - k);
        }
    }

    #[tokio::test]
    async fn keepalive_removes_only_failed_writes() {
        let hub = Hub::standalone();
        let alive = RecordingSink::healthy();
        let dead = RecordingSink::healthy();
        hub.register(alive.clone()).await;
        hub.register(dead.clone()).await;
        dead.fail_writes.store(true, std::sync::atomic::Ordering::SeqCst);

        let report = hub.keepalive_tick().await;
        assert_eq!(report.removed, 1);
        assert_eq!(hub.connection_count(), 1);
        assert!(alive.kinds().contains(&kinds::PING.to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn keepalive_ticker_pings_every_interval() {
        let hub = Hub::standalone();
        let sink = RecordingSink::healthy();
        hub.register(sink.clone()).await;
        let ticker = hub.spawn_keepalive();

        tokio::time::sleep(Duration::from_secs(61)).await;
        let pings = sink.kinds().into_iter().filter(|k| k == kinds::PING).count();
        assert_eq!(pings, 2);
        ticker.abort();
    }

    #[tokio::test]
    async fn inbound_routing() {
        let hub = Hub::standalone();
        let handler = Arc::new(RecordingHandler::default());
        hub.set_handler(handler.clone());
        let sink = RecordingSink::healthy();
        let id = hub.register(sink.clone()).await;

        hub.handle_inbound(id, r#"{"type":"pong"}"#).await.unwrap();
        hub.handle_inbound(id, r#"{"type":"mystery","payload":{}}"#).await.unwrap();
        hub.handle_inbound(id, r#"{"type":"refresh_whatsapp"}"#).await.unwrap();
        hub.handle_inbound(id, r#"{"type":"ping"}"#).await.unwrap();

        let seen = handler.seen.lock().clone();
        assert_eq!(seen, vec![(id, kinds::REFRESH_WHATSAPP.to_string())]);
        assert!(sink.kinds().contains(&kinds::PONG.to_string()));
        assert!(hub.handle_inbound(id, "{oops").await.is_err());
    }

    #[tokio::test]
    async fn independent_hubs_do_not_share_connections() {
        let first = Hub::standalone();
        let second = Hub::standalone();
        first.register(RecordingSink::healthy()).await;
        assert_eq!(first.connection_count(), 1);
        assert_eq!(second.connection_count(), 0);
    }

    #[tokio::test]
    async fn send_to_unknown_connection_is_closed() {
        let hub = Hub::standalone();
        let err = hub.send_to(&ClientId::generate(), &Envelope::ping()).await;
        assert!(matches!(err, Err(WsError::Closed)));
    }
}
