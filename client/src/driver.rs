use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, timeout, Instant};
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::envelope::Envelope;
use crate::machine::{ClientEvent, ClientMachine, ClientState, Effect, Event};
use crate::ClientError;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type ConnectFuture = Pin<Box<dyn Future<Output = Result<WsStream, String>> + Send>>;

const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

enum Command {
    Send(String),
    Disconnect(bool),
}

#[derive(Debug, Clone, Copy)]
struct Snapshot {
    state: ClientState,
    attempt: u32,
    last_pong: Option<Instant>,
    failed: bool,
}

/// Handle to a running client task.
///
/// Dropping the handle closes the client permanently.
pub struct ReconnectingClient {
    commands: mpsc::UnboundedSender<Command>,
    snapshot: Arc<Mutex<Snapshot>>,
    task: JoinHandle<()>,
}

impl ReconnectingClient {
    /// Starts connecting immediately and returns the handle plus the stream
    /// of user notifications.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::InvalidUrl` if the endpoint is not a websocket URL.
    pub fn spawn(
        config: ClientConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ClientEvent>), ClientError> {
        config.validate()?;
        let (commands, command_rx) = mpsc::unbounded_channel();
        let (events_tx, events) = mpsc::unbounded_channel();
        let snapshot = Arc::new(Mutex::new(Snapshot {
            state: ClientState::Idle,
            attempt: 0,
            last_pong: None,
            failed: false,
        }));

        let driver = Driver {
            machine: ClientMachine::new(config.clone()),
            config,
            commands: command_rx,
            events: events_tx,
            snapshot: Arc::clone(&snapshot),
            connecting: None,
            writer: None,
            reader: None,
            ping_at: None,
            pong_deadline: None,
            reconnect_at: None,
        };
        let task = tokio::spawn(driver.run());

        Ok((
            Self {
                commands,
                snapshot,
                task,
            },
            events,
        ))
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ClientState {
        self.snapshot.lock().state
    }

    /// Consecutive failed attempts since the last successful open.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.snapshot.lock().attempt
    }

    /// When the last `pong` or `heartbeat` arrived.
    #[must_use]
    pub fn last_pong_received(&self) -> Option<Instant> {
        self.snapshot.lock().last_pong
    }

    /// `true` after the reconnect budget ran out.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.snapshot.lock().failed
    }

    /// Queues `envelope` for the open transport.
    ///
    /// Returns `false` without queuing when the client is not `Open`.
    pub fn send(&self, envelope: &Envelope) -> bool {
        if self.state() != ClientState::Open {
            return false;
        }
        self.commands.send(Command::Send(envelope.to_text())).is_ok()
    }

    /// Closes the transport. `permanent` stops the client for good, otherwise
    /// it reconnects after backoff.
    pub fn disconnect(&self, permanent: bool) {
        // A finished task has nothing left to close.
        let _ = self.commands.send(Command::Disconnect(permanent));
    }

    /// Waits until the client reaches its terminal state.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            warn!(error = %e, "Client task ended abnormally");
        }
    }
}

struct Driver {
    machine: ClientMachine,
    config: ClientConfig,
    commands: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<ClientEvent>,
    snapshot: Arc<Mutex<Snapshot>>,
    connecting: Option<ConnectFuture>,
    writer: Option<SplitSink<WsStream, Message>>,
    reader: Option<SplitStream<WsStream>>,
    ping_at: Option<Instant>,
    pong_deadline: Option<Instant>,
    reconnect_at: Option<Instant>,
}

impl Driver {
    async fn run(mut self) {
        let mut pending = VecDeque::from([Event::Start]);
        loop {
            while let Some(event) = pending.pop_front() {
                let effects = self.machine.handle(event);
                // Observers see the new state before any notification goes out.
                self.publish();
                for effect in effects {
                    if let Some(follow_up) = self.apply(effect).await {
                        pending.push_back(follow_up);
                    }
                }
            }
            if self.machine.is_terminal() {
                break;
            }
            if let Some(event) = self.next_event().await {
                pending.push_back(event);
            }
        }
        debug!("Client task finished");
    }

    async fn next_event(&mut self) -> Option<Event> {
        tokio::select! {
            result = maybe(self.connecting.as_mut()) => {
                self.connecting = None;
                match result {
                    Ok(stream) => {
                        let (writer, reader) = stream.split();
                        self.writer = Some(writer);
                        self.reader = Some(reader);
                        Some(Event::Opened)
                    }
                    Err(reason) => Some(Event::ConnectFailed(reason)),
                }
            }
            frame = next_frame(self.reader.as_mut()) => match frame {
                Some(Ok(Message::Text(text))) => Some(Event::Frame {
                    text: text.as_str().to_owned(),
                    at: Instant::now(),
                }),
                Some(Ok(Message::Close(_))) | None => {
                    self.drop_transport();
                    Some(Event::TransportClosed)
                }
                Some(Err(e)) => {
                    debug!(error = %e, "Transport read failed");
                    self.drop_transport();
                    Some(Event::TransportClosed)
                }
                Some(Ok(_)) => None,
            },
            () = sleep_until_opt(self.ping_at) => {
                self.ping_at = Some(Instant::now() + self.config.ping_interval);
                Some(Event::PingDue)
            }
            () = sleep_until_opt(self.pong_deadline) => {
                self.pong_deadline = None;
                Some(Event::PongDeadline)
            }
            () = sleep_until_opt(self.reconnect_at) => {
                self.reconnect_at = None;
                Some(Event::ReconnectDue)
            }
            command = self.commands.recv() => match command {
                Some(Command::Send(text)) => self.write(text).await,
                Some(Command::Disconnect(permanent)) => Some(Event::Disconnect { permanent }),
                None => Some(Event::Disconnect { permanent: true }),
            },
        }
    }

    async fn apply(&mut self, effect: Effect) -> Option<Event> {
        match effect {
            Effect::Connect => {
                let url = self.config.url.clone();
                self.connecting = Some(Box::pin(async move {
                    connect_async(url.as_str())
                        .await
                        .map(|(stream, _)| stream)
                        .map_err(|e| e.to_string())
                }));
            }
            Effect::Send(text) => return self.write(text).await,
            Effect::StartPing => self.ping_at = Some(Instant::now() + self.config.ping_interval),
            Effect::StopPing => self.ping_at = None,
            Effect::ArmWatchdog => {
                self.pong_deadline = Some(Instant::now() + self.config.pong_timeout);
            }
            Effect::DisarmWatchdog => self.pong_deadline = None,
            Effect::CloseTransport => {
                self.connecting = None;
                if let Some(mut writer) = self.writer.take() {
                    if timeout(CLOSE_TIMEOUT, writer.close()).await.is_err() {
                        debug!("Close frame timed out");
                    }
                }
                self.reader = None;
            }
            Effect::ScheduleReconnect(delay) => self.reconnect_at = Some(Instant::now() + delay),
            Effect::CancelReconnect => self.reconnect_at = None,
            Effect::Notify(event) => {
                // The user may have dropped the receiver; the client keeps going.
                let _ = self.events.send(event);
            }
        }
        None
    }

    async fn write(&mut self, text: String) -> Option<Event> {
        let writer = self.writer.as_mut()?;
        if let Err(e) = writer.send(Message::Text(text.into())).await {
            debug!(error = %e, "Transport write failed");
            self.drop_transport();
            return Some(Event::TransportClosed);
        }
        None
    }

    fn drop_transport(&mut self) {
        self.writer = None;
        self.reader = None;
    }

    fn publish(&self) {
        *self.snapshot.lock() = Snapshot {
            state: self.machine.state(),
            attempt: self.machine.attempt(),
            last_pong: self.machine.last_pong_received(),
            failed: self.machine.is_failed(),
        };
    }
}

async fn maybe<F: Future + Unpin>(future: Option<&mut F>) -> F::Output {
    match future {
        Some(future) => future.await,
        None => std::future::pending().await,
    }
}

async fn next_frame(
    reader: Option<&mut SplitStream<WsStream>>,
) -> Option<Result<Message, tokio_tungstenite::tungstenite::Error>> {
    match reader {
        Some(reader) => reader.next().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
