//! Reconnect rules as a pure `(state, event) -> effects` function.
//!
//! The machine never touches a socket or a clock. Time-dependent inputs
//! (timer expiry, frame arrival instants) come in as events, and everything
//! the outside world must do comes back as [`Effect`]s.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::envelope::{kinds, Envelope};

/// Connection state of the logical client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Created, not started.
    Idle,
    /// A transport is being opened.
    Connecting,
    /// Transport open; `send` is accepted.
    Open,
    /// Transport gone, a reconnect is scheduled.
    Closing,
    /// Terminal: disconnected on purpose or out of attempts.
    Closed,
}

/// Inputs to the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The client was spawned.
    Start,
    /// The transport handshake completed.
    Opened,
    /// The transport could not be opened.
    ConnectFailed(String),
    /// A text frame arrived.
    Frame {
        /// Raw text.
        text: String,
        /// Arrival instant.
        at: Instant,
    },
    /// The ping interval elapsed.
    PingDue,
    /// The pong watchdog fired.
    PongDeadline,
    /// The transport closed or failed on its own.
    TransportClosed,
    /// The backoff delay elapsed.
    ReconnectDue,
    /// The user asked to disconnect.
    Disconnect {
        /// `true` stops for good; `false` reconnects after backoff.
        permanent: bool,
    },
}

/// Work the driver must perform.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Open a new transport.
    Connect,
    /// Write a text frame.
    Send(String),
    /// Start the ping interval.
    StartPing,
    /// Stop the ping interval.
    StopPing,
    /// Arm the pong watchdog.
    ArmWatchdog,
    /// Disarm the pong watchdog.
    DisarmWatchdog,
    /// Close the current transport.
    CloseTransport,
    /// Fire `ReconnectDue` after the delay.
    ScheduleReconnect(Duration),
    /// Drop a scheduled reconnect.
    CancelReconnect,
    /// Tell the user.
    Notify(ClientEvent),
}

/// Notifications delivered to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    /// The transport is open.
    Opened,
    /// A business envelope arrived.
    Message(Envelope),
    /// A transient drop; a reconnect follows after `retry_in`.
    Disconnected {
        /// Reconnect attempt about to be made.
        attempt: u32,
        /// Backoff including jitter.
        retry_in: Duration,
    },
    /// Terminal failure after exhausting the reconnect budget.
    Failed {
        /// Failed attempts in a row.
        attempts: u32,
    },
    /// Terminal close requested by the user.
    Closed,
}

/// The reconnect state machine.
pub struct ClientMachine {
    config: ClientConfig,
    state: ClientState,
    attempt: u32,
    next_delay: Duration,
    last_pong: Option<Instant>,
    awaiting_pong: bool,
    transitioning: bool,
    failed: bool,
    rng: StdRng,
}

impl ClientMachine {
    /// A machine in `Idle` with an entropy-seeded jitter source.
    #[must_use]
    pub fn new(config: ClientConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// A machine with a fixed jitter seed.
    #[must_use]
    pub fn with_seed(config: ClientConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: ClientConfig, rng: StdRng) -> Self {
        let next_delay = config.base_delay;
        Self {
            config,
            state: ClientState::Idle,
            attempt: 0,
            next_delay,
            last_pong: None,
            awaiting_pong: false,
            transitioning: false,
            failed: false,
            rng,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Consecutive failed attempts since the last successful open.
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay used for the next reconnect, before jitter.
    #[must_use]
    pub fn next_delay(&self) -> Duration {
        self.next_delay
    }

    /// When the last `pong` or `heartbeat` arrived.
    #[must_use]
    pub fn last_pong_received(&self) -> Option<Instant> {
        self.last_pong
    }

    /// `true` after the reconnect budget ran out.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// `true` once no further transitions will happen.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.state == ClientState::Closed
    }

    /// Applies one event and returns the effects to perform, in order.
    pub fn handle(&mut self, event: Event) -> Vec<Effect> {
        match (self.state, event) {
            (ClientState::Closed, _) => Vec::new(),

            (ClientState::Idle, Event::Start) | (ClientState::Closing, Event::ReconnectDue) => {
                self.state = ClientState::Connecting;
                self.transitioning = false;
                vec![Effect::Connect]
            }

            (ClientState::Connecting, Event::Opened) => {
                self.state = ClientState::Open;
                self.attempt = 0;
                self.next_delay = self.config.base_delay;
                self.transitioning = false;
                self.awaiting_pong = false;
                info!("Connected to hub");
                vec![Effect::Notify(ClientEvent::Opened), Effect::StartPing]
            }

            (ClientState::Connecting, Event::ConnectFailed(reason)) => {
                warn!(attempt = self.attempt + 1, error = %reason, "Connect failed");
                self.on_close()
            }

            (ClientState::Open, Event::Frame { text, at }) => self.on_frame(&text, at),

            (ClientState::Open, Event::PingDue) => {
                let mut effects = vec![Effect::Send(Envelope::ping().to_text())];
                // The deadline counts from the first unanswered ping.
                if !self.awaiting_pong {
                    self.awaiting_pong = true;
                    effects.push(Effect::ArmWatchdog);
                }
                effects
            }

            (ClientState::Open, Event::PongDeadline) if self.awaiting_pong => {
                warn!(
                    timeout_ms = self.config.pong_timeout.as_millis(),
                    "Pong timeout, forcing reconnect"
                );
                let mut effects = vec![Effect::CloseTransport];
                effects.extend(self.on_close());
                effects
            }

            (ClientState::Open | ClientState::Connecting, Event::TransportClosed) => {
                self.on_close()
            }

            (ClientState::Open | ClientState::Connecting, Event::Disconnect { permanent: false }) => {
                let mut effects = vec![Effect::CloseTransport];
                effects.extend(self.on_close());
                effects
            }

            (_, Event::Disconnect { permanent: true }) => {
                self.state = ClientState::Closed;
                self.transitioning = true;
                self.awaiting_pong = false;
                info!("Client closed");
                vec![
                    Effect::StopPing,
                    Effect::DisarmWatchdog,
                    Effect::CancelReconnect,
                    Effect::CloseTransport,
                    Effect::Notify(ClientEvent::Closed),
                ]
            }

            (state, event) => {
                debug!(?state, ?event, "Stale event ignored");
                Vec::new()
            }
        }
    }

    fn on_frame(&mut self, text: &str, at: Instant) -> Vec<Effect> {
        let Some(envelope) = Envelope::decode(text) else {
            debug!("Ignoring non-envelope frame");
            return Vec::new();
        };
        if envelope.kind == kinds::PING {
            return vec![Effect::Send(Envelope::pong().to_text())];
        }
        if envelope.is_liveness() {
            self.last_pong = Some(at);
            self.awaiting_pong = false;
            return vec![Effect::DisarmWatchdog];
        }
        vec![Effect::Notify(ClientEvent::Message(envelope))]
    }

    fn on_close(&mut self) -> Vec<Effect> {
        if self.transitioning {
            return Vec::new();
        }
        self.transitioning = true;
        self.awaiting_pong = false;

        let mut effects = vec![Effect::StopPing, Effect::DisarmWatchdog];
        self.attempt += 1;
        if self.attempt > self.config.max_attempts {
            self.state = ClientState::Closed;
            self.failed = true;
            warn!(attempts = self.attempt - 1, "Reconnect budget exhausted");
            effects.push(Effect::Notify(ClientEvent::Failed {
                attempts: self.attempt - 1,
            }));
            return effects;
        }

        self.state = ClientState::Closing;
        self.next_delay = self.config.backoff_delay(self.attempt);
        let retry_in = self.next_delay + self.jitter();
        info!(
            attempt = self.attempt,
            retry_in_ms = retry_in.as_millis(),
            "Scheduling reconnect"
        );
        effects.push(Effect::Notify(ClientEvent::Disconnected {
            attempt: self.attempt,
            retry_in,
        }));
        effects.push(Effect::ScheduleReconnect(retry_in));
        effects
    }

    fn jitter(&mut self) -> Duration {
        let range = u64::try_from(self.config.jitter_range.as_millis()).unwrap_or(u64::MAX);
        if range == 0 {
            return Duration::ZERO;
        }
        Duration::from_millis(self.rng.gen_range(0..=range))
    }
}
