//! Telemetry publisher.
//!
//! [`Publisher`] owns the broker session on its own thread; the control
//! loop talks to it only through a [`PublisherHandle`], which enqueues
//! onto a bounded channel and never blocks:
//!
//! ```text
//!  ControlService ──try_send──▶ [Outbound; 64] ──▶ Publisher ──▶ BrokerSession
//!                                                     │
//!                       ReconnectThrottle ◀── lost ───┘
//! ```
//!
//! While the session is not `Connected` new messages are dropped on the
//! floor.  Telemetry is best effort; the cycle must not wait for the
//! network.

pub mod topics;

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use heapless::String;
use log::{debug, info, warn};

use crate::app::events::SystemStatus;
use crate::app::ports::TelemetryPort;
use crate::config::BrokerConfig;
use crate::connection::{ConnectionState, ReconnectThrottle, StateCell};
use crate::error::BrokerError;
use crate::shutdown::Shutdown;

use topics::Topic;

/// Compiled queue capacity; `BrokerConfig::queue_depth` can only lower it.
pub const QUEUE_CAPACITY: usize = 64;

pub const PAYLOAD_CAPACITY: usize = 48;

// ───────────────────────────────────────────────────────────────
// Broker seams
// ───────────────────────────────────────────────────────────────

/// What one poll of the session produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// The broker accepted the connection.
    Connected,
    /// Nothing relevant (timeout, ping, ack).
    Idle,
}

/// A live broker session.  Dropping it closes the socket.
pub trait BrokerSession {
    /// Drive network I/O for up to `timeout`.
    fn poll(&mut self, timeout: Duration) -> Result<SessionEvent, BrokerError>;

    /// Fire-and-forget publish (QoS 0).
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), BrokerError>;

    /// Graceful close before drop.
    fn disconnect(&mut self) {}
}

pub trait BrokerConnector {
    type Session: BrokerSession;

    fn connect(&mut self) -> Result<Self::Session, BrokerError>;
}

// ───────────────────────────────────────────────────────────────
// Queue
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub topic: Topic,
    pub payload: String<PAYLOAD_CAPACITY>,
    pub retain: bool,
}

impl Outbound {
    fn new(topic: &str, payload: &str, retain: bool) -> Option<Self> {
        Some(Self {
            topic: Topic::try_from(topic).ok()?,
            payload: String::try_from(payload).ok()?,
            retain,
        })
    }
}

struct Shared {
    state: StateCell,
    queue: Channel<CriticalSectionRawMutex, Outbound, QUEUE_CAPACITY>,
    depth: usize,
    status: Mutex<Option<SystemStatus>>,
    sent: AtomicU64,
    dropped: AtomicU64,
}

impl Shared {
    fn new(depth: usize) -> Self {
        Self {
            state: StateCell::default(),
            queue: Channel::new(),
            depth: depth.clamp(1, QUEUE_CAPACITY),
            status: Mutex::new(None),
            sent: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    fn last_status(&self) -> Option<SystemStatus> {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn discard_queue(&self) -> usize {
        let mut n = 0;
        while self.queue.try_receive().is_ok() {
            n += 1;
        }
        n
    }
}

// ───────────────────────────────────────────────────────────────
// PublisherHandle
// ───────────────────────────────────────────────────────────────

/// Producer side, cheap to clone.
#[derive(Clone)]
pub struct PublisherHandle {
    shared: Arc<Shared>,
}

impl PublisherHandle {
    pub fn state(&self) -> ConnectionState {
        self.shared.state.get()
    }

    /// Messages handed to the session since startup.
    pub fn sent(&self) -> u64 {
        self.shared.sent.load(Ordering::Relaxed)
    }

    /// Messages dropped (disconnected, queue full or oversized).
    pub fn dropped(&self) -> u64 {
        self.shared.dropped.load(Ordering::Relaxed)
    }

    /// Enqueue if connected.  Returns `false` when the message was dropped.
    pub fn enqueue(&self, topic: &str, payload: &str, retain: bool) -> bool {
        if self.state() != ConnectionState::Connected {
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        let Some(msg) = Outbound::new(topic, payload, retain) else {
            warn!("MQTT: {topic} payload too large, dropped");
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        };
        if self.shared.queue.len() >= self.shared.depth || self.shared.queue.try_send(msg).is_err()
        {
            warn!("MQTT: queue full, dropped {topic}");
            self.shared.dropped.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        true
    }
}

impl TelemetryPort for PublisherHandle {
    fn publish(&mut self, topic: &str, payload: &str) {
        self.enqueue(topic, payload, false);
    }

    fn publish_status(&mut self, status: SystemStatus) {
        *self
            .shared
            .status
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(status);
        self.enqueue(topics::STATUS, status.as_str(), true);
    }
}

// ───────────────────────────────────────────────────────────────
// Publisher
// ───────────────────────────────────────────────────────────────

/// Timing knobs, split out of [`BrokerConfig`] so tests can run fast.
#[derive(Debug, Clone, Copy)]
pub struct PublisherSettings {
    pub reconnect_interval: Duration,
    pub poll_interval: Duration,
    pub connect_timeout: Duration,
    pub queue_depth: usize,
}

impl From<&BrokerConfig> for PublisherSettings {
    fn from(c: &BrokerConfig) -> Self {
        Self {
            reconnect_interval: Duration::from_millis(c.reconnect_interval_ms),
            poll_interval: Duration::from_millis(c.poll_interval_ms),
            connect_timeout: Duration::from_millis(c.connect_timeout_ms),
            queue_depth: c.queue_depth,
        }
    }
}

enum SessionEnd {
    Shutdown,
    Lost(BrokerError),
}

pub struct Publisher<C: BrokerConnector> {
    connector: C,
    settings: PublisherSettings,
    throttle: ReconnectThrottle,
    shared: Arc<Shared>,
    shutdown: Shutdown,
}

impl<C: BrokerConnector> Publisher<C> {
    pub fn new(connector: C, settings: PublisherSettings, shutdown: Shutdown) -> Self {
        Self {
            connector,
            settings,
            throttle: ReconnectThrottle::new(settings.reconnect_interval),
            shared: Arc::new(Shared::new(settings.queue_depth)),
            shutdown,
        }
    }

    pub fn handle(&self) -> PublisherHandle {
        PublisherHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Maintain the session until shutdown.
    pub fn run(mut self) {
        info!("MQTT: publisher started");
        while !self.shutdown.is_triggered() {
            let now = Instant::now();
            if !self.throttle.try_acquire(now) {
                self.set_state(ConnectionState::Backoff);
                if self.shutdown.wait(self.throttle.remaining(now)) {
                    break;
                }
                continue;
            }

            self.set_state(ConnectionState::Connecting);
            let end = match self.connector.connect() {
                Ok(session) => self.serve(session),
                Err(e) => SessionEnd::Lost(e),
            };
            match end {
                SessionEnd::Shutdown => break,
                SessionEnd::Lost(e) => {
                    self.set_state(ConnectionState::Backoff);
                    let stale = self.shared.discard_queue();
                    warn!("MQTT: {e} ({stale} queued messages dropped)");
                }
            }
        }
        self.set_state(ConnectionState::Disconnected);
        info!("MQTT: publisher stopped");
    }

    pub fn spawn(self) -> io::Result<JoinHandle<()>>
    where
        C: Send + 'static,
    {
        thread::Builder::new()
            .name("telemetry".into())
            .spawn(move || self.run())
    }

    fn serve(&mut self, mut session: C::Session) -> SessionEnd {
        if let Err(end) = self.handshake(&mut session) {
            return end;
        }
        self.set_state(ConnectionState::Connected);
        info!("MQTT: connected");

        // Heartbeat: re-announce whatever status the control loop last set.
        if let Some(status) = self.shared.last_status() {
            if let Err(e) = session.publish(topics::STATUS, status.as_str(), true) {
                return SessionEnd::Lost(e);
            }
        }

        loop {
            if self.shutdown.is_triggered() {
                self.close(&mut session);
                return SessionEnd::Shutdown;
            }
            while let Ok(msg) = self.shared.queue.try_receive() {
                if let Err(e) = session.publish(&msg.topic, &msg.payload, msg.retain) {
                    return SessionEnd::Lost(e);
                }
                self.shared.sent.fetch_add(1, Ordering::Relaxed);
                debug!("MQTT: {} -> {}", msg.topic, msg.payload);
            }
            if let Err(e) = session.poll(self.settings.poll_interval) {
                return SessionEnd::Lost(e);
            }
        }
    }

    /// Wait for CONNACK, bounded by the connect timeout.
    fn handshake(&mut self, session: &mut C::Session) -> Result<(), SessionEnd> {
        let deadline = Instant::now() + self.settings.connect_timeout;
        loop {
            if self.shutdown.is_triggered() {
                return Err(SessionEnd::Shutdown);
            }
            if Instant::now() >= deadline {
                return Err(SessionEnd::Lost(BrokerError::Connect(
                    "timed out waiting for CONNACK".into(),
                )));
            }
            match session.poll(self.settings.poll_interval) {
                Ok(SessionEvent::Connected) => return Ok(()),
                Ok(SessionEvent::Idle) => {}
                Err(e) => return Err(SessionEnd::Lost(e)),
            }
        }
    }

    fn close(&mut self, session: &mut C::Session) {
        // Flush what the control loop queued before it stopped.
        while let Ok(msg) = self.shared.queue.try_receive() {
            if session.publish(&msg.topic, &msg.payload, msg.retain).is_err() {
                break;
            }
            self.shared.sent.fetch_add(1, Ordering::Relaxed);
        }
        if let Err(e) = session.publish(topics::STATUS, SystemStatus::Offline.as_str(), true) {
            debug!("MQTT: final OFFLINE not sent ({e})");
        }
        // Let the event loop write the last packets out.
        if let Err(e) = session.poll(self.settings.poll_interval) {
            debug!("MQTT: final poll failed ({e})");
        }
        session.disconnect();
    }

    fn set_state(&self, state: ConnectionState) {
        let prev = self.shared.state.set(state);
        if prev != state {
            debug!("MQTT: {prev} -> {state}");
        }
    }
}
