//! Serial link supervision.
//!
//! [`LinkManager`] owns the transport and runs on its own thread:
//!
//! ```text
//!   Connector::open ─▶ settle ─▶ read_line ─▶ FrameCodec ─▶ latest slot
//!         ▲                          │ LinkError
//!         └──── Backoff::next_delay ◀┘
//! ```
//!
//! Malformed lines are counted and dropped; only transport errors
//! trigger a reconnect.  Readers never block on the manager: they take a
//! clone of whatever is in the slot through a [`LinkHandle`].

use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::connection::{Backoff, ConnectionState, StateCell};
use crate::error::LinkError;
use crate::sensors::{FrameCodec, FramePair};
use crate::shutdown::Shutdown;

// ───────────────────────────────────────────────────────────────
// Transport seams
// ───────────────────────────────────────────────────────────────

/// An open line-oriented transport.  Dropping it releases the device.
pub trait LineTransport {
    /// Next complete line without its terminator.  `Ok(None)` means no
    /// complete line is available yet (timeout or partial chunk), which is
    /// not an error.
    fn read_line(&mut self) -> Result<Option<String>, LinkError>;

    /// Drop anything buffered before the peer finished resetting.
    fn discard_input(&mut self) -> Result<(), LinkError> {
        Ok(())
    }
}

/// Opens transports.  Called once per connection attempt.
pub trait Connector {
    type Transport: LineTransport;

    fn open(&mut self) -> Result<Self::Transport, LinkError>;
}

// ───────────────────────────────────────────────────────────────
// Shared slot
// ───────────────────────────────────────────────────────────────

/// The most recent accepted frame pair.
#[derive(Debug, Clone)]
pub struct LatestFrame {
    pub pair: FramePair,
    /// Starts at 1 and increases by one per accepted line.
    pub seq: u64,
    pub received: Instant,
}

impl LatestFrame {
    pub fn age(&self) -> Duration {
        self.received.elapsed()
    }
}

#[derive(Debug, Default)]
struct Shared {
    state: StateCell,
    latest: Mutex<Option<LatestFrame>>,
    accepted: AtomicU64,
    rejected: AtomicU64,
}

/// Read side of the link, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct LinkHandle {
    shared: Arc<Shared>,
}

impl LinkHandle {
    pub fn latest(&self) -> Option<LatestFrame> {
        self.shared
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.state.get()
    }

    /// Lines accepted since startup.
    pub fn accepted(&self) -> u64 {
        self.shared.accepted.load(Ordering::Relaxed)
    }

    /// Lines rejected by the codec since startup.
    pub fn rejected(&self) -> u64 {
        self.shared.rejected.load(Ordering::Relaxed)
    }

    fn store(&self, pair: FramePair) -> u64 {
        let seq = self.shared.accepted.fetch_add(1, Ordering::Relaxed) + 1;
        let frame = LatestFrame {
            pair,
            seq,
            received: Instant::now(),
        };
        *self
            .shared
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(frame);
        seq
    }

    fn set_state(&self, state: ConnectionState) {
        let prev = self.shared.state.set(state);
        if prev != state {
            debug!("Link: {prev} -> {state}");
        }
    }
}

// ───────────────────────────────────────────────────────────────
// LinkManager
// ───────────────────────────────────────────────────────────────

pub struct LinkManager<C: Connector> {
    connector: C,
    codec: FrameCodec,
    backoff: Backoff,
    settle: Duration,
    handle: LinkHandle,
    shutdown: Shutdown,
}

impl<C: Connector> LinkManager<C> {
    pub fn new(
        connector: C,
        codec: FrameCodec,
        backoff: Backoff,
        settle: Duration,
        shutdown: Shutdown,
    ) -> Self {
        Self {
            connector,
            codec,
            backoff,
            settle,
            handle: LinkHandle::default(),
            shutdown,
        }
    }

    pub fn handle(&self) -> LinkHandle {
        self.handle.clone()
    }

    /// Supervise the link until shutdown.
    pub fn run(mut self) {
        info!("Link: manager started");
        while !self.shutdown.is_triggered() {
            self.handle.set_state(ConnectionState::Connecting);
            match self.connector.open() {
                Ok(mut transport) => {
                    self.handle.set_state(ConnectionState::Connected);
                    self.backoff.reset();
                    info!("Link: connected");
                    match self.serve(&mut transport) {
                        Some(e) => warn!("Link: transport lost ({e})"),
                        None => break,
                    }
                }
                Err(e) => warn!("Link: open failed ({e})"),
            }

            self.handle.set_state(ConnectionState::Backoff);
            let delay = self.backoff.next_delay();
            info!(
                "Link: retry {} in {} ms",
                self.backoff.attempt(),
                delay.as_millis()
            );
            if self.shutdown.wait(delay) {
                break;
            }
        }
        self.handle.set_state(ConnectionState::Disconnected);
        info!("Link: manager stopped");
    }

    /// Run on a named thread.
    pub fn spawn(self) -> io::Result<JoinHandle<()>>
    where
        C: Send + 'static,
    {
        thread::Builder::new()
            .name("link".into())
            .spawn(move || self.run())
    }

    /// Read until the transport fails (`Some`) or shutdown (`None`).
    fn serve(&mut self, transport: &mut C::Transport) -> Option<LinkError> {
        if self.shutdown.wait(self.settle) {
            return None;
        }
        if let Err(e) = transport.discard_input() {
            return Some(e);
        }

        while !self.shutdown.is_triggered() {
            match transport.read_line() {
                Ok(Some(line)) => self.accept(&line),
                Ok(None) => {}
                Err(e) => return Some(e),
            }
        }
        None
    }

    fn accept(&self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        match self.codec.parse(line) {
            Ok(pair) => {
                let seq = self.handle.store(pair);
                debug!("Link: frame #{seq}");
            }
            Err(e) => {
                self.handle.shared.rejected.fetch_add(1, Ordering::Relaxed);
                warn!("Link: dropped line ({e}): {line:?}");
            }
        }
    }
}
