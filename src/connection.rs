//! Connection lifecycle shared by the serial link and the broker client.
//!
//! ```text
//!  Disconnected ──▶ Connecting ──▶ Connected
//!        ▲              │              │ I/O error
//!        │              ▼              ▼
//!        └──(shutdown)─ Backoff ◀──────┘
//!                         │ delay elapsed
//!                         └──▶ Connecting …
//! ```
//!
//! The state is the only thing that decides whether I/O is attempted.
//! It is written by the owning manager and read by everyone else through
//! a [`StateCell`].  Retry pacing lives in [`Backoff`] (exponential,
//! capped) and [`ReconnectThrottle`] (fixed minimum interval) so both can
//! be tested without a transport.

use core::fmt;
use core::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

// ───────────────────────────────────────────────────────────────
// ConnectionState
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
    Backoff = 3,
}

impl ConnectionState {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Connecting,
            2 => Self::Connected,
            3 => Self::Backoff,
            _ => Self::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Backoff => write!(f, "backoff"),
        }
    }
}

/// Atomic holder for a [`ConnectionState`].
///
/// Reads never observe a partial update.  Only the owning manager calls
/// [`set`](Self::set).
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub const fn new(state: ConnectionState) -> Self {
        Self(AtomicU8::new(state as u8))
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Store `state`, returning the previous one.
    pub fn set(&self, state: ConnectionState) -> ConnectionState {
        ConnectionState::from_u8(self.0.swap(state as u8, Ordering::AcqRel))
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new(ConnectionState::Disconnected)
    }
}

// ───────────────────────────────────────────────────────────────
// Backoff
// ───────────────────────────────────────────────────────────────

/// Bounded exponential backoff: `initial`, `2·initial`, `4·initial` …
/// up to `ceiling`, then `ceiling` forever.  Never gives up.
#[derive(Debug, Clone)]
pub struct Backoff {
    initial: Duration,
    ceiling: Duration,
    next: Duration,
    attempt: u32,
}

impl Backoff {
    /// `initial` is raised to at least 1 ms and `ceiling` to at least
    /// `initial`.
    pub fn new(initial: Duration, ceiling: Duration) -> Self {
        let initial = initial.max(Duration::from_millis(1));
        let ceiling = ceiling.max(initial);
        Self {
            initial,
            ceiling,
            next: initial,
            attempt: 0,
        }
    }

    /// Delay to wait before the next attempt; advances the sequence.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.next;
        self.next = self.next.saturating_mul(2).min(self.ceiling);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    /// Back to `initial` after a successful connect.
    pub fn reset(&mut self) {
        self.next = self.initial;
        self.attempt = 0;
    }

    /// Consecutive failures since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn ceiling(&self) -> Duration {
        self.ceiling
    }
}

// ───────────────────────────────────────────────────────────────
// ReconnectThrottle
// ───────────────────────────────────────────────────────────────

/// Enforces a minimum interval between connection attempts.
#[derive(Debug, Clone)]
pub struct ReconnectThrottle {
    min_interval: Duration,
    last_attempt: Option<Instant>,
}

impl ReconnectThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_attempt: None,
        }
    }

    /// Time left until an attempt is allowed at `now` (zero = allowed).
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_attempt {
            None => Duration::ZERO,
            Some(last) => self
                .min_interval
                .saturating_sub(now.saturating_duration_since(last)),
        }
    }

    /// If an attempt is allowed at `now`, record it and return `true`.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        if self.remaining(now).is_zero() {
            self.last_attempt = Some(now);
            true
        } else {
            false
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}
