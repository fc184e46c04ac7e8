//! Outbound application events.
//!
//! The [`ControlService`](super::service::ControlService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them (log lines today).

use core::fmt;
use std::time::Duration;

use crate::connection::ConnectionState;
use crate::control::{Actuator, HoldReason};

/// Heartbeat value on the status topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStatus {
    /// Link connected and the latest frame is fresh.
    Online,
    /// Link down or data stale; commands are held.
    Offline,
}

impl SystemStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Online => "ONLINE",
            Self::Offline => "OFFLINE",
        }
    }
}

impl fmt::Display for SystemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the system is offline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfflineCause {
    /// The serial link is not connected.
    Link(ConnectionState),
    /// Connected, but no frame has arrived yet.
    NoData,
    /// The newest frame is older than the staleness threshold.
    Stale(Duration),
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The service has started.
    Started { tick: Duration, staleness: Duration },

    /// System status flipped.
    StatusChanged {
        from: SystemStatus,
        to: SystemStatus,
        cause: Option<OfflineCause>,
    },

    /// A fresh frame went through inference.
    CycleCompleted {
        seq: u64,
        duties: [f32; 4],
        held: usize,
    },

    /// One controller repeated its previous command.
    ControllerHeld {
        actuator: Actuator,
        reason: HoldReason,
        duty: f32,
    },

    /// The persistence collaborator rejected a record.
    RecordFailed(String),
}
