//! Port traits, the hexagonal boundary between the control core and the
//! outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ControlService (domain)
//! ```
//!
//! The [`ControlService`](super::service::ControlService) consumes these
//! through generics, so the orchestration logic never touches a serial
//! port, a socket or a file directly.

use crate::config::GreenhouseConfig;
use crate::connection::ConnectionState;
use crate::control::ActuatorCommand;
use crate::error::{ConfigError, StorageError};
use crate::link::{LatestFrame, LinkHandle};

use super::events::{AppEvent, SystemStatus};
use super::record::CycleRecord;

// ───────────────────────────────────────────────────────────────
// Frame source (link → domain)
// ───────────────────────────────────────────────────────────────

/// Read side of the sensor link.  Never blocks.
pub trait FrameSource {
    /// Whatever frame is current, possibly stale.
    fn latest(&self) -> Option<LatestFrame>;

    fn link_state(&self) -> ConnectionState;
}

impl FrameSource for LinkHandle {
    fn latest(&self) -> Option<LatestFrame> {
        LinkHandle::latest(self)
    }

    fn link_state(&self) -> ConnectionState {
        self.state()
    }
}

// ───────────────────────────────────────────────────────────────
// Actuator port (domain → PWM driver)
// ───────────────────────────────────────────────────────────────

/// Fire-and-forget duty command, called once per tick per actuator.
pub trait ActuatorPort {
    fn set_duty(&mut self, command: &ActuatorCommand);
}

// ───────────────────────────────────────────────────────────────
// Telemetry port (domain → broker)
// ───────────────────────────────────────────────────────────────

/// Best-effort publishing.  Implementations drop rather than block.
pub trait TelemetryPort {
    fn publish(&mut self, topic: &str, payload: &str);

    /// Publish (retained) and remember the status for reconnects.
    fn publish_status(&mut self, status: SystemStatus);
}

// ───────────────────────────────────────────────────────────────
// Persistence (domain → training data)
// ───────────────────────────────────────────────────────────────

pub trait RecordSink {
    fn append(&mut self, record: &CycleRecord) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink (domain → logging)
// ───────────────────────────────────────────────────────────────

pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration
// ───────────────────────────────────────────────────────────────

/// Loads startup configuration.
///
/// Implementations return [`GreenhouseConfig::default()`] when nothing
/// is stored, and must not return a config that fails
/// [`GreenhouseConfig::validate`].
pub trait ConfigPort {
    fn load(&self) -> Result<GreenhouseConfig, ConfigError>;
}
