//! Control service, the hexagonal core.
//!
//! [`ControlService`] owns the fuzzy engine and the cycle bookkeeping.
//! All I/O flows through port traits injected at call sites, making the
//! orchestration testable with mock adapters.
//!
//! ```text
//!  FrameSource ──▶ ┌──────────────────────┐ ──▶ ActuatorPort
//!                  │    ControlService    │ ──▶ TelemetryPort
//!                  │  status · inference  │ ──▶ RecordSink
//!                  └──────────────────────┘ ──▶ EventSink
//! ```
//!
//! Each tick:
//! 1. **Assess** link state and frame age → [`SystemStatus`].
//! 2. **Announce** status on change and every status interval.
//! 3. **Infer** only for a fresh frame while online; otherwise hold.
//! 4. **Drive** every actuator with the resulting command.
//! 5. **Publish and record** sensor values and commands (fresh frames only).

use std::time::{Duration, Instant};

use chrono::{DateTime, Local};

use crate::config::{ControlConfig, Setpoints};
use crate::connection::ConnectionState;
use crate::control::{Actuator, CycleCommands, FuzzyEngine};
use crate::error::FuzzyError;
use crate::link::LatestFrame;
use crate::sensors::{Field, Section};
use crate::telemetry::topics;

use super::events::{AppEvent, OfflineCause, SystemStatus};
use super::ports::{ActuatorPort, EventSink, FrameSource, RecordSink, TelemetryPort};
use super::record::{CycleRecord, TIMESTAMP_FORMAT};

/// What one tick did.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub status: SystemStatus,
    /// Sequence number of the frame inferred on, `None` when held.
    pub inferred: Option<u64>,
    pub commands: CycleCommands,
}

pub struct ControlService {
    engine: FuzzyEngine,
    staleness: Duration,
    status_interval: Duration,
    status: SystemStatus,
    last_status_publish: Option<Instant>,
    last_seq: u64,
    tick_count: u64,
}

impl ControlService {
    /// Build the engine from its static tables.  A table that fails
    /// validation is fatal.
    pub fn new(control: &ControlConfig, setpoints: Setpoints) -> Result<Self, FuzzyError> {
        Ok(Self {
            engine: FuzzyEngine::new(setpoints)?,
            staleness: control.staleness(),
            status_interval: control.status_interval(),
            status: SystemStatus::Offline,
            last_status_publish: None,
            last_seq: 0,
            tick_count: 0,
        })
    }

    pub fn start(&mut self, tick: Duration, sink: &mut impl EventSink) {
        sink.emit(&AppEvent::Started {
            tick,
            staleness: self.staleness,
        });
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle.  Never blocks and never fails: I/O trouble
    /// only shows up as an offline status and held commands.
    pub fn tick(
        &mut self,
        source: &impl FrameSource,
        actuators: &mut impl ActuatorPort,
        telemetry: &mut impl TelemetryPort,
        records: &mut impl RecordSink,
        sink: &mut impl EventSink,
    ) -> TickOutcome {
        self.tick_count += 1;
        let now = Instant::now();
        let at = Local::now();

        // 1–2. Status
        let latest = source.latest();
        let (status, cause) = assess(source.link_state(), latest.as_ref(), self.staleness);
        self.announce(status, cause, now, telemetry, sink);

        // 3. Inference or hold
        let fresh = latest.filter(|f| status == SystemStatus::Online && f.seq != self.last_seq);
        let (commands, inferred) = match fresh {
            Some(frame) => {
                self.last_seq = frame.seq;
                let commands = self.infer(&frame, at, sink);
                publish_cycle(&frame, &commands, at, telemetry);
                if let Err(e) = records.append(&CycleRecord::new(frame.pair, &commands, at)) {
                    sink.emit(&AppEvent::RecordFailed(e.to_string()));
                }
                (commands, Some(frame.seq))
            }
            None => (self.engine.hold_all(at), None),
        };

        // 4. Actuators
        for command in &commands.commands {
            actuators.set_duty(command);
        }

        TickOutcome {
            status,
            inferred,
            commands,
        }
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn status(&self) -> SystemStatus {
        self.status
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn last_duties(&self) -> [f32; 4] {
        self.engine.last_duties()
    }

    // ── Internal ──────────────────────────────────────────────

    fn announce(
        &mut self,
        status: SystemStatus,
        cause: Option<OfflineCause>,
        now: Instant,
        telemetry: &mut impl TelemetryPort,
        sink: &mut impl EventSink,
    ) {
        let changed = status != self.status;
        if changed {
            sink.emit(&AppEvent::StatusChanged {
                from: self.status,
                to: status,
                cause,
            });
            self.status = status;
        }
        let due = self
            .last_status_publish
            .is_none_or(|t| now.saturating_duration_since(t) >= self.status_interval);
        if changed || due {
            telemetry.publish_status(status);
            self.last_status_publish = Some(now);
        }
    }

    fn infer(
        &mut self,
        frame: &LatestFrame,
        at: DateTime<Local>,
        sink: &mut impl EventSink,
    ) -> CycleCommands {
        let commands = self.engine.compute(&frame.pair.controlled, at);
        for &(actuator, reason) in &commands.held {
            sink.emit(&AppEvent::ControllerHeld {
                actuator,
                reason,
                duty: commands.get(actuator).duty_cycle,
            });
        }
        sink.emit(&AppEvent::CycleCompleted {
            seq: frame.seq,
            duties: commands.duties(),
            held: commands.held.len(),
        });
        commands
    }
}

/// Online iff the link is up and the newest frame is within `staleness`.
fn assess(
    link: ConnectionState,
    latest: Option<&LatestFrame>,
    staleness: Duration,
) -> (SystemStatus, Option<OfflineCause>) {
    if link != ConnectionState::Connected {
        return (SystemStatus::Offline, Some(OfflineCause::Link(link)));
    }
    match latest {
        None => (SystemStatus::Offline, Some(OfflineCause::NoData)),
        Some(frame) => {
            let age = frame.age();
            if age > staleness {
                (SystemStatus::Offline, Some(OfflineCause::Stale(age)))
            } else {
                (SystemStatus::Online, None)
            }
        }
    }
}

fn publish_cycle(
    frame: &LatestFrame,
    commands: &CycleCommands,
    at: DateTime<Local>,
    telemetry: &mut impl TelemetryPort,
) {
    telemetry.publish(topics::TIMESTAMP, &at.format(TIMESTAMP_FORMAT).to_string());
    for section in Section::ALL {
        let readings = frame.pair.section(section);
        for field in Field::ALL {
            let value = readings.raw(field).to_string();
            telemetry.publish(&topics::sensor(section, field), &value);
        }
    }
    for actuator in Actuator::ALL {
        let duty = format!("{:.2}", commands.get(actuator).duty_cycle);
        telemetry.publish(&topics::actuator(actuator), &duty);
    }
}
