//! Mock adapters for integration tests.
//!
//! Each mock records every call so tests can assert on the full history
//! without a serial device, a broker or a filesystem.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use greenhouse::app::events::{AppEvent, SystemStatus};
use greenhouse::app::ports::{ActuatorPort, EventSink, FrameSource, RecordSink, TelemetryPort};
use greenhouse::app::record::CycleRecord;
use greenhouse::connection::ConnectionState;
use greenhouse::control::{Actuator, ActuatorCommand};
use greenhouse::error::{BrokerError, LinkError, StorageError};
use greenhouse::link::{Connector, LatestFrame, LineTransport};
use greenhouse::sensors::FrameCodec;
use greenhouse::shutdown::Shutdown;
use greenhouse::telemetry::{BrokerConnector, BrokerSession, SessionEvent};

pub const SETPOINT_LINE: &str =
    "Controlled|25.0,85.0,800.0,150.0,65.0;Control|26.0,78.0,820.0,140.0,62.0";

// ── Frames ────────────────────────────────────────────────────

/// Hand-fed link: tests push frames and set the link state directly.
pub struct MockFrames {
    latest: RefCell<Option<LatestFrame>>,
    state: RefCell<ConnectionState>,
    seq: RefCell<u64>,
}

#[allow(dead_code)]
impl MockFrames {
    pub fn connected() -> Self {
        Self {
            latest: RefCell::new(None),
            state: RefCell::new(ConnectionState::Connected),
            seq: RefCell::new(0),
        }
    }

    /// Parse `line` and make it the latest frame, `age` old.
    pub fn push(&self, line: &str, age: Duration) {
        let pair = FrameCodec::default().parse(line).expect("test line parses");
        let mut seq = self.seq.borrow_mut();
        *seq += 1;
        *self.latest.borrow_mut() = Some(LatestFrame {
            pair,
            seq: *seq,
            received: Instant::now().checked_sub(age).expect("uptime exceeds age"),
        });
    }

    /// Make the current frame look `age` old without changing it.
    pub fn age_to(&self, age: Duration) {
        if let Some(frame) = self.latest.borrow_mut().as_mut() {
            frame.received = Instant::now().checked_sub(age).expect("uptime exceeds age");
        }
    }

    pub fn set_state(&self, state: ConnectionState) {
        *self.state.borrow_mut() = state;
    }
}

impl FrameSource for MockFrames {
    fn latest(&self) -> Option<LatestFrame> {
        self.latest.borrow().clone()
    }

    fn link_state(&self) -> ConnectionState {
        *self.state.borrow()
    }
}

// ── Actuators ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockActuators {
    pub calls: Vec<ActuatorCommand>,
}

#[allow(dead_code)]
impl MockActuators {
    /// Most recent duty sent to `actuator`.
    pub fn duty(&self, actuator: Actuator) -> Option<f32> {
        self.calls
            .iter()
            .rev()
            .find(|c| c.actuator == actuator)
            .map(|c| c.duty_cycle)
    }
}

impl ActuatorPort for MockActuators {
    fn set_duty(&mut self, command: &ActuatorCommand) {
        self.calls.push(*command);
    }
}

// ── Telemetry ─────────────────────────────────────────────────

#[derive(Default)]
pub struct MockTelemetry {
    pub published: Vec<(String, String)>,
    pub statuses: Vec<SystemStatus>,
}

#[allow(dead_code)]
impl MockTelemetry {
    pub fn value(&self, topic: &str) -> Option<&str> {
        self.published
            .iter()
            .rev()
            .find(|(t, _)| t == topic)
            .map(|(_, p)| p.as_str())
    }

    pub fn clear(&mut self) {
        self.published.clear();
        self.statuses.clear();
    }
}

impl TelemetryPort for MockTelemetry {
    fn publish(&mut self, topic: &str, payload: &str) {
        self.published.push((topic.to_string(), payload.to_string()));
    }

    fn publish_status(&mut self, status: SystemStatus) {
        self.statuses.push(status);
    }
}

// ── Records / events ──────────────────────────────────────────

#[derive(Default)]
pub struct MockRecords {
    pub records: Vec<CycleRecord>,
    pub fail: bool,
}

impl RecordSink for MockRecords {
    fn append(&mut self, record: &CycleRecord) -> Result<(), StorageError> {
        if self.fail {
            return Err(StorageError::Io(std::io::ErrorKind::PermissionDenied));
        }
        self.records.push(record.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Scripted serial transport ─────────────────────────────────

pub type LineScript = VecDeque<Result<Option<String>, LinkError>>;

/// One scripted transport per connection attempt; `None` makes the
/// attempt fail.  When the scripts run out, shutdown is triggered.
pub struct ScriptedConnector {
    pub sessions: VecDeque<Option<LineScript>>,
    pub opens: Arc<Mutex<Vec<Instant>>>,
    pub shutdown: Shutdown,
}

impl Connector for ScriptedConnector {
    type Transport = ScriptedTransport;

    fn open(&mut self) -> Result<ScriptedTransport, LinkError> {
        self.opens.lock().unwrap().push(Instant::now());
        match self.sessions.pop_front() {
            Some(Some(script)) => Ok(ScriptedTransport {
                script,
                shutdown: self.shutdown.clone(),
                last: self.sessions.is_empty(),
            }),
            Some(None) => Err(LinkError::Open("scripted failure".into())),
            None => {
                self.shutdown.trigger();
                Err(LinkError::Open("script exhausted".into()))
            }
        }
    }
}

pub struct ScriptedTransport {
    script: LineScript,
    shutdown: Shutdown,
    last: bool,
}

impl LineTransport for ScriptedTransport {
    fn read_line(&mut self) -> Result<Option<String>, LinkError> {
        match self.script.pop_front() {
            Some(step) => step,
            None if self.last => {
                self.shutdown.trigger();
                Ok(None)
            }
            None => Err(LinkError::Closed),
        }
    }
}

// ── Scripted broker ───────────────────────────────────────────

/// Shared log of what every scripted session saw.
#[derive(Default)]
pub struct BrokerLog {
    pub connects: usize,
    pub published: Vec<(String, String, bool)>,
    pub disconnects: usize,
}

/// How a scripted session behaves.
#[derive(Clone, Copy)]
pub enum SessionPlan {
    /// Refuse to connect.
    Refuse,
    /// Never send CONNACK.
    Silent,
    /// Accept, then drop after `polls` polls.
    AcceptFor { polls: usize },
}

pub struct ScriptedBroker {
    pub plans: VecDeque<SessionPlan>,
    pub log: Arc<Mutex<BrokerLog>>,
}

impl BrokerConnector for ScriptedBroker {
    type Session = ScriptedSession;

    fn connect(&mut self) -> Result<ScriptedSession, BrokerError> {
        self.log.lock().unwrap().connects += 1;
        let plan = self
            .plans
            .pop_front()
            .unwrap_or(SessionPlan::AcceptFor { polls: usize::MAX });
        if let SessionPlan::Refuse = plan {
            return Err(BrokerError::Connect("scripted refusal".into()));
        }
        Ok(ScriptedSession {
            plan,
            polls: 0,
            acked: false,
            log: Arc::clone(&self.log),
        })
    }
}

pub struct ScriptedSession {
    plan: SessionPlan,
    polls: usize,
    acked: bool,
    log: Arc<Mutex<BrokerLog>>,
}

impl BrokerSession for ScriptedSession {
    fn poll(&mut self, timeout: Duration) -> Result<SessionEvent, BrokerError> {
        std::thread::sleep(timeout);
        match self.plan {
            SessionPlan::Refuse | SessionPlan::Silent => Ok(SessionEvent::Idle),
            SessionPlan::AcceptFor { polls } => {
                if !self.acked {
                    self.acked = true;
                    return Ok(SessionEvent::Connected);
                }
                self.polls += 1;
                if self.polls > polls {
                    Err(BrokerError::ConnectionLost("scripted drop".into()))
                } else {
                    Ok(SessionEvent::Idle)
                }
            }
        }
    }

    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), BrokerError> {
        self.log
            .lock()
            .unwrap()
            .published
            .push((topic.to_string(), payload.to_string(), retain));
        Ok(())
    }

    fn disconnect(&mut self) {
        self.log.lock().unwrap().disconnects += 1;
    }
}
