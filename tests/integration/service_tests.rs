//! ControlService integration tests against mock ports.

use std::time::Duration;

use greenhouse::app::events::{AppEvent, OfflineCause, SystemStatus};
use greenhouse::app::service::ControlService;
use greenhouse::config::{ControlConfig, Setpoints};
use greenhouse::connection::ConnectionState;
use greenhouse::control::{Actuator, HoldReason};
use greenhouse::sensors::Field;

use super::mock_hw::*;

struct Rig {
    service: ControlService,
    frames: MockFrames,
    actuators: MockActuators,
    telemetry: MockTelemetry,
    records: MockRecords,
    sink: RecordingSink,
}

impl Rig {
    fn new() -> Self {
        Self::with_control(ControlConfig::default())
    }

    fn with_control(control: ControlConfig) -> Self {
        Self {
            service: ControlService::new(&control, Setpoints::default()).unwrap(),
            frames: MockFrames::connected(),
            actuators: MockActuators::default(),
            telemetry: MockTelemetry::default(),
            records: MockRecords::default(),
            sink: RecordingSink::default(),
        }
    }

    fn tick(&mut self) -> greenhouse::app::service::TickOutcome {
        self.service.tick(
            &self.frames,
            &mut self.actuators,
            &mut self.telemetry,
            &mut self.records,
            &mut self.sink,
        )
    }
}

const FRESH: Duration = Duration::from_millis(10);

#[test]
fn setpoint_frame_runs_inference_and_publishes() {
    let mut rig = Rig::new();
    rig.frames.push(SETPOINT_LINE, FRESH);

    let out = rig.tick();
    assert_eq!(out.status, SystemStatus::Online);
    assert_eq!(out.inferred, Some(1));

    let [fan, hum, led, pump] = out.commands.duties();
    assert!((fan - 40.0).abs() < 0.05);
    assert!((hum - 40.0).abs() < 0.05);
    assert!((led - 35.0).abs() < 0.05);
    assert!((pump - 6.63).abs() < 0.05);

    // Four actuators driven.
    assert_eq!(rig.actuators.calls.len(), 4);

    // Literal values on the sensor topics.
    assert_eq!(rig.telemetry.value("greenhouse/controlled/temperature"), Some("25"));
    assert_eq!(rig.telemetry.value("greenhouse/control/humidity"), Some("78"));
    assert_eq!(rig.telemetry.value("greenhouse/control/co2"), Some("820"));
    assert_eq!(rig.telemetry.value("greenhouse/actuators/led"), Some("35.00"));
    assert!(rig.telemetry.value("greenhouse/timestamp").is_some());

    assert_eq!(rig.records.records.len(), 1);
    assert_eq!(rig.telemetry.statuses, vec![SystemStatus::Online]);
}

#[test]
fn same_frame_is_not_inferred_twice() {
    let mut rig = Rig::new();
    rig.frames.push(SETPOINT_LINE, FRESH);
    rig.tick();
    rig.telemetry.clear();

    let out = rig.tick();
    assert_eq!(out.inferred, None);
    assert_eq!(rig.records.records.len(), 1);
    assert!(rig.telemetry.value("greenhouse/timestamp").is_none());
    // Actuators still driven every tick.
    assert_eq!(rig.actuators.calls.len(), 8);
}

#[test]
fn stale_frame_holds_commands_and_goes_offline() {
    let mut rig = Rig::new();
    rig.frames.push("Controlled|30,85,1800,150,65;Control|26,78,820,140,62", FRESH);
    let first = rig.tick();
    assert!(first.commands.get(Actuator::Fan).duty_cycle > 90.0);

    rig.frames.age_to(Duration::from_secs(6));
    let held = rig.tick();
    assert_eq!(held.status, SystemStatus::Offline);
    assert_eq!(held.inferred, None);
    assert_eq!(held.commands.duties(), first.commands.duties());

    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::StatusChanged {
            from: SystemStatus::Online,
            to: SystemStatus::Offline,
            cause: Some(OfflineCause::Stale(_)),
        }
    )));
    assert_eq!(rig.telemetry.statuses.last(), Some(&SystemStatus::Offline));
}

#[test]
fn fresh_frame_after_stale_recovers() {
    let mut rig = Rig::new();
    rig.frames.push(SETPOINT_LINE, Duration::from_secs(10));
    let out = rig.tick();
    assert_eq!(out.status, SystemStatus::Offline);
    assert_eq!(out.commands.duties(), [0.0; 4]);

    rig.frames.push(SETPOINT_LINE, FRESH);
    let out = rig.tick();
    assert_eq!(out.status, SystemStatus::Online);
    assert_eq!(out.inferred, Some(2));
}

#[test]
fn link_down_is_offline_even_with_fresh_frame() {
    let mut rig = Rig::new();
    rig.frames.push(SETPOINT_LINE, FRESH);
    rig.frames.set_state(ConnectionState::Backoff);

    let out = rig.tick();
    assert_eq!(out.status, SystemStatus::Offline);
    assert_eq!(out.inferred, None);
    assert!(rig.records.records.is_empty());
}

#[test]
fn humidity_out_of_range_holds_humidifier() {
    let mut rig = Rig::new();
    rig.frames.push("Controlled|25,60,800,150,65;Control|26,78,820,140,62", FRESH);
    let before = rig.tick().commands.get(Actuator::Humidifier).duty_cycle;

    rig.frames.push("Controlled|25,150,800,150,65;Control|26,78,820,140,62", FRESH);
    let out = rig.tick();
    assert_eq!(out.inferred, Some(2));
    assert_eq!(out.commands.get(Actuator::Humidifier).duty_cycle, before);
    assert_eq!(
        out.commands.held.as_slice(),
        &[(Actuator::Humidifier, HoldReason::InvalidInput(Field::Humidity))]
    );
    // Raw value still published for diagnostics.
    assert_eq!(rig.telemetry.value("greenhouse/controlled/humidity"), Some("150"));
    assert!(rig.sink.events.iter().any(|e| matches!(
        e,
        AppEvent::ControllerHeld { actuator: Actuator::Humidifier, .. }
    )));
}

#[test]
fn status_republished_every_interval() {
    let mut rig = Rig::with_control(ControlConfig {
        status_interval_ms: 1,
        ..ControlConfig::default()
    });
    rig.frames.set_state(ConnectionState::Disconnected);
    rig.tick();
    std::thread::sleep(Duration::from_millis(5));
    rig.tick();
    assert_eq!(
        rig.telemetry.statuses,
        vec![SystemStatus::Offline, SystemStatus::Offline]
    );
    // No change, so no StatusChanged event.
    assert!(!rig.sink.events.iter().any(|e| matches!(e, AppEvent::StatusChanged { .. })));
}

#[test]
fn status_not_republished_within_interval() {
    let mut rig = Rig::new();
    rig.frames.set_state(ConnectionState::Disconnected);
    rig.tick();
    rig.tick();
    assert_eq!(rig.telemetry.statuses, vec![SystemStatus::Offline]);
}

#[test]
fn record_failure_is_reported_not_fatal() {
    let mut rig = Rig::new();
    rig.records.fail = true;
    rig.frames.push(SETPOINT_LINE, FRESH);
    let out = rig.tick();
    assert_eq!(out.inferred, Some(1));
    assert!(rig
        .sink
        .events
        .iter()
        .any(|e| matches!(e, AppEvent::RecordFailed(_))));
}
