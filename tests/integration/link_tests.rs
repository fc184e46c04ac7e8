//! LinkManager integration tests with scripted transports.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use greenhouse::connection::{Backoff, ConnectionState};
use greenhouse::error::LinkError;
use greenhouse::link::{LinkHandle, LinkManager};
use greenhouse::sensors::{Field, FrameCodec};
use greenhouse::shutdown::Shutdown;

use super::mock_hw::*;

fn line(s: &str) -> Result<Option<String>, LinkError> {
    Ok(Some(s.to_string()))
}

/// Run a manager over `sessions` until the script ends.
fn run(sessions: Vec<Option<LineScript>>, backoff: Backoff) -> (LinkHandle, Vec<Instant>) {
    let shutdown = Shutdown::new();
    let opens = Arc::new(Mutex::new(Vec::new()));
    let connector = ScriptedConnector {
        sessions: VecDeque::from(sessions),
        opens: Arc::clone(&opens),
        shutdown: shutdown.clone(),
    };
    let manager = LinkManager::new(
        connector,
        FrameCodec::default(),
        backoff,
        Duration::ZERO,
        shutdown.clone(),
    );
    let handle = manager.handle();
    let thread = manager.spawn().unwrap();

    // Safety net: never let a broken script hang the test run.
    let watchdog = shutdown.clone();
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_secs(10));
        watchdog.trigger();
    });

    thread.join().unwrap();
    let opens = opens.lock().unwrap().clone();
    (handle, opens)
}

fn fast_backoff() -> Backoff {
    Backoff::new(Duration::from_millis(1), Duration::from_millis(4))
}

#[test]
fn reference_line_lands_in_slot() {
    let script: LineScript = [line(SETPOINT_LINE)].into();
    let (handle, _) = run(vec![Some(script)], fast_backoff());

    let latest = handle.latest().unwrap();
    assert!(latest.pair.controlled.valid());
    assert!(latest.pair.control.valid());
    assert_eq!(latest.pair.controlled.raw(Field::Co2), 800.0);
    assert_eq!(latest.pair.control.raw(Field::Temperature), 26.0);
    assert_eq!(latest.pair.control.raw(Field::Moisture), 62.0);
    assert_eq!(handle.state(), ConnectionState::Disconnected);
}

#[test]
fn malformed_lines_keep_previous_frame_without_reconnect() {
    let script: LineScript = [
        line(SETPOINT_LINE),
        line("Controlled|25,85,800,150,65"),
        line("Controlled|a,85,800,150,65;Control|26,78,820,140,62"),
        line("Greenhouse|25,85,800,150,65;Control|26,78,820,140,62"),
        Ok(None),
    ]
    .into();
    let (handle, opens) = run(vec![Some(script)], fast_backoff());

    assert_eq!(opens.len(), 1, "parse errors must not reconnect");
    assert_eq!(handle.latest().unwrap().seq, 1);
    assert_eq!(handle.rejected(), 3);
}

#[test]
fn transport_error_reconnects_and_resumes() {
    let first: LineScript = [
        line(SETPOINT_LINE),
        Err(LinkError::Io(std::io::ErrorKind::BrokenPipe)),
    ]
    .into();
    let second: LineScript =
        [line("Controlled|26,80,900,120,60;Control|26,78,820,140,62")].into();
    let (handle, opens) = run(vec![Some(first), None, Some(second)], fast_backoff());

    assert_eq!(opens.len(), 3);
    let latest = handle.latest().unwrap();
    assert_eq!(latest.seq, 2);
    assert_eq!(latest.pair.controlled.raw(Field::Light), 120.0);
}

#[test]
fn failed_opens_back_off_exponentially() {
    let backoff = Backoff::new(Duration::from_millis(20), Duration::from_millis(80));
    let (_, opens) = run(vec![None, None, None, None], backoff);

    // Four scripted failures plus the exhausting attempt.
    assert_eq!(opens.len(), 5);
    let gaps: Vec<Duration> = opens.windows(2).map(|w| w[1] - w[0]).collect();
    let floors = [20, 40, 80, 80];
    for (gap, floor) in gaps.iter().zip(floors) {
        assert!(*gap >= Duration::from_millis(floor), "gap {gap:?} < {floor} ms");
    }
}

#[test]
fn shutdown_interrupts_backoff_wait() {
    let shutdown = Shutdown::new();
    let connector = ScriptedConnector {
        sessions: VecDeque::from(vec![None; 100]),
        opens: Arc::new(Mutex::new(Vec::new())),
        shutdown: shutdown.clone(),
    };
    let manager = LinkManager::new(
        connector,
        FrameCodec::default(),
        Backoff::new(Duration::from_secs(30), Duration::from_secs(30)),
        Duration::ZERO,
        shutdown.clone(),
    );
    let handle = manager.handle();
    let thread = manager.spawn().unwrap();

    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(handle.state(), ConnectionState::Backoff);

    let start = Instant::now();
    shutdown.trigger();
    thread.join().unwrap();
    assert!(start.elapsed() < Duration::from_secs(5));
    assert_eq!(handle.state(), ConnectionState::Disconnected);
}
