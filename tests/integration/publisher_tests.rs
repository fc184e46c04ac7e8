//! Publisher integration tests against a scripted broker.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use greenhouse::app::events::SystemStatus;
use greenhouse::app::ports::TelemetryPort;
use greenhouse::connection::ConnectionState;
use greenhouse::shutdown::Shutdown;
use greenhouse::telemetry::{Publisher, PublisherHandle, PublisherSettings};

use super::mock_hw::*;

const RECONNECT: Duration = Duration::from_millis(60);

struct Harness {
    handle: PublisherHandle,
    log: Arc<Mutex<BrokerLog>>,
    shutdown: Shutdown,
    thread: Option<JoinHandle<()>>,
}

impl Harness {
    fn start(plans: Vec<SessionPlan>) -> Self {
        let log = Arc::new(Mutex::new(BrokerLog::default()));
        let broker = ScriptedBroker {
            plans: VecDeque::from(plans),
            log: Arc::clone(&log),
        };
        let settings = PublisherSettings {
            reconnect_interval: RECONNECT,
            poll_interval: Duration::from_millis(2),
            connect_timeout: Duration::from_millis(20),
            queue_depth: 16,
        };
        let shutdown = Shutdown::new();
        let publisher = Publisher::new(broker, settings, shutdown.clone());
        let handle = publisher.handle();
        let thread = publisher.spawn().unwrap();
        Self {
            handle,
            log,
            shutdown,
            thread: Some(thread),
        }
    }

    fn wait_for(&self, what: &str, cond: impl Fn(&Self) -> bool) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while !cond(self) {
            assert!(Instant::now() < deadline, "timed out waiting for {what}");
            std::thread::sleep(Duration::from_millis(2));
        }
    }

    fn wait_connected(&self) {
        self.wait_for("connected", |h| h.handle.state() == ConnectionState::Connected);
    }

    fn connects(&self) -> usize {
        self.log.lock().unwrap().connects
    }

    fn published(&self) -> Vec<(String, String, bool)> {
        self.log.lock().unwrap().published.clone()
    }

    fn stop(&mut self) {
        self.shutdown.trigger();
        if let Some(thread) = self.thread.take() {
            thread.join().unwrap();
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        self.stop();
    }
}

fn status(value: &str) -> (String, String, bool) {
    ("greenhouse/system/status".to_string(), value.to_string(), true)
}

#[test]
fn refused_connect_waits_for_throttle() {
    let start = Instant::now();
    let h = Harness::start(vec![SessionPlan::Refuse]);
    h.wait_connected();
    assert_eq!(h.connects(), 2);
    assert!(start.elapsed() >= RECONNECT);
}

#[test]
fn missing_connack_times_out_and_retries() {
    let h = Harness::start(vec![SessionPlan::Silent]);
    h.wait_connected();
    assert_eq!(h.connects(), 2);
}

#[test]
fn messages_flow_once_connected() {
    let mut h = Harness::start(vec![SessionPlan::Refuse]);
    let mut port = h.handle.clone();

    // Dropped: the first attempt is refused.
    port.publish("greenhouse/timestamp", "early");
    assert_eq!(h.handle.dropped(), 1);

    h.wait_connected();
    port.publish("greenhouse/controlled/temperature", "25");
    port.publish("greenhouse/actuators/fan", "40.00");
    h.wait_for("two messages", |h| h.handle.sent() >= 2);
    h.stop();

    let published = h.published();
    assert!(!published.iter().any(|(_, p, _)| p == "early"));
    assert!(published.contains(&(
        "greenhouse/controlled/temperature".into(),
        "25".into(),
        false
    )));
    assert!(published.contains(&("greenhouse/actuators/fan".into(), "40.00".into(), false)));
}

#[test]
fn last_status_is_republished_on_every_connect() {
    let h = Harness::start(vec![SessionPlan::Refuse]);
    let mut port = h.handle.clone();
    port.publish_status(SystemStatus::Online);

    h.wait_connected();
    h.wait_for("status", |h| !h.published().is_empty());
    assert_eq!(h.published()[0], status("ONLINE"));
}

#[test]
fn dropped_session_reconnects_and_reannounces() {
    let h = Harness::start(vec![SessionPlan::Refuse, SessionPlan::AcceptFor { polls: 3 }]);
    let mut port = h.handle.clone();
    port.publish_status(SystemStatus::Offline);

    h.wait_for("third connect", |h| h.connects() >= 3);
    h.wait_for("re-announced status", |h| {
        h.published().iter().filter(|m| **m == status("OFFLINE")).count() >= 2
    });
}

#[test]
fn shutdown_publishes_offline_and_disconnects() {
    let mut h = Harness::start(vec![]);
    let mut port = h.handle.clone();
    h.wait_connected();
    port.publish_status(SystemStatus::Online);
    h.stop();

    let log = h.log.lock().unwrap();
    assert_eq!(log.published.last(), Some(&status("OFFLINE")));
    assert!(log.published.contains(&status("ONLINE")));
    assert_eq!(log.disconnects, 1);
    drop(log);
    assert_eq!(h.handle.state(), ConnectionState::Disconnected);
}
