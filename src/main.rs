//! Greenhouse controller, main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  SerialConnector  MqttConnector  LogActuators  CsvRecordLog  │
//! │  (link thread)    (telemetry     (ActuatorPort)(RecordSink)  │
//! │                    thread)       LogEventSink  JsonConfigFile│
//! │                                                              │
//! │  ─────────────────── Port Trait Boundary ──────────────────  │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │          ControlService (main thread, pure logic)      │  │
//! │  │   status · Mamdani inference · hold policy             │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  TickScheduler (fixed period) · Shutdown (Ctrl-C)            │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{error, info};

use greenhouse::adapters::actuators::LogActuators;
use greenhouse::adapters::config_file::JsonConfigFile;
use greenhouse::adapters::csv_log::{CsvRecordLog, NullRecordSink};
use greenhouse::adapters::log_sink::LogEventSink;
use greenhouse::adapters::mqtt::MqttConnector;
use greenhouse::adapters::serial::SerialConnector;
use greenhouse::app::ports::{ActuatorPort, ConfigPort, EventSink, FrameSource, RecordSink, TelemetryPort};
use greenhouse::app::service::ControlService;
use greenhouse::config::GreenhouseConfig;
use greenhouse::connection::Backoff;
use greenhouse::link::LinkManager;
use greenhouse::scheduler::TickScheduler;
use greenhouse::sensors::FrameCodec;
use greenhouse::shutdown::Shutdown;
use greenhouse::telemetry::{Publisher, PublisherSettings};

const DEFAULT_CONFIG: &str = "greenhouse.json";

fn main() -> Result<()> {
    // ── 1. Logging ────────────────────────────────────────────
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!("Greenhouse controller v{}", env!("CARGO_PKG_VERSION"));

    // ── 2. Configuration + rule tables (fatal on error) ───────
    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_CONFIG.into());
    let config = load_config(&path).with_context(|| format!("configuration {path}"))?;
    let mut service = build_service(&config).context("fuzzy rule tables")?;

    // ── 3. Shutdown signal ────────────────────────────────────
    let shutdown = Shutdown::new();
    {
        let shutdown = shutdown.clone();
        ctrlc::set_handler(move || {
            info!("Shutdown requested");
            shutdown.trigger();
        })
        .context("installing Ctrl-C handler")?;
    }

    // ── 4. Link + telemetry workers ───────────────────────────
    let link = LinkManager::new(
        SerialConnector::new(&config.serial),
        FrameCodec::new(config.ranges),
        Backoff::new(
            Duration::from_millis(config.backoff.initial_ms),
            Duration::from_millis(config.backoff.ceiling_ms),
        ),
        Duration::from_millis(config.serial.settle_ms),
        shutdown.clone(),
    );
    let frames = link.handle();
    let link_thread = link.spawn().context("spawning link thread")?;

    let publisher = Publisher::new(
        MqttConnector::new(&config.broker),
        PublisherSettings::from(&config.broker),
        shutdown.clone(),
    );
    let mut telemetry = publisher.handle();
    let telemetry_thread = publisher.spawn().context("spawning telemetry thread")?;

    // ── 5. Control loop on this thread ────────────────────────
    let mut actuators = LogActuators::new();
    let mut sink = LogEventSink::new();
    let mut control = ControlLoop {
        service: &mut service,
        frames: &frames,
        actuators: &mut actuators,
        telemetry: &mut telemetry,
        sink: &mut sink,
        shutdown: &shutdown,
    };
    let tick = config.control.tick();
    if config.storage.record_path.is_empty() {
        control.run(tick, &mut NullRecordSink);
    } else {
        control.run(tick, &mut CsvRecordLog::new(&config.storage.record_path));
    }

    // ── 6. Release workers ────────────────────────────────────
    shutdown.trigger();
    join("link", link_thread);
    join("telemetry", telemetry_thread);
    info!(
        "Stopped after {} ticks ({} frames accepted, {} rejected, {} messages published)",
        service.tick_count(),
        frames.accepted(),
        frames.rejected(),
        telemetry.sent()
    );
    Ok(())
}

fn load_config(path: &str) -> greenhouse::error::Result<GreenhouseConfig> {
    Ok(JsonConfigFile::new(path).load()?)
}

fn build_service(config: &GreenhouseConfig) -> greenhouse::error::Result<ControlService> {
    Ok(ControlService::new(&config.control, config.setpoints)?)
}

fn join(name: &str, handle: JoinHandle<()>) {
    if handle.join().is_err() {
        error!("{name} thread panicked");
    }
}

struct ControlLoop<'a, F, A, T, E> {
    service: &'a mut ControlService,
    frames: &'a F,
    actuators: &'a mut A,
    telemetry: &'a mut T,
    sink: &'a mut E,
    shutdown: &'a Shutdown,
}

impl<F, A, T, E> ControlLoop<'_, F, A, T, E>
where
    F: FrameSource,
    A: ActuatorPort,
    T: TelemetryPort,
    E: EventSink,
{
    fn run(&mut self, tick: Duration, records: &mut impl RecordSink) {
        let mut scheduler = TickScheduler::new(tick, Instant::now());
        self.service.start(tick, self.sink);

        while !self.shutdown.wait(scheduler.until_next(Instant::now())) {
            let started = Instant::now();
            self.service
                .tick(self.frames, self.actuators, self.telemetry, records, self.sink);
            scheduler.complete(started, Instant::now());
        }

        info!(
            "Control loop stopped: {} ticks, {} overruns, worst {} ms",
            scheduler.ticks(),
            scheduler.overruns(),
            scheduler.worst().as_millis()
        );
    }
}
