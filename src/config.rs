//! Startup configuration.
//!
//! Loaded once from a JSON file through a [`ConfigPort`](crate::app::ports::ConfigPort)
//! and immutable for the process lifetime.  Every section carries
//! `#[serde(default)]` so a partial file only overrides what it names.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::sensors::{Field, SensorRanges};

/// Complete controller configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreenhouseConfig {
    pub serial: SerialConfig,
    pub broker: BrokerConfig,
    pub control: ControlConfig,
    pub setpoints: Setpoints,
    pub backoff: BackoffConfig,
    pub ranges: SensorRanges,
    pub storage: StorageConfig,
}

// --- Serial ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device path, e.g. `/dev/ttyUSB0` or `COM3`
    pub device: String,
    pub baud: u32,
    /// Blocking read timeout; also bounds shutdown latency of the link thread
    pub read_timeout_ms: u64,
    /// Wait after opening while the microcontroller resets
    pub settle_ms: u64,
    /// Try other detected ports when `device` cannot be opened
    pub scan_fallback: bool,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".into(),
            baud: 115_200,
            read_timeout_ms: 1000,
            settle_ms: 2000,
            scan_fallback: true,
        }
    }
}

// --- Broker ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub client_id: String,
    pub keep_alive_secs: u64,
    /// Minimum spacing between connection attempts
    pub reconnect_interval_ms: u64,
    /// Network event poll granularity
    pub poll_interval_ms: u64,
    /// Give up on a pending CONNACK after this long
    pub connect_timeout_ms: u64,
    /// Outbound message queue depth (bounded by the compiled capacity)
    pub queue_depth: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "test.mosquitto.org".into(),
            port: 1883,
            client_id: "greenhouse_pi".into(),
            keep_alive_secs: 30,
            reconnect_interval_ms: 5000,
            poll_interval_ms: 100,
            connect_timeout_ms: 10_000,
            queue_depth: 64,
        }
    }
}

// --- Control loop ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    pub tick_ms: u64,
    /// A frame older than this is stale; commands are held
    pub staleness_ms: u64,
    /// Heartbeat period for the system status topic
    pub status_interval_ms: u64,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_ms: 1000,
            staleness_ms: 5000,
            status_interval_ms: 1000,
        }
    }
}

impl ControlConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn staleness(&self) -> Duration {
        Duration::from_millis(self.staleness_ms)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }
}

// --- Setpoints ---

/// Target value per field for the controlled section.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Setpoints {
    pub temperature: f32,
    pub humidity: f32,
    pub co2: f32,
    pub light: f32,
    pub moisture: f32,
}

impl Default for Setpoints {
    fn default() -> Self {
        Self {
            temperature: 25.0,
            humidity: 85.0,
            co2: 800.0,
            light: 150.0,
            moisture: 65.0,
        }
    }
}

impl Setpoints {
    pub fn get(&self, field: Field) -> f32 {
        match field {
            Field::Temperature => self.temperature,
            Field::Humidity => self.humidity,
            Field::Co2 => self.co2,
            Field::Light => self.light,
            Field::Moisture => self.moisture,
        }
    }
}

// --- Backoff ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackoffConfig {
    pub initial_ms: u64,
    pub ceiling_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_ms: 1000,
            ceiling_ms: 30_000,
        }
    }
}

// --- Storage ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// CSV file receiving one row per fresh frame; empty disables.
    pub record_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            record_path: "data/training_data.csv".into(),
        }
    }
}

// --- Validation ---

impl GreenhouseConfig {
    /// Reject parameters no loop could run with.  Checks are syntactic:
    /// the device and broker are not contacted here.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fail = |msg| Err(ConfigError::ValidationFailed(msg));

        if self.serial.device.trim().is_empty() {
            return fail("serial.device is empty");
        }
        if self.serial.baud == 0 {
            return fail("serial.baud must be > 0");
        }
        if self.serial.read_timeout_ms == 0 {
            return fail("serial.read_timeout_ms must be > 0");
        }

        if self.broker.host.trim().is_empty() {
            return fail("broker.host is empty");
        }
        if self.broker.port == 0 {
            return fail("broker.port must be > 0");
        }
        if self.broker.client_id.is_empty() {
            return fail("broker.client_id is empty");
        }
        if self.broker.poll_interval_ms == 0 || self.broker.connect_timeout_ms == 0 {
            return fail("broker poll/connect timeouts must be > 0");
        }
        if self.broker.queue_depth == 0 {
            return fail("broker.queue_depth must be > 0");
        }

        if self.control.tick_ms == 0 {
            return fail("control.tick_ms must be > 0");
        }
        if self.control.staleness_ms == 0 {
            return fail("control.staleness_ms must be > 0");
        }
        if self.control.status_interval_ms == 0 {
            return fail("control.status_interval_ms must be > 0");
        }

        if self.backoff.initial_ms == 0 {
            return fail("backoff.initial_ms must be > 0");
        }
        if self.backoff.initial_ms > self.backoff.ceiling_ms {
            return fail("backoff.initial_ms exceeds backoff.ceiling_ms");
        }

        for field in Field::ALL {
            let b = self.ranges.bounds(field);
            if !(b.min.is_finite() && b.max.is_finite() && b.min <= b.max) {
                return fail("sensor range is inverted or not finite");
            }
            if !b.contains(self.setpoints.get(field)) {
                return fail("setpoint lies outside its sensor range");
            }
        }

        Ok(())
    }
}
