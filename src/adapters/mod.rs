//! Adapters, concrete implementations of the hexagonal port traits and
//! I/O seams.
//!
//! | Adapter       | Implements        | Connects to                 |
//! |---------------|-------------------|-----------------------------|
//! | `actuators`   | ActuatorPort      | Log output (PWM stand-in)   |
//! | `config_file` | ConfigPort        | JSON file on disk           |
//! | `csv_log`     | RecordSink        | Append-only CSV file        |
//! | `log_sink`    | EventSink         | `log` facade                |
//! | `mqtt`        | BrokerConnector   | MQTT broker via `rumqttc`   |
//! | `serial`      | Connector         | Serial port via `serialport`|

pub mod actuators;
pub mod config_file;
pub mod csv_log;
pub mod log_sink;
pub mod mqtt;
pub mod serial;
