//! Broker topic layout.
//!
//! ```text
//! greenhouse/timestamp
//! greenhouse/{controlled|control}/{temperature|humidity|co2|light|moisture}
//! greenhouse/actuators/{fan|humidifier|led|pump}
//! greenhouse/system/status            ONLINE | OFFLINE (retained)
//! ```

use core::fmt::Write;

use heapless::String;

use crate::control::Actuator;
use crate::sensors::{Field, Section};

pub const TOPIC_CAPACITY: usize = 64;

pub type Topic = String<TOPIC_CAPACITY>;

pub const ROOT: &str = "greenhouse";
pub const TIMESTAMP: &str = "greenhouse/timestamp";
pub const STATUS: &str = "greenhouse/system/status";

pub fn sensor(section: Section, field: Field) -> Topic {
    let mut t = Topic::new();
    // Longest is "greenhouse/controlled/temperature", well inside capacity.
    let _ = write!(t, "{ROOT}/{}/{}", section.slug(), field.name());
    t
}

pub fn actuator(actuator: Actuator) -> Topic {
    let mut t = Topic::new();
    let _ = write!(t, "{ROOT}/actuators/{}", actuator.name());
    t
}
