//! Training-data record, one per fresh frame.

use core::fmt::Write;

use chrono::{DateTime, Local};

use crate::control::{Actuator, CycleCommands};
use crate::sensors::{Field, FramePair, Section};

/// Wall-clock format shared by records and the timestamp topic.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Both sections' readings plus the commands computed from them.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleRecord {
    pub timestamp: DateTime<Local>,
    pub pair: FramePair,
    /// Duty per actuator, in [`Actuator::ALL`] order.
    pub duties: [f32; 4],
}

impl CycleRecord {
    pub fn new(pair: FramePair, commands: &CycleCommands, timestamp: DateTime<Local>) -> Self {
        Self {
            timestamp,
            pair,
            duties: commands.duties(),
        }
    }

    /// Column names, matching [`to_csv_row`](Self::to_csv_row).
    pub fn csv_header() -> String {
        let mut out = String::from("timestamp");
        for section in Section::ALL {
            for field in Field::ALL {
                let _ = write!(out, ",{}_{}", section.slug(), field.name());
            }
            let _ = write!(out, ",{}_valid", section.slug());
        }
        for actuator in Actuator::ALL {
            let _ = write!(out, ",{}_duty", actuator.name());
        }
        out
    }

    pub fn to_csv_row(&self) -> String {
        let mut out = self.timestamp.format(TIMESTAMP_FORMAT).to_string();
        for section in Section::ALL {
            let frame = self.pair.section(section);
            for field in Field::ALL {
                let _ = write!(out, ",{}", frame.raw(field));
            }
            let _ = write!(out, ",{}", u8::from(frame.valid()));
        }
        for duty in self.duties {
            let _ = write!(out, ",{duty:.2}");
        }
        out
    }
}
