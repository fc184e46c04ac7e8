//! Fuzzy actuator control.
//!
//! [`membership`] and [`mamdani`] are a small generic Mamdani engine;
//! [`tables`] holds the fixed greenhouse controllers; [`engine`] wires
//! frames and setpoints through them and applies the hold policy.

pub mod engine;
pub mod mamdani;
pub mod membership;
pub mod tables;

use core::fmt;

use chrono::{DateTime, Local};

pub use engine::{CycleCommands, FuzzyEngine, HoldReason};

/// The four driven actuators of the controlled section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Actuator {
    Fan,
    Humidifier,
    Led,
    Pump,
}

impl Actuator {
    pub const ALL: [Actuator; 4] = [
        Actuator::Fan,
        Actuator::Humidifier,
        Actuator::Led,
        Actuator::Pump,
    ];

    /// Topic segment and CSV column stem.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Fan => "fan",
            Self::Humidifier => "humidifier",
            Self::Led => "led",
            Self::Pump => "pump",
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Actuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Duty-cycle command for one actuator, produced once per cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ActuatorCommand {
    pub actuator: Actuator,
    /// Percent, `0.0..=100.0`.
    pub duty_cycle: f32,
    pub computed_at: DateTime<Local>,
}

impl ActuatorCommand {
    pub fn new(actuator: Actuator, duty_cycle: f32, computed_at: DateTime<Local>) -> Self {
        Self {
            actuator,
            duty_cycle: duty_cycle.clamp(0.0, 100.0),
            computed_at,
        }
    }

    /// 8-bit PWM value, truncated.
    pub fn pwm(&self) -> u8 {
        (self.duty_cycle / 100.0 * 255.0) as u8
    }
}
