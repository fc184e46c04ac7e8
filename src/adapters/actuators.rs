//! Actuator adapter standing in for the PWM driver board.
//!
//! Logs the duty and 8-bit PWM value whenever an actuator's PWM value
//! changes; repeated identical commands stay quiet.

use log::info;

use crate::app::ports::ActuatorPort;
use crate::control::{Actuator, ActuatorCommand};

#[derive(Debug, Default)]
pub struct LogActuators {
    last_pwm: [Option<u8>; 4],
}

impl LogActuators {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last PWM value written to `actuator`, if any.
    pub fn pwm(&self, actuator: Actuator) -> Option<u8> {
        self.last_pwm[actuator.index()]
    }
}

impl ActuatorPort for LogActuators {
    fn set_duty(&mut self, command: &ActuatorCommand) {
        let pwm = command.pwm();
        let slot = &mut self.last_pwm[command.actuator.index()];
        if *slot != Some(pwm) {
            info!(
                "PWM | {} = {:.1}% ({pwm}/255)",
                command.actuator, command.duty_cycle
            );
            *slot = Some(pwm);
        }
    }
}
