//! Runs the four greenhouse controllers against one section's readings.
//!
//! The only state is the last command per actuator, which is what a
//! controller falls back to when it cannot compute a fresh value:
//!
//! - one of its own inputs is invalid in the frame, or
//! - no rule fired (empty aggregate).
//!
//! A controller whose inputs are all valid is unaffected by another
//! controller holding.

use chrono::{DateTime, Local};
use heapless::Vec;
use log::debug;

use crate::config::Setpoints;
use crate::error::FuzzyError;
use crate::sensors::{Field, SensorFrame};

use super::mamdani::{MamdaniController, MAX_INPUTS};
use super::tables::{GreenhouseController, GREENHOUSE};
use super::{Actuator, ActuatorCommand};

/// Why a controller repeated its previous command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoldReason {
    /// The named input failed its range check.
    InvalidInput(Field),
    /// Every rule had zero firing strength.
    NoRuleFired,
}

/// Output of one engine pass.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleCommands {
    /// One command per actuator, in [`Actuator::ALL`] order.
    pub commands: [ActuatorCommand; 4],
    /// Controllers that held instead of computing.
    pub held: Vec<(Actuator, HoldReason), 4>,
}

impl CycleCommands {
    pub fn get(&self, actuator: Actuator) -> &ActuatorCommand {
        &self.commands[actuator.index()]
    }

    pub fn duties(&self) -> [f32; 4] {
        self.commands.map(|c| c.duty_cycle)
    }
}

struct Slot {
    wiring: &'static GreenhouseController,
    mamdani: MamdaniController,
    last: f32,
}

pub struct FuzzyEngine {
    setpoints: Setpoints,
    slots: Vec<Slot, 4>,
}

impl FuzzyEngine {
    /// Load and validate the greenhouse tables.
    pub fn new(setpoints: Setpoints) -> Result<Self, FuzzyError> {
        Self::with_tables(setpoints, &GREENHOUSE)
    }

    /// Load an explicit table set; `tables` must follow
    /// [`Actuator::ALL`] order.
    pub fn with_tables(
        setpoints: Setpoints,
        tables: &'static [GreenhouseController; 4],
    ) -> Result<Self, FuzzyError> {
        let mut slots = Vec::new();
        for wiring in tables {
            let mamdani = MamdaniController::new(wiring.def)?;
            if mamdani.input_count() != wiring.sources.len() {
                return Err(FuzzyError::InputCount {
                    controller: wiring.def.name,
                });
            }
            // Four tables into four slots cannot overflow.
            let _ = slots.push(Slot {
                wiring,
                mamdani,
                last: 0.0,
            });
        }
        Ok(Self { setpoints, slots })
    }

    pub fn setpoints(&self) -> &Setpoints {
        &self.setpoints
    }

    /// Previous command per actuator (0 before the first cycle).
    pub fn last_duties(&self) -> [f32; 4] {
        let mut out = [0.0; 4];
        for slot in &self.slots {
            out[slot.wiring.actuator.index()] = slot.last;
        }
        out
    }

    /// Compute fresh commands from `frame`, holding per controller where
    /// needed.
    pub fn compute(&mut self, frame: &SensorFrame, at: DateTime<Local>) -> CycleCommands {
        let mut held = Vec::new();

        for slot in &mut self.slots {
            let actuator = slot.wiring.actuator;
            match evaluate(slot, frame, &self.setpoints) {
                Ok(duty) => slot.last = duty,
                Err(reason) => {
                    debug!("{actuator}: holding {:.1}% ({reason:?})", slot.last);
                    let _ = held.push((actuator, reason));
                }
            }
        }

        CycleCommands {
            commands: self.commands_at(at),
            held,
        }
    }

    /// Previous commands re-stamped at `at`.  Used when no fresh frame is
    /// available.
    pub fn hold_all(&self, at: DateTime<Local>) -> CycleCommands {
        CycleCommands {
            commands: self.commands_at(at),
            held: Vec::new(),
        }
    }

    fn commands_at(&self, at: DateTime<Local>) -> [ActuatorCommand; 4] {
        let duties = self.last_duties();
        Actuator::ALL.map(|a| ActuatorCommand::new(a, duties[a.index()], at))
    }
}

fn evaluate(slot: &Slot, frame: &SensorFrame, setpoints: &Setpoints) -> Result<f32, HoldReason> {
    let mut inputs = [0.0_f32; MAX_INPUTS];
    let sources = slot.wiring.sources;
    for (input, source) in inputs.iter_mut().zip(sources) {
        let measured = frame
            .value(source.field)
            .ok_or(HoldReason::InvalidInput(source.field))?;
        *input = source.sense.error(measured, setpoints.get(source.field));
    }

    let inference = slot
        .mamdani
        .infer(&inputs[..sources.len()])
        .ok_or(HoldReason::NoRuleFired)?;
    debug!(
        "{}: {:.1}% strengths {:?}",
        slot.mamdani.name(),
        inference.output,
        inference.strengths
    );
    Ok(inference.output)
}
