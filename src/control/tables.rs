//! The four greenhouse controllers as static rule tables.
//!
//! Every input is an error relative to its setpoint.  Temperature,
//! humidity and CO₂ use `measured - setpoint` (positive = too much);
//! light and moisture use `setpoint - measured` (positive = not enough),
//! so `Dark` and `Dry` sit on the positive side of their universes.

use crate::sensors::Field;

use super::Actuator;
use super::mamdani::{Clause, Connective, ControllerDef, Rule, Term, TermDef, Variable};
use super::membership::Shape;

/// How a reading becomes a controller input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    /// `measured - setpoint`
    Excess,
    /// `setpoint - measured`
    Deficit,
}

impl Sense {
    pub fn error(self, measured: f32, setpoint: f32) -> f32 {
        match self {
            Self::Excess => measured - setpoint,
            Self::Deficit => setpoint - measured,
        }
    }
}

/// Binds a controller input slot to a sensor field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Source {
    pub field: Field,
    pub sense: Sense,
}

/// A controller definition plus the wiring from sensor fields to its
/// inputs.  `sources[i]` feeds `def.inputs[i]`.
#[derive(Debug, Clone, Copy)]
pub struct GreenhouseController {
    pub actuator: Actuator,
    pub def: &'static ControllerDef,
    pub sources: &'static [Source],
}

// ---------------------------------------------------------------------------
// Variables
// ---------------------------------------------------------------------------

const fn term(term: Term, shape: Shape) -> TermDef {
    TermDef { term, shape }
}

const TEMP_ERROR: Variable = Variable {
    name: "temp_error",
    min: -5.0,
    max: 5.0,
    terms: &[
        term(Term::Cold, Shape::tri(-5.0, -5.0, 0.0)),
        term(Term::Normal, Shape::tri(-1.0, 0.0, 1.0)),
        term(Term::Hot, Shape::tri(0.0, 5.0, 5.0)),
    ],
};

const HUM_ERROR: Variable = Variable {
    name: "hum_error",
    min: -30.0,
    max: 30.0,
    terms: &[
        term(Term::Low, Shape::tri(-30.0, -30.0, 0.0)),
        term(Term::Ok, Shape::tri(-10.0, 0.0, 10.0)),
        term(Term::High, Shape::tri(0.0, 30.0, 30.0)),
    ],
};

const CO2_ERROR: Variable = Variable {
    name: "co2_error",
    min: -1000.0,
    max: 1000.0,
    terms: &[
        term(Term::Low, Shape::tri(-1000.0, -1000.0, 0.0)),
        term(Term::Ok, Shape::tri(-300.0, 0.0, 300.0)),
        term(Term::High, Shape::tri(0.0, 1000.0, 1000.0)),
    ],
};

const LIGHT_DEFICIT: Variable = Variable {
    name: "light_deficit",
    min: -200.0,
    max: 200.0,
    terms: &[
        term(Term::Bright, Shape::tri(-200.0, -200.0, 0.0)),
        term(Term::Ok, Shape::tri(-50.0, 0.0, 50.0)),
        term(Term::Dark, Shape::tri(0.0, 200.0, 200.0)),
    ],
};

const MOISTURE_DEFICIT: Variable = Variable {
    name: "moisture_deficit",
    min: -40.0,
    max: 40.0,
    terms: &[
        term(Term::Wet, Shape::tri(-40.0, -40.0, 0.0)),
        term(Term::Ok, Shape::tri(-10.0, 0.0, 10.0)),
        term(Term::Dry, Shape::tri(0.0, 40.0, 40.0)),
    ],
};

// Fan and humidifier share one output partition.
const CLIMATE_DUTY: [TermDef; 4] = [
    term(Term::Off, Shape::tri(0.0, 0.0, 25.0)),
    term(Term::Low, Shape::tri(20.0, 40.0, 60.0)),
    term(Term::Med, Shape::tri(50.0, 70.0, 90.0)),
    term(Term::High, Shape::tri(80.0, 100.0, 100.0)),
];

const FAN_DUTY: Variable = Variable {
    name: "fan",
    min: 0.0,
    max: 100.0,
    terms: &CLIMATE_DUTY,
};

const HUMIDIFIER_DUTY: Variable = Variable {
    name: "humidifier",
    min: 0.0,
    max: 100.0,
    terms: &CLIMATE_DUTY,
};

const LED_DUTY: Variable = Variable {
    name: "led",
    min: 0.0,
    max: 100.0,
    terms: &[
        term(Term::Off, Shape::tri(0.0, 0.0, 20.0)),
        term(Term::Low, Shape::tri(15.0, 35.0, 55.0)),
        term(Term::Med, Shape::tri(50.0, 70.0, 90.0)),
        term(Term::High, Shape::tri(80.0, 100.0, 100.0)),
    ],
};

const PUMP_DUTY: Variable = Variable {
    name: "pump",
    min: 0.0,
    max: 100.0,
    terms: &[
        term(Term::Off, Shape::tri(0.0, 0.0, 20.0)),
        term(Term::Low, Shape::tri(15.0, 35.0, 55.0)),
        term(Term::High, Shape::tri(50.0, 75.0, 100.0)),
    ],
};

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

const fn is(input: usize, term: Term) -> Clause {
    Clause { input, term }
}

const fn when(clauses: &'static [Clause], output: Term) -> Rule {
    Rule {
        connective: Connective::And,
        clauses,
        output,
    }
}

// Fan inputs: 0 = temp_error, 1 = co2_error.
static FAN: ControllerDef = ControllerDef {
    name: "fan",
    inputs: &[TEMP_ERROR, CO2_ERROR],
    output: FAN_DUTY,
    rules: &[
        when(&[is(0, Term::Cold), is(1, Term::Low)], Term::Off),
        when(&[is(0, Term::Cold), is(1, Term::Ok)], Term::Low),
        when(&[is(0, Term::Cold), is(1, Term::High)], Term::Med),
        when(&[is(0, Term::Normal), is(1, Term::Low)], Term::Low),
        when(&[is(0, Term::Normal), is(1, Term::Ok)], Term::Low),
        when(&[is(0, Term::Normal), is(1, Term::High)], Term::High),
        when(&[is(0, Term::Hot), is(1, Term::Low)], Term::Med),
        when(&[is(0, Term::Hot), is(1, Term::Ok)], Term::High),
        when(&[is(0, Term::Hot), is(1, Term::High)], Term::High),
    ],
};

// Humidifier inputs: 0 = temp_error, 1 = hum_error.
static HUMIDIFIER: ControllerDef = ControllerDef {
    name: "humidifier",
    inputs: &[TEMP_ERROR, HUM_ERROR],
    output: HUMIDIFIER_DUTY,
    rules: &[
        when(&[is(1, Term::High)], Term::Off),
        when(&[is(1, Term::Ok)], Term::Low),
        when(&[is(1, Term::Low)], Term::High),
        when(&[is(0, Term::Hot), is(1, Term::Low)], Term::High),
        when(&[is(0, Term::Cold), is(1, Term::High)], Term::Off),
        when(&[is(0, Term::Normal), is(1, Term::Low)], Term::Med),
    ],
};

static LED: ControllerDef = ControllerDef {
    name: "led",
    inputs: &[LIGHT_DEFICIT],
    output: LED_DUTY,
    rules: &[
        when(&[is(0, Term::Bright)], Term::Off),
        when(&[is(0, Term::Ok)], Term::Low),
        when(&[is(0, Term::Dark)], Term::High),
    ],
};

static PUMP: ControllerDef = ControllerDef {
    name: "pump",
    inputs: &[MOISTURE_DEFICIT],
    output: PUMP_DUTY,
    rules: &[
        when(&[is(0, Term::Wet)], Term::Off),
        when(&[is(0, Term::Ok)], Term::Off),
        when(&[is(0, Term::Dry)], Term::High),
    ],
};

const fn excess(field: Field) -> Source {
    Source {
        field,
        sense: Sense::Excess,
    }
}

const fn deficit(field: Field) -> Source {
    Source {
        field,
        sense: Sense::Deficit,
    }
}

/// All controllers, in [`Actuator::ALL`] order.
pub static GREENHOUSE: [GreenhouseController; 4] = [
    GreenhouseController {
        actuator: Actuator::Fan,
        def: &FAN,
        sources: &[excess(Field::Temperature), excess(Field::Co2)],
    },
    GreenhouseController {
        actuator: Actuator::Humidifier,
        def: &HUMIDIFIER,
        sources: &[excess(Field::Temperature), excess(Field::Humidity)],
    },
    GreenhouseController {
        actuator: Actuator::Led,
        def: &LED,
        sources: &[deficit(Field::Light)],
    },
    GreenhouseController {
        actuator: Actuator::Pump,
        def: &PUMP,
        sources: &[deficit(Field::Moisture)],
    },
];
