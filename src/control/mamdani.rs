//! Generic Mamdani inference over static rule tables.
//!
//! Per call:
//! 1. **Fuzzify** each input (clamped into its universe) against every
//!    term of its variable.
//! 2. **Fire** each rule: `min` over clauses for AND, `max` for OR.
//! 3. **Aggregate** per output term with `max`; each term's shape is
//!    clipped at that strength and the clipped shapes are unioned.
//! 4. **Defuzzify** by centroid, sampling the output universe every
//!    [`DEFUZZ_STEP`].
//!
//! Tables are `'static` data resolved to indices once in
//! [`MamdaniController::new`]; a table that references a missing term
//! or input is rejected there instead of misbehaving at runtime.

use core::fmt;

use heapless::Vec;

use crate::error::FuzzyError;

use super::membership::Shape;

pub const MAX_INPUTS: usize = 4;
pub const MAX_TERMS: usize = 8;
pub const MAX_CLAUSES: usize = 4;
pub const MAX_RULES: usize = 16;

/// Output sampling resolution for the centroid integral.
pub const DEFUZZ_STEP: f32 = 0.1;

// ───────────────────────────────────────────────────────────────
// Table types
// ───────────────────────────────────────────────────────────────

/// Linguistic terms used across every greenhouse variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Term {
    Cold,
    Normal,
    Hot,
    Low,
    Ok,
    High,
    Bright,
    Dark,
    Wet,
    Dry,
    Off,
    Med,
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TermDef {
    pub term: Term,
    pub shape: Shape,
}

/// A fuzzy variable: a universe and the terms defined over it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Variable {
    pub name: &'static str,
    pub min: f32,
    pub max: f32,
    pub terms: &'static [TermDef],
}

impl Variable {
    fn term_index(&self, term: Term) -> Option<usize> {
        self.terms.iter().position(|t| t.term == term)
    }

    fn validate(&self) -> Result<(), FuzzyError> {
        if !(self.min.is_finite() && self.max.is_finite() && self.min < self.max) {
            return Err(FuzzyError::Universe { variable: self.name });
        }
        if self.terms.is_empty() || self.terms.len() > MAX_TERMS {
            return Err(FuzzyError::TermCount { variable: self.name });
        }
        if self.terms.iter().any(|t| !t.shape.is_ordered()) {
            return Err(FuzzyError::Shape { variable: self.name });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

/// `input is term`.  `input` indexes [`ControllerDef::inputs`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clause {
    pub input: usize,
    pub term: Term,
}

/// `IF clause (AND|OR clause)* THEN output is term`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rule {
    pub connective: Connective,
    pub clauses: &'static [Clause],
    pub output: Term,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerDef {
    pub name: &'static str,
    pub inputs: &'static [Variable],
    pub output: Variable,
    pub rules: &'static [Rule],
}

// ───────────────────────────────────────────────────────────────
// Controller
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
struct ResolvedRule {
    connective: Connective,
    /// `(input index, term index within that input)`.
    clauses: Vec<(usize, usize), MAX_CLAUSES>,
    /// Term index within the output variable.
    output: usize,
}

/// Result of one inference.
#[derive(Debug, Clone, PartialEq)]
pub struct Inference {
    /// Defuzzified crisp output.
    pub output: f32,
    /// Aggregated firing strength per output term.
    pub strengths: Vec<(Term, f32), MAX_TERMS>,
}

/// A validated Mamdani controller.  Stateless: identical inputs give
/// bit-identical outputs.
#[derive(Debug, Clone)]
pub struct MamdaniController {
    def: &'static ControllerDef,
    rules: Vec<ResolvedRule, MAX_RULES>,
    samples: usize,
}

impl MamdaniController {
    pub fn new(def: &'static ControllerDef) -> Result<Self, FuzzyError> {
        let controller = def.name;
        if def.inputs.is_empty() || def.inputs.len() > MAX_INPUTS {
            return Err(FuzzyError::InputCount { controller });
        }
        for var in def.inputs {
            var.validate()?;
        }
        def.output.validate()?;
        if def.rules.is_empty() || def.rules.len() > MAX_RULES {
            return Err(FuzzyError::NoRules { controller });
        }

        let mut rules = Vec::new();
        for (idx, rule) in def.rules.iter().enumerate() {
            if rule.clauses.is_empty() || rule.clauses.len() > MAX_CLAUSES {
                return Err(FuzzyError::ClauseCount { controller, rule: idx });
            }
            let mut clauses = Vec::new();
            for clause in rule.clauses {
                let var = def
                    .inputs
                    .get(clause.input)
                    .ok_or(FuzzyError::UnknownInput { controller, rule: idx })?;
                let term = var
                    .term_index(clause.term)
                    .ok_or(FuzzyError::UnknownTerm { controller, rule: idx })?;
                clauses
                    .push((clause.input, term))
                    .map_err(|_| FuzzyError::ClauseCount { controller, rule: idx })?;
            }
            let output = def
                .output
                .term_index(rule.output)
                .ok_or(FuzzyError::UnknownTerm { controller, rule: idx })?;
            rules
                .push(ResolvedRule {
                    connective: rule.connective,
                    clauses,
                    output,
                })
                .map_err(|_| FuzzyError::NoRules { controller })?;
        }

        let samples = ((def.output.max - def.output.min) / DEFUZZ_STEP).round() as usize + 1;

        Ok(Self {
            def,
            rules,
            samples,
        })
    }

    pub fn name(&self) -> &'static str {
        self.def.name
    }

    pub fn input_count(&self) -> usize {
        self.def.inputs.len()
    }

    pub fn output_range(&self) -> (f32, f32) {
        (self.def.output.min, self.def.output.max)
    }

    /// Run inference.  Returns `None` when the input count is wrong, an
    /// input is NaN, or no rule fires (empty aggregate).
    pub fn infer(&self, inputs: &[f32]) -> Option<Inference> {
        if inputs.len() != self.def.inputs.len() {
            return None;
        }

        // 1. Fuzzification
        let mut degrees = [[0.0_f32; MAX_TERMS]; MAX_INPUTS];
        for (i, (var, &x)) in self.def.inputs.iter().zip(inputs).enumerate() {
            if x.is_nan() {
                return None;
            }
            let x = x.clamp(var.min, var.max);
            for (t, term) in var.terms.iter().enumerate() {
                degrees[i][t] = term.shape.degree(x);
            }
        }

        // 2. Rule evaluation + 3. max aggregation
        let mut strength = [0.0_f32; MAX_TERMS];
        for rule in &self.rules {
            let mut clause_degrees = rule.clauses.iter().map(|&(i, t)| degrees[i][t]);
            let first = clause_degrees.next().unwrap_or(0.0);
            let fired = match rule.connective {
                Connective::And => clause_degrees.fold(first, f32::min),
                Connective::Or => clause_degrees.fold(first, f32::max),
            };
            strength[rule.output] = strength[rule.output].max(fired);
        }

        // 4. Centroid defuzzification
        let output = self.centroid(&strength)?;

        let strengths = self
            .def
            .output
            .terms
            .iter()
            .zip(strength)
            .map(|(t, s)| (t.term, s))
            .collect();

        Some(Inference { output, strengths })
    }

    fn centroid(&self, strength: &[f32; MAX_TERMS]) -> Option<f32> {
        let out = &self.def.output;
        let mut num = 0.0_f64;
        let mut den = 0.0_f64;
        for i in 0..self.samples {
            let x = (out.min + i as f32 * DEFUZZ_STEP).min(out.max);
            let mu = out
                .terms
                .iter()
                .zip(strength)
                .map(|(t, &s)| s.min(t.shape.degree(x)))
                .fold(0.0_f32, f32::max);
            num += f64::from(x) * f64::from(mu);
            den += f64::from(mu);
        }
        if den <= 0.0 {
            return None;
        }
        Some(((num / den) as f32).clamp(out.min, out.max))
    }
}
