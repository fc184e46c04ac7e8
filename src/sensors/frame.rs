//! Sensor readings for the two greenhouse sections.
//!
//! A [`FramePair`] is produced by one parse event and is immutable from
//! then on.  Field validity is tracked per field in a [`FieldMask`]: an
//! out-of-range value is kept for diagnostics but never handed to
//! inference.

use core::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Section / Field
// ---------------------------------------------------------------------------

/// Which greenhouse section a frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// The section driven by the fuzzy controllers.
    Controlled,
    /// The reference section, observed only.
    Control,
}

impl Section {
    pub const ALL: [Section; 2] = [Section::Controlled, Section::Control];

    /// Wire label.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Controlled => "Controlled",
            Self::Control => "Control",
        }
    }

    /// Lower-case form used in telemetry topics and CSV headers.
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Controlled => "controlled",
            Self::Control => "control",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Controlled" => Some(Self::Controlled),
            "Control" => Some(Self::Control),
            _ => None,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One of the five measured quantities, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Temperature,
    Humidity,
    Co2,
    Light,
    Moisture,
}

impl Field {
    /// Wire order.
    pub const ALL: [Field; 5] = [
        Field::Temperature,
        Field::Humidity,
        Field::Co2,
        Field::Light,
        Field::Moisture,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Temperature => "temperature",
            Self::Humidity => "humidity",
            Self::Co2 => "co2",
            Self::Light => "light",
            Self::Moisture => "moisture",
        }
    }

    pub const fn index(self) -> usize {
        self as usize
    }

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// FieldMask
// ---------------------------------------------------------------------------

/// Set of fields, one bit per [`Field`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldMask(u8);

impl FieldMask {
    pub const EMPTY: FieldMask = FieldMask(0);

    pub fn insert(&mut self, field: Field) {
        self.0 |= field.bit();
    }

    pub fn contains(self, field: Field) -> bool {
        self.0 & field.bit() != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Field> {
        Field::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

// ---------------------------------------------------------------------------
// Physical ranges
// ---------------------------------------------------------------------------

/// Closed interval of physically plausible readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f32,
    pub max: f32,
}

impl Bounds {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// `false` for NaN and infinities as well as out-of-range values.
    pub fn contains(&self, value: f32) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

/// Sensor bounds per field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorRanges {
    pub temperature: Bounds,
    pub humidity: Bounds,
    pub co2: Bounds,
    pub light: Bounds,
    pub moisture: Bounds,
}

impl Default for SensorRanges {
    fn default() -> Self {
        Self {
            temperature: Bounds::new(-40.0, 85.0),
            humidity: Bounds::new(0.0, 100.0),
            co2: Bounds::new(0.0, 40_000.0),
            light: Bounds::new(0.0, 200_000.0),
            moisture: Bounds::new(0.0, 100.0),
        }
    }
}

impl SensorRanges {
    pub fn bounds(&self, field: Field) -> &Bounds {
        match field {
            Field::Temperature => &self.temperature,
            Field::Humidity => &self.humidity,
            Field::Co2 => &self.co2,
            Field::Light => &self.light,
            Field::Moisture => &self.moisture,
        }
    }
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// The five raw readings of one section, in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Readings(pub [f32; 5]);

impl Readings {
    pub fn get(&self, field: Field) -> f32 {
        self.0[field.index()]
    }
}

/// One section's readings from a single parse event.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorFrame {
    pub section: Section,
    pub readings: Readings,
    /// Fields that failed their range check.
    pub invalid: FieldMask,
    pub captured_at: DateTime<Local>,
}

impl SensorFrame {
    /// Build a frame, checking every reading against `ranges`.
    pub fn new(
        section: Section,
        readings: Readings,
        ranges: &SensorRanges,
        captured_at: DateTime<Local>,
    ) -> Self {
        let mut invalid = FieldMask::EMPTY;
        for field in Field::ALL {
            if !ranges.bounds(field).contains(readings.get(field)) {
                invalid.insert(field);
            }
        }
        Self {
            section,
            readings,
            invalid,
            captured_at,
        }
    }

    /// `true` when every field passed its range check.
    pub fn valid(&self) -> bool {
        self.invalid.is_empty()
    }

    /// Reading usable for inference, `None` if the field is invalid.
    pub fn value(&self, field: Field) -> Option<f32> {
        if self.invalid.contains(field) {
            None
        } else {
            Some(self.readings.get(field))
        }
    }

    /// Raw reading, regardless of validity.
    pub fn raw(&self, field: Field) -> f32 {
        self.readings.get(field)
    }
}

/// Both halves of one wire line.
#[derive(Debug, Clone, PartialEq)]
pub struct FramePair {
    pub controlled: SensorFrame,
    pub control: SensorFrame,
}

impl FramePair {
    pub fn section(&self, section: Section) -> &SensorFrame {
        match section {
            Section::Controlled => &self.controlled,
            Section::Control => &self.control,
        }
    }

    pub fn captured_at(&self) -> DateTime<Local> {
        self.controlled.captured_at
    }

    /// Serialise back into the wire format.
    ///
    /// Floats use `Display`, which prints the shortest representation
    /// that parses back to the same value.
    pub fn to_line(&self) -> String {
        let seg = |frame: &SensorFrame| {
            let [t, h, c, l, m] = frame.readings.0;
            format!("{}|{t},{h},{c},{l},{m}", frame.section.label())
        };
        format!("{};{}", seg(&self.controlled), seg(&self.control))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_tracks_fields() {
        let mut m = FieldMask::EMPTY;
        assert!(m.is_empty());
        m.insert(Field::Humidity);
        m.insert(Field::Light);
        assert!(m.contains(Field::Humidity));
        assert!(!m.contains(Field::Co2));
        assert_eq!(m.iter().collect::<Vec<_>>(), vec![Field::Humidity, Field::Light]);
    }

    #[test]
    fn bounds_reject_non_finite() {
        let b = Bounds::new(0.0, 100.0);
        assert!(b.contains(0.0));
        assert!(b.contains(100.0));
        assert!(!b.contains(100.01));
        assert!(!b.contains(f32::NAN));
        assert!(!b.contains(f32::INFINITY));
    }

    #[test]
    fn out_of_range_field_invalidates_frame() {
        let frame = SensorFrame::new(
            Section::Controlled,
            Readings([25.0, 150.0, 800.0, 150.0, 65.0]),
            &SensorRanges::default(),
            Local::now(),
        );
        assert!(!frame.valid());
        assert_eq!(frame.value(Field::Humidity), None);
        assert_eq!(frame.value(Field::Temperature), Some(25.0));
        assert_eq!(frame.raw(Field::Humidity), 150.0);
    }

    #[test]
    fn negative_co2_is_invalid() {
        let frame = SensorFrame::new(
            Section::Control,
            Readings([25.0, 50.0, -1.0, 150.0, 65.0]),
            &SensorRanges::default(),
            Local::now(),
        );
        assert!(frame.invalid.contains(Field::Co2));
    }
}
