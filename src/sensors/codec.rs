//! Sensor line codec.
//!
//! Wire format (one ASCII line per sample, newline-terminated):
//! ```text
//! Controlled|T,H,CO2,L,M;Control|T,H,CO2,L,M
//! └─label──┘ └─5 decimal fields─┘
//! ```
//!
//! Structural problems (segment count, label, field count, non-numeric
//! token) reject the whole line with a [`ParseError`].  Values that parse
//! but fall outside [`SensorRanges`] do not reject the line; they mark
//! the field invalid on the resulting [`SensorFrame`].

use chrono::{DateTime, Local};

use crate::error::ParseError;

use super::frame::{Field, FramePair, Readings, Section, SensorFrame, SensorRanges};

const SEGMENT_SEP: char = ';';
const LABEL_SEP: char = '|';
const FIELD_SEP: char = ',';

/// Parses sensor lines against a fixed set of physical ranges.
#[derive(Debug, Clone, Default)]
pub struct FrameCodec {
    ranges: SensorRanges,
}

impl FrameCodec {
    pub fn new(ranges: SensorRanges) -> Self {
        Self { ranges }
    }

    pub fn ranges(&self) -> &SensorRanges {
        &self.ranges
    }

    /// Parse a line, stamping it with the current wall-clock time.
    pub fn parse(&self, line: &str) -> Result<FramePair, ParseError> {
        self.parse_at(line, Local::now())
    }

    /// Parse a line with an explicit capture time.
    pub fn parse_at(&self, line: &str, at: DateTime<Local>) -> Result<FramePair, ParseError> {
        let line = line.trim();
        if line.is_empty() {
            return Err(ParseError::EmptyLine);
        }

        let segments: Vec<&str> = line.split(SEGMENT_SEP).collect();
        if segments.len() != 2 {
            return Err(ParseError::SegmentCount(segments.len()));
        }

        let mut controlled = None;
        let mut control = None;

        for (idx, segment) in segments.iter().enumerate() {
            let (label, values) = segment
                .split_once(LABEL_SEP)
                .ok_or(ParseError::MissingLabel { segment: idx })?;
            let label = label.trim();
            let section = Section::from_label(label)
                .ok_or_else(|| ParseError::UnknownLabel(label.to_owned()))?;
            let readings = parse_values(section, values)?;
            let frame = SensorFrame::new(section, readings, &self.ranges, at);

            let slot = match section {
                Section::Controlled => &mut controlled,
                Section::Control => &mut control,
            };
            if slot.replace(frame).is_some() {
                return Err(ParseError::DuplicateSection(section));
            }
        }

        // Two segments, no duplicates, so both slots are filled.
        match (controlled, control) {
            (Some(controlled), Some(control)) => Ok(FramePair {
                controlled,
                control,
            }),
            (None, _) => Err(ParseError::DuplicateSection(Section::Control)),
            (_, None) => Err(ParseError::DuplicateSection(Section::Controlled)),
        }
    }

    /// Parse raw bytes from the transport (lossy UTF-8).
    pub fn parse_bytes(&self, bytes: &[u8]) -> Result<FramePair, ParseError> {
        self.parse(&String::from_utf8_lossy(bytes))
    }
}

fn parse_values(section: Section, values: &str) -> Result<Readings, ParseError> {
    let tokens: Vec<&str> = values.split(FIELD_SEP).collect();
    if tokens.len() != Field::ALL.len() {
        return Err(ParseError::FieldCount {
            section,
            found: tokens.len(),
        });
    }

    let mut readings = Readings::default();
    for (field, token) in Field::ALL.into_iter().zip(tokens) {
        let token = token.trim();
        readings.0[field.index()] =
            token.parse::<f32>().map_err(|_| ParseError::NotNumeric {
                section,
                field,
                token: token.to_owned(),
            })?;
    }
    Ok(readings)
}
