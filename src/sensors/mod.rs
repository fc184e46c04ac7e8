//! Sensor data model and the serial line codec.
//!
//! The sensor microcontroller streams one line per sample covering both
//! greenhouse sections; [`codec::FrameCodec`] turns that line into a
//! [`frame::FramePair`].

pub mod codec;
pub mod frame;

pub use codec::FrameCodec;
pub use frame::{Field, FieldMask, FramePair, Readings, Section, SensorFrame, SensorRanges};
