//! Application core: orchestration logic with no direct I/O.
//!
//! [`service::ControlService`] sequences one control cycle; every side
//! effect goes through a **port trait** defined in [`ports`], keeping
//! this layer testable without a serial device or a broker.

pub mod events;
pub mod ports;
pub mod record;
pub mod service;
