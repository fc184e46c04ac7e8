//! Greenhouse controller library.
//!
//! Exposes the control pipeline for the binary, integration tests and
//! the fuzz targets.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod connection;
pub mod control;
pub mod error;
pub mod link;
pub mod scheduler;
pub mod sensors;
pub mod shutdown;
pub mod telemetry;
