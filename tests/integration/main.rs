//! Integration test driver for `tests/integration/` submodule.
//!
//! Each `mod` below maps to a file that exercises one component against
//! mock adapters.  No serial device or broker is required.

mod link_tests;
mod mock_hw;
mod publisher_tests;
mod service_tests;
