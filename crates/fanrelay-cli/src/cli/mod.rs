//! Command-line surface of the `fanrelay` binary: argument parsing and
//! telemetry setup.

pub mod config;
pub mod telemetry;
