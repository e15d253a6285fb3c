//! Library side of the `voltmesh-node` binary.
//!
//! Configuration loading and the demo flows live here so integration tests
//! can run them without going through the CLI.

pub mod config;
pub mod service;
