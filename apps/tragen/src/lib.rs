//! # Tragen
//!
//! Scenario loading and the command line for the Tragen traffic generator.

pub mod cli;
pub mod scenario;
