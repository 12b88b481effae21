//! # Tragen CLI Module
//!
//! This module implements the CLI interface for Tragen.
//!
//! ## Available Commands
//!
//! - `run` - Realize the scenario and generate traffic until stopped
//! - `show` - Print the declared namespace tree
//! - `check` - Realize and bind the scenario once without starting actors

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tragen_core::TragenError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Tragen - OPC UA Traffic Generator
///
/// Declares a namespace, realizes it on one server and many clients, and
/// drives read/write/subscribe/notify traffic against it.
#[derive(Parser, Debug)]
#[command(name = "tragen")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the scenario file
    #[arg(short, long, global = true, default_value = "tragen.toml")]
    pub config: PathBuf,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate traffic until Ctrl+C or the given duration
    Run {
        /// Stop after this many seconds
        #[arg(short, long)]
        duration_secs: Option<u64>,

        /// Override the scenario's client count
        #[arg(long)]
        clients: Option<usize>,
    },

    /// Print the declared namespace tree
    Show,

    /// Realize and bind the scenario once, then tear it down
    Check,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), TragenError> {
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Run {
            duration_secs,
            clients,
        }) => cmd_run(&cli.config, json_mode, cli.verbose, duration_secs, clients).await,
        Some(Commands::Show) => cmd_show(&cli.config, json_mode),
        Some(Commands::Check) => cmd_check(&cli.config, json_mode),
        None => {
            // No subcommand - validate the scenario by default
            cmd_check(&cli.config, json_mode)
        }
    }
}
