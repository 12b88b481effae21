//! # Tragen - OPC UA Traffic Generator
//!
//! The main binary for the Tragen traffic generator.
//!
//! This application provides:
//! - Scenario files describing a namespace and a traffic profile
//! - CLI interface to inspect, check and run scenarios
//! - Timed or signal-terminated traffic runs
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      apps/tragen (THE BINARY)                   │
//! │                                                                 │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐   │
//! │  │   CLI       │    │  Scenario   │    │  Run Loop        │   │
//! │  │  (clap)     │    │  (toml)     │    │  (tokio signal)  │   │
//! │  └──────┬──────┘    └──────┬──────┘    └────────┬─────────┘   │
//! │         │                  │                    │              │
//! │         └──────────────────┼────────────────────┘              │
//! │                            ▼                                   │
//! │                    ┌───────────────┐                           │
//! │                    │  tragen-core  │                           │
//! │                    │ (THE LOGIC)   │                           │
//! │                    └───────────────┘                           │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Print the declared namespace
//! tragen -c scenarios/tank_farm.toml show
//!
//! # Realize and bind once, without traffic
//! tragen -c scenarios/tank_farm.toml check
//!
//! # Generate traffic for a minute with four clients
//! tragen -c scenarios/tank_farm.toml run --duration-secs 60 --clients 4
//! ```

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tragen::cli;

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Initialize tracing - TRAGEN_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("TRAGEN_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "tragen=info,tragen_core=info".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Tragen startup banner.
fn print_banner() {
    println!(
        r#"
  ████████╗██████╗  █████╗  ██████╗ ███████╗███╗   ██╗
  ╚══██╔══╝██╔══██╗██╔══██╗██╔════╝ ██╔════╝████╗  ██║
     ██║   ██████╔╝███████║██║  ███╗█████╗  ██╔██╗ ██║
     ██║   ██╔══██╗██╔══██║██║   ██║██╔══╝  ██║╚██╗██║
     ██║   ██║  ██║██║  ██║╚██████╔╝███████╗██║ ╚████║
     ╚═╝   ╚═╝  ╚═╝╚═╝  ╚═╝ ╚═════╝ ╚══════╝╚═╝  ╚═══╝

  OPC UA Traffic Generator v{}

  Update • Notify • Read • Write
"#,
        env!("CARGO_PKG_VERSION")
    );
}
