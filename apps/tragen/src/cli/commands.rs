//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::scenario::Scenario;
use std::path::Path;
use std::time::Duration;
use tragen_core::{ActorKind, ActorReport, MemoryServer, TragenContext, TragenError};

const ACTOR_KINDS: [ActorKind; 4] = [
    ActorKind::Updater,
    ActorKind::Notifier,
    ActorKind::Reader,
    ActorKind::Writer,
];

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Realize the scenario, start every actor and run until Ctrl+C or the
/// optional duration elapses.
pub async fn cmd_run(
    config: &Path,
    json_mode: bool,
    verbose: bool,
    duration_secs: Option<u64>,
    clients: Option<usize>,
) -> Result<(), TragenError> {
    let scenario = Scenario::load(config)?;
    let (server, mut context) = scenario.context(clients)?;
    context.init()?;
    let started = context.start_all()?;

    if !json_mode {
        println!("Tragen Traffic Generator Running...");
        println!();
        println!("Configuration:");
        println!("  Scenario: {:?}", config);
        println!("  Endpoint: {}", server.uri());
        println!("  Nodes:    {}", context.graph().node_count());
        println!("  Clients:  {}", context.client_count());
        println!("  Actors:   {}", started);
        println!();
        match duration_secs {
            Some(secs) => println!("Stopping after {}s (or Ctrl+C)", secs),
            None => println!("Press Ctrl+C to stop"),
        }
        println!();
    }

    wait_for_shutdown(duration_secs).await?;

    // Joining actor threads blocks; keep it off the runtime workers.
    let reports = tokio::task::spawn_blocking(move || context.close())
        .await
        .map_err(|e| TragenError::InvalidState(format!("shutdown task failed: {}", e)))??;

    print_reports(&reports, json_mode, verbose);
    Ok(())
}

async fn wait_for_shutdown(duration_secs: Option<u64>) -> Result<(), TragenError> {
    let ctrl_c = tokio::signal::ctrl_c();
    match duration_secs {
        Some(secs) => {
            tokio::select! {
                () = tokio::time::sleep(Duration::from_secs(secs)) => {
                    tracing::info!(secs, "run duration elapsed");
                    Ok(())
                }
                signal = ctrl_c => signal
                    .map_err(|e| TragenError::IoError(format!("Cannot listen for Ctrl+C: {}", e))),
            }
        }
        None => ctrl_c
            .await
            .map_err(|e| TragenError::IoError(format!("Cannot listen for Ctrl+C: {}", e))),
    }
}

fn print_reports(reports: &[ActorReport], json_mode: bool, verbose: bool) {
    let iterations: u64 = reports.iter().map(|r| r.iterations).sum();
    let failures: u64 = reports.iter().map(|r| r.failures).sum();

    if json_mode {
        let output = serde_json::json!({
            "actors": reports.len(),
            "iterations": iterations,
            "failures": failures,
            "reports": reports,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return;
    }

    println!("Traffic Summary");
    println!("===============");
    for kind in ACTOR_KINDS {
        let of_kind: Vec<_> = reports.iter().filter(|r| r.kind == kind).collect();
        if of_kind.is_empty() {
            continue;
        }
        println!(
            "{:<9} {:>4} actors  {:>8} iterations  {:>6} failures",
            kind.to_string(),
            of_kind.len(),
            of_kind.iter().map(|r| r.iterations).sum::<u64>(),
            of_kind.iter().map(|r| r.failures).sum::<u64>()
        );
    }
    println!();
    println!("Total: {} iterations, {} failures", iterations, failures);

    if verbose {
        println!();
        for report in reports {
            println!(
                "  [{}] {}: {} iterations, {} failures",
                report.kind, report.label, report.iterations, report.failures
            );
        }
    }
}

// =============================================================================
// SHOW COMMAND
// =============================================================================

/// Print the declared namespace tree.
pub fn cmd_show(config: &Path, json_mode: bool) -> Result<(), TragenError> {
    let scenario = Scenario::load(config)?;
    let graph = scenario.build_graph()?;

    if json_mode {
        let nodes: Vec<_> = graph
            .entries()
            .into_iter()
            .map(|entry| {
                serde_json::json!({
                    "kind": entry.key.kind.to_string(),
                    "namespace": entry.key.namespace,
                    "path": entry.key.path(),
                })
            })
            .collect();
        let output = serde_json::json!({
            "node_count": graph.node_count(),
            "nodes": nodes,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Namespace ({} nodes)", graph.node_count());
    println!("=========");
    print!("{}", graph.show());
    Ok(())
}

// =============================================================================
// CHECK COMMAND
// =============================================================================

/// Counts gathered by a dry initialization.
#[derive(Debug, Default)]
struct CheckSummary {
    nodes: usize,
    server_nodes: usize,
    clients: usize,
    event_sources: usize,
    subscriptions: usize,
    actors: Vec<(ActorKind, usize)>,
}

impl CheckSummary {
    fn gather(server: &MemoryServer, context: &TragenContext) -> Self {
        Self {
            nodes: context.graph().node_count(),
            server_nodes: server.node_count(),
            clients: context.client_count(),
            event_sources: context.registry().len(),
            subscriptions: (0..context.client_count())
                .filter_map(|i| context.subscriptions(i))
                .map(|table| table.len())
                .sum(),
            actors: ACTOR_KINDS
                .iter()
                .map(|&kind| (kind, context.engine().count(kind)))
                .collect(),
        }
    }
}

/// Realize and bind the scenario on a scratch server, report what was
/// built, then tear everything down without starting any actor.
pub fn cmd_check(config: &Path, json_mode: bool) -> Result<(), TragenError> {
    let scenario = Scenario::load(config)?;
    let (server, mut context) = scenario.context(None)?;
    context.init()?;
    let summary = CheckSummary::gather(&server, &context);
    context.close()?;

    if json_mode {
        let actors: serde_json::Map<String, serde_json::Value> = summary
            .actors
            .iter()
            .map(|(kind, count)| (kind.to_string(), serde_json::json!(count)))
            .collect();
        let output = serde_json::json!({
            "valid": true,
            "nodes": summary.nodes,
            "server_nodes": summary.server_nodes,
            "clients": summary.clients,
            "event_sources": summary.event_sources,
            "subscriptions": summary.subscriptions,
            "actors": actors,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Scenario Check");
    println!("==============");
    println!("Scenario: {:?}", config);
    println!();
    println!("Declared nodes:  {}", summary.nodes);
    println!("Server nodes:    {}", summary.server_nodes);
    println!("Clients:         {}", summary.clients);
    println!("Event sources:   {}", summary.event_sources);
    println!("Subscriptions:   {}", summary.subscriptions);
    for (kind, count) in &summary.actors {
        println!("{:<16} {}", format!("{}s:", kind), count);
    }
    println!();
    println!("OK");
    Ok(())
}
