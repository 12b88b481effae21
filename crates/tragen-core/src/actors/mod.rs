//! # Actor Engine
//!
//! Long-running traffic loops and their group lifecycle.
//!
//! Four actor kinds exist:
//! - [`Updater`]: server side, random walk on one variable
//! - [`Notifier`]: server side, threshold events for one variable
//! - [`Reader`]: client side, random reads over the client's readable items
//! - [`Writer`]: client side, random rescaling of the client's writable variables
//!
//! Each started actor runs on its own OS thread and checks a keep-running
//! flag once per iteration. Stopping is cooperative: an in-flight endpoint
//! call is never interrupted, but the sleep between iterations is cut
//! short. A failed step is logged and counted; the actor carries on and
//! its siblings never see the failure.

mod notifier;
mod reader;
mod roster;
pub mod sampling;
mod updater;
mod writer;

pub use notifier::{Breach, Notifier};
pub use reader::Reader;
pub use roster::{client_actors, server_actors};
pub use updater::Updater;
pub use writer::Writer;

use crate::TragenError;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

// =============================================================================
// ACTOR TRAIT
// =============================================================================

/// Kind of traffic an actor produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorKind {
    Updater,
    Notifier,
    Reader,
    Writer,
}

impl fmt::Display for ActorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Updater => "updater",
            Self::Notifier => "notifier",
            Self::Reader => "reader",
            Self::Writer => "writer",
        };
        f.write_str(name)
    }
}

/// One traffic loop body.
pub trait Actor: Send {
    fn kind(&self) -> ActorKind;

    /// Label used in logs and reports.
    fn label(&self) -> &str;

    /// Perform one iteration.
    fn step(&mut self) -> Result<(), TragenError>;

    /// Sleep before the next iteration.
    fn next_interval(&mut self) -> Duration;
}

/// Outcome of one actor after it stopped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActorReport {
    pub kind: ActorKind,
    pub label: String,
    pub iterations: u64,
    pub failures: u64,
}

// =============================================================================
// ENGINE
// =============================================================================

struct Running {
    kind: ActorKind,
    label: String,
    keep_running: Arc<AtomicBool>,
    handle: JoinHandle<(u64, u64)>,
}

/// Owns every actor of a context and starts/stops them as a group.
#[derive(Default)]
pub struct ActorEngine {
    pending: Vec<Box<dyn Actor>>,
    running: Vec<Running>,
}

impl fmt::Debug for ActorEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorEngine")
            .field("pending", &self.pending.len())
            .field("running", &self.running.len())
            .finish()
    }
}

impl ActorEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an actor. It runs from the next [`Self::start_all`] on.
    pub fn load(&mut self, actor: Box<dyn Actor>) {
        self.pending.push(actor);
    }

    pub fn load_all(&mut self, actors: impl IntoIterator<Item = Box<dyn Actor>>) {
        self.pending.extend(actors);
    }

    /// Actors waiting to be started.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Actors currently running.
    pub fn running(&self) -> usize {
        self.running.len()
    }

    /// Count loaded actors (pending or running) of one kind.
    pub fn count(&self, kind: ActorKind) -> usize {
        self.pending.iter().filter(|a| a.kind() == kind).count()
            + self.running.iter().filter(|r| r.kind == kind).count()
    }

    /// Start every pending actor on its own thread.
    ///
    /// Returns the number of actors started by this call.
    pub fn start_all(&mut self) -> Result<usize, TragenError> {
        let mut started = 0;
        for actor in std::mem::take(&mut self.pending) {
            let kind = actor.kind();
            let label = actor.label().to_string();
            let keep_running = Arc::new(AtomicBool::new(true));
            let flag = Arc::clone(&keep_running);
            let handle = thread::Builder::new()
                .name(format!("{kind}:{label}"))
                .spawn(move || run(actor, &flag))
                .map_err(|e| TragenError::IoError(format!("cannot spawn {kind} {label}: {e}")))?;
            self.running.push(Running {
                kind,
                label,
                keep_running,
                handle,
            });
            started += 1;
        }
        tracing::info!(started, running = self.running.len(), "actors started");
        Ok(started)
    }

    /// Signal every running actor, then wait for each to finish its
    /// current iteration.
    ///
    /// No actor thread is left running when this returns.
    pub fn stop_all(&mut self) -> Vec<ActorReport> {
        for actor in &self.running {
            actor.keep_running.store(false, Ordering::Release);
            actor.handle.thread().unpark();
        }
        let mut reports = Vec::with_capacity(self.running.len());
        for actor in self.running.drain(..) {
            let (iterations, failures) = match actor.handle.join() {
                Ok(counts) => counts,
                Err(_) => {
                    tracing::error!(kind = %actor.kind, label = %actor.label, "actor panicked");
                    (0, 1)
                }
            };
            reports.push(ActorReport {
                kind: actor.kind,
                label: actor.label,
                iterations,
                failures,
            });
        }
        if !reports.is_empty() {
            let iterations: u64 = reports.iter().map(|r| r.iterations).sum();
            let failures: u64 = reports.iter().map(|r| r.failures).sum();
            tracing::info!(actors = reports.len(), iterations, failures, "actors stopped");
        }
        reports
    }
}

impl Drop for ActorEngine {
    fn drop(&mut self) {
        self.stop_all();
    }
}

/// Actor thread body. Returns `(iterations, failures)`.
fn run(mut actor: Box<dyn Actor>, keep_running: &AtomicBool) -> (u64, u64) {
    let mut iterations = 0;
    let mut failures = 0;
    while keep_running.load(Ordering::Acquire) {
        if let Err(e) = actor.step() {
            failures += 1;
            tracing::warn!(
                kind = %actor.kind(),
                label = %actor.label(),
                error = %e,
                "actor step failed",
            );
        }
        iterations += 1;
        pause(actor.next_interval(), keep_running);
    }
    (iterations, failures)
}

/// Sleep for `interval` unless the flag drops first.
///
/// Parking can wake spuriously, so the deadline is re-checked.
fn pause(interval: Duration, keep_running: &AtomicBool) {
    let deadline = Instant::now() + interval;
    while keep_running.load(Ordering::Acquire) {
        let now = Instant::now();
        if now >= deadline {
            return;
        }
        thread::park_timeout(deadline - now);
    }
}

// =============================================================================
// TESTS
// =============================================================================
