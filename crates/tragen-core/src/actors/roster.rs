//! Roster derivation: which actors a realized graph gets.

use super::sampling::RngSource;
use super::{Actor, Notifier, Reader, Updater, Writer};
use crate::endpoint::UaEndpoint;
use crate::namespace::{DescriptorRef, NamespaceGraph, UpdateMode};
use crate::notifications::NotificationRegistry;
use crate::profile::TrafficProfile;
use crate::realize::RealizedTree;
use crate::{NodeHandle, NodeKey, TragenError};
use std::sync::Arc;

/// Updaters and notifiers for the server realization.
///
/// One updater per regularly or irregularly updated variable, one
/// notifier per monitored variable. Depends only on graph flags.
pub fn server_actors(
    graph: &NamespaceGraph,
    tree: &RealizedTree,
    registry: &NotificationRegistry,
    server: &Arc<dyn UaEndpoint>,
    profile: &TrafficProfile,
    rngs: &mut RngSource,
) -> Result<Vec<Box<dyn Actor>>, TragenError> {
    let mut actors: Vec<Box<dyn Actor>> = Vec::new();
    for (entry, handle) in tree.lockstep(graph)? {
        let DescriptorRef::Variable(var) = entry.node else {
            continue;
        };
        let period = match var.flags.update {
            UpdateMode::Static => None,
            UpdateMode::Regular => Some(profile.update_period()),
            UpdateMode::Irregular => Some(profile.irregular_period()),
        };
        if let Some(period) = period {
            actors.push(Box::new(Updater::new(
                entry.key.path(),
                Arc::clone(server),
                handle,
                var.flags.update,
                period,
                profile.val_stddev,
                profile.pd_stddev_ms,
                rngs.next_rng(),
            )));
        }
        if var.is_monitored() {
            let source = registry.get(&entry.key).ok_or_else(|| {
                TragenError::InvalidState(format!("no notification source for {}", entry.key))
            })?;
            actors.push(Box::new(Notifier::new(
                var.name.clone(),
                Arc::clone(server),
                handle,
                source.generator,
                var.flags.lower_bound,
                var.flags.upper_bound,
                profile.notifier_period(),
            )?));
        }
    }
    Ok(actors)
}

/// The reader and writer of one client realization.
///
/// Every variable and property is readable. Only writable variables are
/// written; writable properties hold text and are left alone. An actor
/// with an empty item list is not created.
pub fn client_actors(
    graph: &NamespaceGraph,
    tree: &RealizedTree,
    client: &Arc<dyn UaEndpoint>,
    profile: &TrafficProfile,
    rngs: &mut RngSource,
) -> Result<Vec<Box<dyn Actor>>, TragenError> {
    let mut readable: Vec<(NodeKey, NodeHandle)> = Vec::new();
    let mut writable: Vec<(NodeKey, NodeHandle)> = Vec::new();
    for (entry, handle) in tree.lockstep(graph)? {
        match entry.node {
            DescriptorRef::Variable(var) => {
                if var.flags.writable {
                    writable.push((entry.key.clone(), handle));
                }
                readable.push((entry.key, handle));
            }
            DescriptorRef::Property(_) => readable.push((entry.key, handle)),
            DescriptorRef::Folder(_) | DescriptorRef::Object(_) => {}
        }
    }

    let mut actors: Vec<Box<dyn Actor>> = Vec::new();
    if !readable.is_empty() {
        let reader = Reader::new(
            Arc::clone(client),
            readable,
            profile.reader_period(),
            rngs.next_rng(),
        )?;
        actors.push(Box::new(reader));
    }
    if !writable.is_empty() {
        let writer = Writer::new(
            Arc::clone(client),
            writable,
            profile.writer_period(),
            rngs.next_rng(),
        )?;
        actors.push(Box::new(writer));
    }
    Ok(actors)
}
