//! # Namespace Benchmarks
//!
//! Performance benchmarks for tragen-core graph construction and realization.
//!
//! Run with: `cargo bench -p tragen-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use tragen_core::{
    MemoryServer, NamespaceGraph, UaEndpoint, UpdateMode, VariableFlags, realize_on_client,
    realize_on_server,
};

/// Create a graph of N variables spread over objects of ten, inside one folder.
fn create_plant(size: usize) -> NamespaceGraph {
    let mut graph = NamespaceGraph::new();
    graph.add_folder("Plant", 1, None).expect("folder");

    for i in 0..size {
        let object = format!("Unit{}", i / 10);
        if i % 10 == 0 {
            graph.add_object(&object, 1, Some("Plant")).expect("object");
        }
        let update = if i % 3 == 0 {
            UpdateMode::Irregular
        } else {
            UpdateMode::Static
        };
        graph
            .add_variable(
                &format!("Var{i}"),
                i as f64,
                1,
                Some(&object),
                VariableFlags::new().writable().update(update),
            )
            .expect("variable");
    }

    graph
}

fn listening_server() -> MemoryServer {
    let server = MemoryServer::new("opc.tcp://localhost:4840/bench", "bench");
    server.connect().expect("listen");
    server
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_graph_construction(c: &mut Criterion) {
    let mut group = c.benchmark_group("graph_construction");

    for size in [100, 1000, 10000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| black_box(create_plant(size)));
        });
    }

    group.finish();
}

fn bench_canonical_entries(c: &mut Criterion) {
    let mut group = c.benchmark_group("canonical_entries");

    for size in [100, 1000, 10000].iter() {
        let graph = create_plant(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(graph.entries().len()));
        });
    }

    group.finish();
}

fn bench_server_realization(c: &mut Criterion) {
    let mut group = c.benchmark_group("server_realization");

    for size in [100, 1000].iter() {
        let graph = create_plant(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let server = listening_server();
                black_box(realize_on_server(&graph, &server).expect("realize"))
            });
        });
    }

    group.finish();
}

fn bench_client_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("client_resolution");

    for size in [100, 1000].iter() {
        let graph = create_plant(*size);
        let server = listening_server();
        realize_on_server(&graph, &server).expect("realize");
        let client = server.client("bench-client");
        client.connect().expect("connect");

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(realize_on_client(&graph, &client).expect("resolve")));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_graph_construction,
    bench_canonical_entries,
    bench_server_realization,
    bench_client_resolution,
);
criterion_main!(benches);
