//! # Store Benchmarks
//!
//! Performance benchmarks for phylograph-core store and query operations.
//!
//! Run with: `cargo bench -p phylograph-core`

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use phylograph_core::formats::turtle;
use phylograph_core::{
    Graph, GraphStore, Ingestor, Iri, OrthologLink, Store, Term, Triple, evaluate, parse_query,
};
use std::hint::black_box;

/// Ortholog facts for `size` genes spread over ten groups.
fn ortholog_batch(size: usize) -> Vec<Triple> {
    let links: Vec<OrthologLink> = (0..size)
        .map(|i| OrthologLink {
            gene_id: format!("gene{}", i),
            species: format!("species{}", i % 7),
            group_id: format!("G{}", i % 10),
        })
        .collect();
    Ingestor::ortholog_triples(&links).expect("map")
}

fn ortholog_graph(size: usize) -> Graph {
    let mut graph = Graph::new();
    for triple in ortholog_batch(size) {
        graph.insert(triple);
    }
    graph
}

// =============================================================================
// BENCHMARKS
// =============================================================================

fn bench_insert_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert_batch");

    for size in [100, 1000, 10000].iter() {
        let batch = ortholog_batch(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &batch, |b, batch| {
            b.iter(|| {
                let store = Store::new();
                black_box(store.insert_batch(batch.clone()))
            });
        });
    }

    group.finish();
}

fn bench_triples_matching(c: &mut Criterion) {
    let mut group = c.benchmark_group("triples_matching");
    let graph = ortholog_graph(10000);
    let subject = Iri::new("http://example.org/gene5000");
    let predicate = Iri::new("http://example.org/ortholog/memberOf");

    group.bench_function("subject_predicate", |b| {
        b.iter(|| {
            black_box(
                graph
                    .triples_matching(Some(&subject), Some(&predicate), None)
                    .count(),
            )
        });
    });

    let object = Term::literal("G3");
    group.bench_function("predicate_object", |b| {
        b.iter(|| {
            black_box(
                graph
                    .triples_matching(None, Some(&predicate), Some(&object))
                    .count(),
            )
        });
    });

    group.finish();
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");
    let query = parse_query(
        "PREFIX orth: <http://example.org/ortholog/>
         SELECT ?g ?s ?l WHERE { ?g orth:memberOf \"G3\" ; orth:species ?s ; orth:label ?l }",
    )
    .expect("parse");

    for size in [100, 1000, 10000].iter() {
        let graph = ortholog_graph(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &graph, |b, graph| {
            b.iter(|| black_box(evaluate(graph, &query)));
        });
    }

    group.finish();
}

fn bench_turtle(c: &mut Criterion) {
    let graph = ortholog_graph(1000);
    let text = turtle::serialize(&graph);

    c.bench_function("turtle_serialize_1000", |b| {
        b.iter(|| black_box(turtle::serialize(&graph)));
    });
    c.bench_function("turtle_parse_1000", |b| {
        b.iter(|| black_box(turtle::parse(&text)));
    });
}

criterion_group!(
    benches,
    bench_insert_batch,
    bench_triples_matching,
    bench_evaluate,
    bench_turtle
);
criterion_main!(benches);
