//! # Property-Based Tests
//!
//! Store and codec invariants checked over generated graphs.

use phylograph_core::formats::{rdfxml, turtle};
use phylograph_core::{
    Graph, GraphStore, Iri, Literal, PhyloError, Store, Term, Triple, TriplePattern,
    evaluate_patterns, graph_from_snapshot, graph_to_snapshot,
};
use proptest::collection::vec;
use proptest::prelude::*;

// =============================================================================
// GENERATORS
// =============================================================================

fn iri() -> impl Strategy<Value = Iri> {
    prop_oneof![
        "[a-z][a-z0-9_]{0,8}".prop_map(|local| Iri::new(format!("http://example.org/{}", local))),
        "[a-z][a-zA-Z0-9]{0,8}"
            .prop_map(|local| Iri::new(format!("http://example.org/ortholog/{}", local))),
        "[a-z]{1,6}".prop_map(|local| Iri::new(format!("urn:test:{}#x", local))),
    ]
}

fn literal() -> impl Strategy<Value = Literal> {
    prop_oneof![
        "[ -~\n\t]{0,16}".prop_map(Literal::plain),
        ("[ -~]{0,12}", "[a-z]{2}(-[A-Z]{2})?")
            .prop_map(|(value, lang)| Literal::with_language(value, lang)),
        ("[0-9]{1,5}", Just("http://www.w3.org/2001/XMLSchema#integer"))
            .prop_map(|(value, dt)| Literal::typed(value, Iri::new(dt))),
    ]
}

fn triple() -> impl Strategy<Value = Triple> {
    let object = prop_oneof![iri().prop_map(Term::Iri), literal().prop_map(Term::Literal)];
    (iri(), iri(), object).prop_map(|(s, p, o)| Triple::new(s, p, o))
}

/// Namespace declarations as foreign RDF/XML documents write them.
fn xmlns_value() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,6}".prop_map(|host| format!("http://{}.org/", host)),
        "[a-z]{1,4}".prop_map(|nid| format!("urn:{}:", nid)),
        "[a-z]{1,6}/".prop_map(String::from),
        "#[a-z]{0,4}".prop_map(String::from),
        "[a-z ]{0,8}".prop_map(String::from),
        "[a-z]{1,3}:[a-z ]{1,4}".prop_map(String::from),
    ]
}

fn rdfxml_document(namespaces: &[String], triples: &[Triple]) -> Option<String> {
    let graph = graph_of(triples);
    let xml = rdfxml::serialize(&graph).ok()?;
    let declarations: String = namespaces
        .iter()
        .enumerate()
        .map(|(i, ns)| format!(" xmlns:x{}=\"{}\"", i, ns))
        .collect();
    Some(xml.replacen("<rdf:RDF", &format!("<rdf:RDF{}", declarations), 1))
}

fn graph_of(triples: &[Triple]) -> Graph {
    let mut graph = Graph::new();
    for triple in triples {
        graph.insert(triple.clone());
    }
    graph
}

fn same_triples(left: &Graph, right: &Graph) -> bool {
    left.len() == right.len() && left.iter().all(|t| right.contains(t))
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Inserting a batch twice adds nothing the second time.
    #[test]
    fn batch_insert_is_idempotent(triples in vec(triple(), 0..40)) {
        let store = Store::new();
        store.insert_batch(triples.clone()).expect("first");
        let after_first = store.len();

        let added = store.insert_batch(triples).expect("second");
        prop_assert_eq!(added, 0);
        prop_assert_eq!(store.len(), after_first);
    }

    /// Duplicates inside one batch collapse to distinct triples.
    #[test]
    fn batch_count_equals_distinct_triples(triples in vec(triple(), 0..40)) {
        let store = Store::new();
        let added = store.insert_batch(triples.clone()).expect("insert");

        let mut distinct: Vec<&Triple> = Vec::new();
        for t in &triples {
            if !distinct.contains(&t) {
                distinct.push(t);
            }
        }
        prop_assert_eq!(added, distinct.len());
    }

    /// Serializing to turtle and parsing back yields the same triple set.
    #[test]
    fn turtle_round_trip(triples in vec(triple(), 0..40)) {
        let graph = graph_of(&triples);
        let text = turtle::serialize(&graph);
        let restored = turtle::parse(&text).expect("parse");
        prop_assert!(same_triples(&graph, &restored), "{}", text);
    }

    /// The snapshot format restores the same triple set.
    #[test]
    fn snapshot_round_trip(triples in vec(triple(), 0..40)) {
        let graph = graph_of(&triples);
        let restored = graph_from_snapshot(&graph_to_snapshot(&graph)).expect("restore");
        prop_assert!(same_triples(&graph, &restored));
    }

    /// RDF/XML round trip for graphs whose predicates have QName locals.
    #[test]
    fn rdfxml_round_trip(triples in vec(triple(), 0..20)) {
        let graph = graph_of(&triples);
        let xml = rdfxml::serialize(&graph).expect("serialize");
        let restored = rdfxml::parse(&xml).expect("parse");
        prop_assert!(same_triples(&graph, &restored), "{}", xml);
    }

    /// Whatever namespaces a loaded RDF/XML document declares, the store's
    /// snapshot can be read back.
    #[test]
    fn loaded_rdfxml_snapshot_restores(
        namespaces in vec(xmlns_value(), 0..6),
        triples in vec(triple(), 0..12),
    ) {
        let Some(xml) = rdfxml_document(&namespaces, &triples) else {
            return Ok(());
        };
        let store = Store::new();
        store.merge_graph(rdfxml::parse(&xml).expect("parse")).expect("merge");

        let text = graph_to_snapshot(&store.snapshot());
        let restored = graph_from_snapshot(&text);
        prop_assert!(restored.is_ok(), "{}", text);
        let restored = restored.expect("restore");
        prop_assert!(same_triples(&store.snapshot(), &restored));
        for namespace in restored.prefixes().values() {
            prop_assert!(Iri::new(namespace.as_str()).is_valid(), "{}", namespace);
        }
    }

    /// One malformed triple rejects the whole batch.
    #[test]
    fn malformed_batch_leaves_store_unchanged(
        seed in vec(triple(), 0..10),
        batch in vec(triple(), 1..20),
        bad_at in 0usize..20,
    ) {
        let store = Store::new();
        store.insert_batch(seed).expect("seed");
        let before = store.len();

        let mut batch = batch;
        let index = bad_at % batch.len();
        batch[index].object = Term::var("x");

        let result = store.insert_batch(batch);
        let rejected_at_index =
            matches!(result, Err(PhyloError::MalformedTriple { index: i, .. }) if i == index);
        prop_assert!(rejected_at_index);
        prop_assert_eq!(store.len(), before);
    }

    /// A fully concrete pattern matches exactly when the triple is stored.
    #[test]
    fn concrete_pattern_matches_membership(triples in vec(triple(), 1..20), probe in triple()) {
        let graph = graph_of(&triples);
        let pattern = TriplePattern::new(
            Term::Iri(probe.subject.clone()),
            Term::Iri(probe.predicate.clone()),
            probe.object.clone(),
        );
        let matched = evaluate_patterns(&graph, &[pattern]).len();
        prop_assert_eq!(matched, usize::from(graph.contains(&probe)));
    }
}
