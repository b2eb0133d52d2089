//! # Store Module
//!
//! Shared, thread-safe ownership of the graph.
//!
//! ## Access Contract
//!
//! - Mutations (`insert_batch`, `clear`, `bind_prefix`, `merge_graph`) take
//!   exclusive access.
//! - Reads go through `snapshot()`, which clones an `Arc` under a short read
//!   lock. A mutation that starts after a snapshot was taken copies the graph
//!   (`Arc::make_mut`) and never alters the snapshot.
//! - A batch is validated in full before the write lock is taken, so a
//!   rejected batch never touches the graph.

use crate::graph::{Graph, GraphStore};
use crate::primitives::MAX_BATCH_LENGTH;
use crate::{Iri, PhyloError, Term, Triple};
use std::ops::Deref;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

// =============================================================================
// SNAPSHOT
// =============================================================================

/// An immutable, point-in-time read view of the store.
///
/// Cloning a snapshot is cheap; all clones share the same graph version.
#[derive(Debug, Clone)]
pub struct Snapshot {
    graph: Arc<Graph>,
}

impl Snapshot {
    /// Get the underlying graph.
    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }
}

impl Deref for Snapshot {
    type Target = Graph;

    fn deref(&self) -> &Graph {
        &self.graph
    }
}

// =============================================================================
// STORE
// =============================================================================

/// The process-wide triple store.
///
/// A Store is owned by the application context and shared by reference (or
/// `Arc`) with every caller; there is no ambient global instance.
#[derive(Debug, Default)]
pub struct Store {
    inner: RwLock<Arc<Graph>>,
}

impl Store {
    /// Create a new empty store with the default prefix bindings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding an existing graph.
    #[must_use]
    pub fn with_graph(graph: Graph) -> Self {
        Self {
            inner: RwLock::new(Arc::new(graph)),
        }
    }

    // Graph mutations are validated before the write lock is taken, so a
    // poisoned lock still guards a consistent graph.
    fn read(&self) -> RwLockReadGuard<'_, Arc<Graph>> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Arc<Graph>> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Validate a batch without touching the store.
    ///
    /// Returns `PhyloError::MalformedTriple` for the first malformed triple.
    pub fn validate_batch(triples: &[Triple]) -> Result<(), PhyloError> {
        if triples.len() > MAX_BATCH_LENGTH {
            return Err(PhyloError::MalformedTriple {
                index: MAX_BATCH_LENGTH,
                reason: format!(
                    "batch of {} triples exceeds maximum {}",
                    triples.len(),
                    MAX_BATCH_LENGTH
                ),
            });
        }

        for (index, triple) in triples.iter().enumerate() {
            triple
                .validate()
                .map_err(|reason| PhyloError::MalformedTriple { index, reason })?;
        }
        Ok(())
    }

    /// Atomically add all given triples.
    ///
    /// If any triple is malformed the whole batch is rejected and the store
    /// is left unchanged. Returns the number of triples that were not already
    /// present.
    pub fn insert_batch(&self, triples: Vec<Triple>) -> Result<usize, PhyloError> {
        Self::validate_batch(&triples)?;

        let mut guard = self.write();
        let graph = Arc::make_mut(&mut guard);
        let added = triples
            .into_iter()
            .map(|t| graph.insert(t))
            .filter(|&new| new)
            .count();

        Ok(added)
    }

    /// Remove all triples. Prefix bindings are kept.
    pub fn clear(&self) {
        let mut guard = self.write();
        if Arc::strong_count(&guard) > 1 {
            // Outstanding snapshots keep the old version; start a fresh one.
            let mut fresh = Graph::bare();
            for (prefix, namespace) in guard.prefixes() {
                fresh.bind_prefix(prefix.clone(), namespace.clone());
            }
            *guard = Arc::new(fresh);
        } else {
            Arc::make_mut(&mut guard).clear();
        }
    }

    /// Bind a serialization prefix.
    pub fn bind_prefix(&self, prefix: impl Into<String>, namespace: impl Into<String>) {
        let mut guard = self.write();
        Arc::make_mut(&mut guard).bind_prefix(prefix, namespace);
    }

    /// Merge a fully parsed scratch graph into the store.
    ///
    /// Triples are inserted as one batch (all-or-nothing); the scratch
    /// graph's prefix bindings are added only if the batch is accepted.
    pub fn merge_graph(&self, scratch: Graph) -> Result<usize, PhyloError> {
        let triples: Vec<Triple> = scratch.iter().cloned().collect();
        Self::validate_batch(&triples)?;

        let mut guard = self.write();
        let graph = Arc::make_mut(&mut guard);
        let added = triples
            .into_iter()
            .map(|t| graph.insert(t))
            .filter(|&new| new)
            .count();
        for (prefix, namespace) in scratch.prefixes() {
            graph.bind_prefix(prefix.clone(), namespace.clone());
        }

        Ok(added)
    }

    /// Take a point-in-time read view.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            graph: Arc::clone(&self.read()),
        }
    }

    /// Check membership of a triple in the current version.
    #[must_use]
    pub fn contains(&self, triple: &Triple) -> bool {
        self.read().contains(triple)
    }

    /// Collect the triples matching the given fields from the current
    /// version. Use `snapshot().triples_matching(..)` for a lazy scan.
    #[must_use]
    pub fn triples_matching(
        &self,
        subject: Option<&Iri>,
        predicate: Option<&Iri>,
        object: Option<&Term>,
    ) -> Vec<Triple> {
        let snapshot = self.snapshot();
        snapshot
            .triples_matching(subject, predicate, object)
            .cloned()
            .collect()
    }

    /// Get the number of triples in the current version.
    #[must_use]
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Check whether the current version holds no triples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Literal;
    use std::thread;

    fn iri(s: &str) -> Iri {
        Iri::new(format!("http://example.org/{}", s))
    }

    fn label(gene: &str, value: &str) -> Triple {
        Triple::new(iri(gene), iri("label"), Literal::plain(value))
    }

    #[test]
    fn insert_batch_is_idempotent() {
        let store = Store::new();
        let batch = vec![label("g1", "Gene1"), label("g2", "Gene2")];

        assert_eq!(store.insert_batch(batch.clone()).expect("first"), 2);
        assert_eq!(store.insert_batch(batch).expect("second"), 0);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn malformed_triple_rejects_whole_batch() {
        let store = Store::new();
        let mut batch: Vec<Triple> = (0..10).map(|i| label(&format!("g{}", i), "x")).collect();
        batch.insert(
            5,
            Triple::new(Iri::new("not an iri"), iri("label"), Literal::plain("bad")),
        );

        let result = store.insert_batch(batch);
        assert!(matches!(
            result,
            Err(PhyloError::MalformedTriple { index: 5, .. })
        ));
        assert!(store.is_empty());
    }

    #[test]
    fn snapshot_is_isolated_from_later_mutations() {
        let store = Store::new();
        store
            .insert_batch(vec![label("g1", "Gene1")])
            .expect("insert");

        let snapshot = store.snapshot();
        store
            .insert_batch(vec![label("g2", "Gene2")])
            .expect("insert");
        store.clear();

        assert_eq!(snapshot.len(), 1);
        assert!(snapshot.contains(&label("g1", "Gene1")));
        assert!(store.is_empty());
    }

    #[test]
    fn clear_keeps_prefix_bindings() {
        let store = Store::new();
        store.bind_prefix("obo", "http://purl.obolibrary.org/obo/");
        store
            .insert_batch(vec![label("g1", "Gene1")])
            .expect("insert");
        let _held = store.snapshot();

        store.clear();

        assert!(store.is_empty());
        assert!(store.snapshot().prefixes().contains_key("obo"));
    }

    #[test]
    fn merge_graph_carries_prefixes_only_on_success() {
        let store = Store::new();

        let mut bad = Graph::bare();
        bad.bind_prefix("bad", "http://bad/");
        bad.insert(Triple::new(iri("s"), iri("p"), Term::iri("relative")));
        assert!(store.merge_graph(bad).is_err());
        assert!(!store.snapshot().prefixes().contains_key("bad"));

        let mut good = Graph::bare();
        good.bind_prefix("good", "http://good/");
        good.insert(label("g1", "Gene1"));
        assert_eq!(store.merge_graph(good).expect("merge"), 1);
        assert!(store.snapshot().prefixes().contains_key("good"));
    }

    #[test]
    fn triples_matching_collects_from_current_version() {
        let store = Store::new();
        store
            .insert_batch(vec![label("g1", "a"), label("g2", "b")])
            .expect("insert");

        let found = store.triples_matching(Some(&iri("g2")), None, None);
        assert_eq!(found, vec![label("g2", "b")]);
        assert!(store.contains(&label("g1", "a")));
    }

    #[test]
    fn concurrent_readers_and_writers() {
        let store = Arc::new(Store::new());

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for i in 0..50 {
                        let batch = vec![label(&format!("w{}g{}", w, i), "x")];
                        store.insert_batch(batch).expect("insert");
                    }
                })
            })
            .collect();

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..50 {
                        let snapshot = store.snapshot();
                        let scanned = snapshot.triples_matching(None, None, None).count();
                        assert_eq!(scanned, snapshot.len());
                    }
                })
            })
            .collect();

        for handle in writers.into_iter().chain(readers) {
            handle.join().expect("thread");
        }

        assert_eq!(store.len(), 200);
    }
}
