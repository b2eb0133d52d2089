//! # Graph Engine
//!
//! The in-memory triple storage for PhyloGraph CORE.
//!
//! This module implements the `GraphStore` trait.
//! Triples are kept in insertion order; indexes map keys to positions in
//! that order, so every scan is stable for a given graph value. Hash maps
//! are used for lookups only, never for iteration.

use crate::primitives::DEFAULT_PREFIXES;
use crate::{Iri, Term, Triple};
use std::collections::{BTreeMap, HashMap};

// =============================================================================
// GRAPHSTORE TRAIT
// =============================================================================

/// The GraphStore trait defines the read and insert surface the query
/// engine, the tree builder and the codecs are written against.
///
/// Absent selector fields act as wildcards.
pub trait GraphStore {
    /// Insert a triple. Returns true if the triple was not already present.
    ///
    /// The caller is responsible for validating the triple first.
    fn insert(&mut self, triple: Triple) -> bool;

    /// Check membership of a triple.
    fn contains(&self, triple: &Triple) -> bool;

    /// Lazily scan the triples matching the given fields.
    fn triples_matching<'a>(
        &'a self,
        subject: Option<&'a Iri>,
        predicate: Option<&'a Iri>,
        object: Option<&'a Term>,
    ) -> Box<dyn Iterator<Item = &'a Triple> + 'a>;

    /// Get the total number of triples.
    fn len(&self) -> usize;

    /// Get the first object for a subject and predicate, in insertion order.
    fn first_object<'a>(&'a self, subject: &'a Iri, predicate: &'a Iri) -> Option<&'a Term> {
        self.triples_matching(Some(subject), Some(predicate), None)
            .next()
            .map(|t| &t.object)
    }

    /// Check whether the graph holds no triples.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// GRAPH IMPLEMENTATION
// =============================================================================

/// Position of a triple in insertion order.
type TripleId = usize;

/// The main Graph structure.
#[derive(Debug, Clone)]
pub struct Graph {
    /// Triple storage in insertion order.
    triples: Vec<Triple>,

    /// Membership: Triple -> position
    positions: HashMap<Triple, TripleId>,

    /// subject -> predicate -> positions
    by_subject_predicate: HashMap<Iri, HashMap<Iri, Vec<TripleId>>>,

    /// subject -> positions
    by_subject: HashMap<Iri, Vec<TripleId>>,

    /// predicate -> positions
    by_predicate: HashMap<Iri, Vec<TripleId>>,

    /// Prefix bindings used for serialization only.
    prefixes: BTreeMap<String, String>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    /// Create a new empty graph with the default prefix bindings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            prefixes: DEFAULT_PREFIXES
                .iter()
                .map(|(p, ns)| ((*p).to_string(), (*ns).to_string()))
                .collect(),
            ..Self::bare()
        }
    }

    /// Create a new empty graph without any prefix bindings.
    ///
    /// Parsers start from a bare graph so that only the prefixes declared in
    /// the parsed document are carried over.
    #[must_use]
    pub fn bare() -> Self {
        Self {
            triples: Vec::new(),
            positions: HashMap::new(),
            by_subject_predicate: HashMap::new(),
            by_subject: HashMap::new(),
            by_predicate: HashMap::new(),
            prefixes: BTreeMap::new(),
        }
    }

    /// Get all triples in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Triple> {
        self.triples.iter()
    }

    /// Get all distinct subjects in first-seen order.
    pub fn subjects(&self) -> impl Iterator<Item = &Iri> {
        self.triples.iter().enumerate().filter_map(|(id, t)| {
            let first = self.by_subject.get(&t.subject).and_then(|ids| ids.first());
            (first == Some(&id)).then_some(&t.subject)
        })
    }

    /// Get the prefix bindings in prefix-name order.
    #[must_use]
    pub fn prefixes(&self) -> &BTreeMap<String, String> {
        &self.prefixes
    }

    /// Bind a prefix to a namespace, replacing any earlier binding.
    pub fn bind_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    /// Remove every triple. Prefix bindings are kept.
    pub fn clear(&mut self) {
        self.triples.clear();
        self.positions.clear();
        self.by_subject_predicate.clear();
        self.by_subject.clear();
        self.by_predicate.clear();
    }

    /// Positions for a bucket lookup; a missing bucket is an empty slice.
    fn bucket(ids: Option<&Vec<TripleId>>) -> &[TripleId] {
        ids.map_or(&[][..], Vec::as_slice)
    }
}

impl GraphStore for Graph {
    fn insert(&mut self, triple: Triple) -> bool {
        if self.positions.contains_key(&triple) {
            return false;
        }

        let id = self.triples.len();
        self.by_subject_predicate
            .entry(triple.subject.clone())
            .or_default()
            .entry(triple.predicate.clone())
            .or_default()
            .push(id);
        self.by_subject
            .entry(triple.subject.clone())
            .or_default()
            .push(id);
        self.by_predicate
            .entry(triple.predicate.clone())
            .or_default()
            .push(id);
        self.positions.insert(triple.clone(), id);
        self.triples.push(triple);

        true
    }

    fn contains(&self, triple: &Triple) -> bool {
        self.positions.contains_key(triple)
    }

    fn triples_matching<'a>(
        &'a self,
        subject: Option<&'a Iri>,
        predicate: Option<&'a Iri>,
        object: Option<&'a Term>,
    ) -> Box<dyn Iterator<Item = &'a Triple> + 'a> {
        let candidates: Box<dyn Iterator<Item = &'a Triple> + 'a> = match (subject, predicate) {
            (Some(s), Some(p)) => {
                let ids = Self::bucket(self.by_subject_predicate.get(s).and_then(|m| m.get(p)));
                Box::new(ids.iter().map(move |&id| &self.triples[id]))
            }
            (Some(s), None) => {
                let ids = Self::bucket(self.by_subject.get(s));
                Box::new(ids.iter().map(move |&id| &self.triples[id]))
            }
            (None, Some(p)) => {
                let ids = Self::bucket(self.by_predicate.get(p));
                Box::new(ids.iter().map(move |&id| &self.triples[id]))
            }
            (None, None) => Box::new(self.triples.iter()),
        };

        // Index buckets only narrow by subject/predicate; re-check every field.
        Box::new(candidates.filter(move |t| {
            subject.is_none_or(|s| &t.subject == s)
                && predicate.is_none_or(|p| &t.predicate == p)
                && object.is_none_or(|o| &t.object == o)
        }))
    }

    fn len(&self) -> usize {
        self.triples.len()
    }
}

// =============================================================================
// TESTS
// =============================================================================
