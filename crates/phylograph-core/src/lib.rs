//! # phylograph-core
//!
//! The triple store and query engine for PhyloGraph - THE LOGIC.
//!
//! This crate records gene, trait and ortholog facts as RDF-style triples,
//! answers conjunctive pattern queries over them, derives the ortholog tree
//! and moves the store in and out of interchange formats.
//!
//! ## Components
//!
//! - `graph` / `store`: indexed triple set and its thread-safe owner
//! - `ingest`: typed fact records into validated triple batches
//! - `query`: SELECT parsing and left-to-right pattern joins
//! - `tree`: ortholog tree derived from membership facts
//! - `formats`: turtle, RDF/XML, PhyloXML and the snapshot format
//!
//! ## Architectural Constraints
//!
//! - Has NO async, NO network dependencies (pure Rust)
//! - Parsers fill a scratch graph; the store only sees complete batches
//! - Errors are returned to the caller, never logged

// =============================================================================
// MODULES
// =============================================================================

pub mod formats;
pub mod graph;
pub mod ingest;
pub mod primitives;
pub mod query;
pub mod store;
pub mod tree;
pub mod types;

mod lex;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{Iri, Literal, PhyloError, Term, Triple, Variable};

// =============================================================================
// RE-EXPORTS: Store and Ingest
// =============================================================================

pub use graph::{Graph, GraphStore};
pub use ingest::{GermplasmLink, Ingestor, OrthologLink, TraitLink, classify_identifier};
pub use store::{Snapshot, Store};

// =============================================================================
// RE-EXPORTS: Query and Tree
// =============================================================================

pub use query::{
    Binding, Filter, FilterOp, JsonTerm, Projection, Query, Solutions, SparqlJson, TriplePattern,
    evaluate, evaluate_patterns, parse_query,
};
pub use tree::{GeneRecord, TreeNode, build_tree, export_tree, gene_records, group_ids};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{PLACEHOLDER_PHYLOXML, SNAPSHOT_HEADER, graph_from_snapshot, graph_to_snapshot};
