//! # Primitives
//!
//! Hardcoded vocabulary and limits for the PhyloGraph CORE.
//!
//! These constants are compiled into the binary and are immutable at runtime.
//!
//! ## Vocabulary
//!
//! 1. **Trait facts** live under the `ex:` namespace.
//! 2. **Ortholog facts** live under the `orth:` namespace.
//! 3. **RDF/XSD** terms used by the codecs.

// =============================================================================
// NAMESPACES
// =============================================================================

/// Default namespace for gene, trait and germplasm identifiers.
pub const EX: &str = "http://example.org/";

/// Namespace for ortholog membership facts.
pub const ORTH: &str = "http://example.org/ortholog/";

pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";
pub const OWL: &str = "http://www.w3.org/2002/07/owl#";

/// Prefix bindings present on every fresh graph.
pub const DEFAULT_PREFIXES: [(&str, &str); 6] = [
    ("rdf", RDF),
    ("rdfs", RDFS),
    ("xsd", XSD),
    ("owl", OWL),
    ("ex", EX),
    ("orth", ORTH),
];

// =============================================================================
// TERMS
// =============================================================================

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

pub const XSD_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#integer";
pub const XSD_DECIMAL: &str = "http://www.w3.org/2001/XMLSchema#decimal";
pub const XSD_BOOLEAN: &str = "http://www.w3.org/2001/XMLSchema#boolean";

pub const EX_GENE: &str = "http://example.org/Gene";
pub const EX_GERMPLASM: &str = "http://example.org/Germplasm";
pub const EX_ASSOCIATED_WITH: &str = "http://example.org/associatedWith";
pub const EX_SPECIES: &str = "http://example.org/species";
pub const EX_LABEL: &str = "http://example.org/label";

pub const ORTH_MEMBER_OF: &str = "http://example.org/ortholog/memberOf";
pub const ORTH_SPECIES: &str = "http://example.org/ortholog/species";
pub const ORTH_LABEL: &str = "http://example.org/ortholog/label";

// =============================================================================
// TREE VIEW
// =============================================================================

/// Name of the root node of an ortholog forest.
pub const TREE_ROOT_NAME: &str = "GraphOrthologs";

/// Species reported for a gene without a species fact.
pub const UNKNOWN_SPECIES: &str = "Unknown";

/// Group the demo seed places its gene in.
pub const DEMO_GROUP: &str = "DemoOrtholog1";

// =============================================================================
// INPUT VALIDATION LIMITS
// =============================================================================

/// Maximum number of triples in a single ingest batch.
///
/// Batches longer than this are rejected before any validation work.
pub const MAX_BATCH_LENGTH: usize = 1_000_000;

/// Maximum size of a snapshot file accepted at startup (256 MB).
pub const MAX_SNAPSHOT_SIZE: usize = 256 * 1024 * 1024;

/// Maximum number of triple patterns in a single query.
pub const MAX_QUERY_PATTERNS: usize = 64;
