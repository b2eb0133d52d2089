//! # Query Module
//!
//! Structured query types for conjunctive pattern matching.
//!
//! - `parser`: SELECT query text into a `Query`
//! - `engine`: left-to-right incremental join over a `GraphStore`
//! - `results`: solution sequences and their JSON results shape

pub mod engine;
pub mod parser;
pub mod results;

pub use engine::{Binding, evaluate, evaluate_patterns};
pub use parser::parse_query;
pub use results::{JsonTerm, Solutions, SparqlJson};

use crate::{Term, Variable};

/// A triple whose positions may hold variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriplePattern {
    pub subject: Term,
    pub predicate: Term,
    pub object: Term,
}

impl TriplePattern {
    /// Create a new triple pattern.
    #[must_use]
    pub fn new(subject: Term, predicate: Term, object: Term) -> Self {
        Self {
            subject,
            predicate,
            object,
        }
    }

    /// Variables in subject, predicate, object order (repeats included).
    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        [&self.subject, &self.predicate, &self.object]
            .into_iter()
            .filter_map(Term::as_variable)
    }
}

/// Which variables a query returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// `SELECT *`: every pattern variable, in first-appearance order.
    All,
    /// An explicit variable list.
    Variables(Vec<Variable>),
}

/// Comparison used by a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    NotEq,
}

/// `FILTER(left op right)` with exact term comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub left: Term,
    pub op: FilterOp,
    pub right: Term,
}

/// A parsed SELECT query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub projection: Projection,
    pub distinct: bool,
    pub patterns: Vec<TriplePattern>,
    pub filters: Vec<Filter>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Query {
    /// `SELECT *` over the given patterns, without modifiers.
    #[must_use]
    pub fn select_all(patterns: Vec<TriplePattern>) -> Self {
        Self {
            projection: Projection::All,
            distinct: false,
            patterns,
            filters: Vec::new(),
            limit: None,
            offset: 0,
        }
    }

    /// Distinct pattern variables in first-appearance order.
    #[must_use]
    pub fn pattern_variables(&self) -> Vec<Variable> {
        let mut seen = Vec::new();
        for var in self.patterns.iter().flat_map(TriplePattern::variables) {
            if !seen.contains(var) {
                seen.push(var.clone());
            }
        }
        seen
    }

    /// The variables a solution row carries, in output order.
    #[must_use]
    pub fn projected_variables(&self) -> Vec<Variable> {
        match &self.projection {
            Projection::All => self.pattern_variables(),
            Projection::Variables(vars) => vars.clone(),
        }
    }
}
