//! # Query Engine
//!
//! Left-to-right incremental join over a `GraphStore`.
//!
//! ## Algorithm
//!
//! The working set starts as one empty binding. For each pattern in order,
//! every partial binding is substituted into the pattern, the now partially
//! concrete pattern is scanned with `triples_matching`, and each match
//! extends the binding. A match that disagrees with an existing binding
//! (including a variable repeated inside one pattern) is discarded.
//!
//! Patterns are never reordered, so the result order is the nested scan
//! order of the snapshot.

use crate::graph::GraphStore;
use crate::primitives::MAX_QUERY_PATTERNS;
use crate::query::{Filter, FilterOp, Query, TriplePattern};
use crate::query::results::Solutions;
use crate::{Iri, PhyloError, Term, Variable};
use std::collections::{BTreeMap, HashSet};

/// Assignment of variable names to terms.
pub type Binding = BTreeMap<String, Term>;

// =============================================================================
// PATTERN JOIN
// =============================================================================

/// Replace a bound variable with its value.
fn substitute(term: &Term, binding: &Binding) -> Term {
    match term {
        Term::Variable(var) => binding
            .get(var.name())
            .cloned()
            .unwrap_or_else(|| term.clone()),
        other => other.clone(),
    }
}

/// Bind `term` to `value` if it is a variable. Returns false on conflict.
fn unify(binding: &mut Binding, term: &Term, value: Term) -> bool {
    let Term::Variable(var) = term else {
        return true;
    };
    match binding.get(var.name()) {
        Some(existing) => *existing == value,
        None => {
            binding.insert(var.name().to_string(), value);
            true
        }
    }
}

/// A subject or predicate position: `Err(())` when it can never match.
fn iri_position(term: &Term) -> Result<Option<&Iri>, ()> {
    match term {
        Term::Iri(iri) => Ok(Some(iri)),
        Term::Variable(_) => Ok(None),
        Term::Literal(_) => Err(()),
    }
}

fn extend<G: GraphStore + ?Sized>(
    graph: &G,
    pattern: &TriplePattern,
    binding: &Binding,
    out: &mut Vec<Binding>,
) {
    let subject = substitute(&pattern.subject, binding);
    let predicate = substitute(&pattern.predicate, binding);
    let object = substitute(&pattern.object, binding);

    let (Ok(s), Ok(p)) = (iri_position(&subject), iri_position(&predicate)) else {
        return;
    };
    let o = match &object {
        Term::Variable(_) => None,
        concrete => Some(concrete),
    };

    for triple in graph.triples_matching(s, p, o) {
        let mut extended = binding.clone();
        if unify(&mut extended, &subject, Term::Iri(triple.subject.clone()))
            && unify(&mut extended, &predicate, Term::Iri(triple.predicate.clone()))
            && unify(&mut extended, &object, triple.object.clone())
        {
            out.push(extended);
        }
    }
}

/// Evaluate a conjunction of patterns.
///
/// An empty pattern list yields exactly one empty binding.
pub fn evaluate_patterns<G: GraphStore + ?Sized>(
    graph: &G,
    patterns: &[TriplePattern],
) -> Vec<Binding> {
    let mut solutions = vec![Binding::new()];

    for pattern in patterns {
        let mut next = Vec::new();
        for binding in &solutions {
            extend(graph, pattern, binding, &mut next);
        }
        solutions = next;
        if solutions.is_empty() {
            break;
        }
    }

    solutions
}

// =============================================================================
// FULL QUERY
// =============================================================================

fn resolve<'a>(term: &'a Term, binding: &'a Binding) -> Option<&'a Term> {
    match term {
        Term::Variable(var) => binding.get(var.name()),
        other => Some(other),
    }
}

fn passes(filter: &Filter, binding: &Binding) -> bool {
    let equal = resolve(&filter.left, binding) == resolve(&filter.right, binding);
    match filter.op {
        FilterOp::Eq => equal,
        FilterOp::NotEq => !equal,
    }
}

/// Check that every projected and filtered variable is bound by a pattern.
fn check_variables(query: &Query) -> Result<Vec<Variable>, PhyloError> {
    let bound = query.pattern_variables();
    let unbound = |var: &Variable| !bound.contains(var);

    let projected = query.projected_variables();
    if let Some(var) = projected.iter().find(|v| unbound(v)) {
        return Err(PhyloError::QueryEvaluation(format!(
            "projected variable {} is not bound by any pattern",
            var
        )));
    }

    let filtered = query
        .filters
        .iter()
        .flat_map(|f| [&f.left, &f.right])
        .filter_map(Term::as_variable)
        .find(|v| unbound(v));
    if let Some(var) = filtered {
        return Err(PhyloError::QueryEvaluation(format!(
            "filter variable {} is not bound by any pattern",
            var
        )));
    }

    Ok(projected)
}

/// Evaluate a query: join, filters, projection, DISTINCT, OFFSET, LIMIT.
///
/// Fails without partial results when a projected or filtered variable is
/// never bound.
pub fn evaluate<G: GraphStore + ?Sized>(graph: &G, query: &Query) -> Result<Solutions, PhyloError> {
    if query.patterns.len() > MAX_QUERY_PATTERNS {
        return Err(PhyloError::QueryEvaluation(format!(
            "query has {} patterns, maximum is {}",
            query.patterns.len(),
            MAX_QUERY_PATTERNS
        )));
    }
    let variables = check_variables(query)?;

    let projected = evaluate_patterns(graph, &query.patterns)
        .into_iter()
        .filter(|binding| query.filters.iter().all(|f| passes(f, binding)))
        .map(|binding| {
            variables
                .iter()
                .filter_map(|v| {
                    binding
                        .get(v.name())
                        .map(|term| (v.name().to_string(), term.clone()))
                })
                .collect::<Binding>()
        });

    let rows: Vec<Binding> = if query.distinct {
        let mut seen: HashSet<Binding> = HashSet::new();
        projected.filter(|row| seen.insert(row.clone())).collect()
    } else {
        projected.collect()
    };

    let rows = rows
        .into_iter()
        .skip(query.offset)
        .take(query.limit.unwrap_or(usize::MAX))
        .collect();

    Ok(Solutions::new(
        variables.into_iter().map(|v| v.name().to_string()).collect(),
        rows,
    ))
}

// =============================================================================
// TESTS
// =============================================================================
