//! # Tree Builder
//!
//! Derives the ortholog tree from flat membership facts.
//!
//! The tree is a view: it is recomputed from the store on every request
//! and never written back.
//!
//! ```text
//! GraphOrthologs
//! ├── G1
//! │   ├── AT1G01010 (Arabidopsis thaliana)
//! │   └── Os01g0100100 (Oryza sativa)
//! └── G2
//!     └── ...
//! ```

use crate::graph::GraphStore;
use crate::primitives::{ORTH_LABEL, ORTH_MEMBER_OF, ORTH_SPECIES, TREE_ROOT_NAME, UNKNOWN_SPECIES};
use crate::query::{Binding, Query, TriplePattern, evaluate};
use crate::{Iri, PhyloError, Term};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A node of the ortholog tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub species: Option<String>,
    #[serde(default)]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    fn branch(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            species: None,
            children: Vec::new(),
        }
    }
}

/// One gene's membership in a group, with its resolved label and species.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneRecord {
    pub gene: Iri,
    pub group: String,
    pub label: String,
    pub species: String,
}

// =============================================================================
// MEMBERSHIP ROWS
// =============================================================================

/// Collect membership rows, in scan order.
///
/// Label and species come from the first `orth:label` / `orth:species`
/// fact of each gene, falling back to the gene IRI and `"Unknown"`.
pub fn gene_records<G: GraphStore + ?Sized>(
    graph: &G,
    group_id: Option<&str>,
) -> Result<Vec<GeneRecord>, PhyloError> {
    let group_term = group_id.map_or_else(|| Term::var("group"), Term::literal);
    let membership = TriplePattern::new(Term::var("gene"), Term::iri(ORTH_MEMBER_OF), group_term);

    let label_predicate = Iri::new(ORTH_LABEL);
    let species_predicate = Iri::new(ORTH_SPECIES);

    let solutions = evaluate(graph, &Query::select_all(vec![membership]))?;
    let records = solutions
        .rows()
        .iter()
        .filter_map(|row| membership_row(row, group_id))
        .map(|(gene, group)| {
            let label = graph
                .first_object(&gene, &label_predicate)
                .map_or_else(|| gene.as_str().to_string(), |t| t.lexical().to_string());
            let species = graph
                .first_object(&gene, &species_predicate)
                .map_or_else(|| UNKNOWN_SPECIES.to_string(), |t| t.lexical().to_string());
            GeneRecord {
                gene,
                group,
                label,
                species,
            }
        })
        .collect();
    Ok(records)
}

/// Gene IRI and group id of one join row.
fn membership_row(row: &Binding, group_id: Option<&str>) -> Option<(Iri, String)> {
    let gene = row.get("gene")?.as_iri()?.clone();
    let group = match group_id {
        Some(id) => id.to_string(),
        None => row.get("group")?.lexical().to_string(),
    };
    Some((gene, group))
}

// =============================================================================
// TREE
// =============================================================================

/// Group records under a `GraphOrthologs` root.
///
/// Groups appear in first-seen order, genes in first-seen order within a
/// group; a gene listed twice in one group appears once.
#[must_use]
pub fn build_tree(records: &[GeneRecord]) -> TreeNode {
    let mut root = TreeNode::branch(TREE_ROOT_NAME);
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut placed: HashSet<(&str, &Iri)> = HashSet::new();

    for record in records {
        if !placed.insert((record.group.as_str(), &record.gene)) {
            continue;
        }
        let position = *positions.entry(record.group.as_str()).or_insert_with(|| {
            root.children.push(TreeNode::branch(record.group.as_str()));
            root.children.len() - 1
        });

        root.children[position].children.push(TreeNode {
            name: record.label.clone(),
            species: Some(record.species.clone()),
            children: Vec::new(),
        });
    }

    root
}

/// Build the ortholog tree of a graph, optionally for a single group.
pub fn export_tree<G: GraphStore + ?Sized>(
    graph: &G,
    group_id: Option<&str>,
) -> Result<TreeNode, PhyloError> {
    Ok(build_tree(&gene_records(graph, group_id)?))
}

/// Sorted, distinct ortholog group ids.
#[must_use]
pub fn group_ids<G: GraphStore + ?Sized>(graph: &G) -> Vec<String> {
    let predicate = Iri::new(ORTH_MEMBER_OF);
    let mut ids: Vec<String> = graph
        .triples_matching(None, Some(&predicate), None)
        .map(|t| t.object.lexical().to_string())
        .collect();
    ids.sort();
    ids.dedup();
    ids
}

// =============================================================================
// TESTS
// =============================================================================
