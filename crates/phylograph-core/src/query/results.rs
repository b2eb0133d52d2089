//! # Query Results
//!
//! Solution sequences and the SPARQL JSON results shape shared by local
//! queries and federated responses.

use crate::query::engine::Binding;
use crate::{PhyloError, Term};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The ordered result of evaluating a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Solutions {
    variables: Vec<String>,
    rows: Vec<Binding>,
}

impl Solutions {
    /// Create a solution sequence.
    #[must_use]
    pub fn new(variables: Vec<String>, rows: Vec<Binding>) -> Self {
        Self { variables, rows }
    }

    /// Projected variable names, in output order.
    #[must_use]
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// Solution rows, in evaluation order.
    #[must_use]
    pub fn rows(&self) -> &[Binding] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Reshape into the SPARQL JSON results format.
    #[must_use]
    pub fn to_json(&self) -> SparqlJson {
        SparqlJson {
            head: Head {
                vars: self.variables.clone(),
            },
            results: Results {
                bindings: self
                    .rows
                    .iter()
                    .map(|row| {
                        row.iter()
                            .map(|(name, term)| (name.clone(), JsonTerm::from(term)))
                            .collect()
                    })
                    .collect(),
            },
        }
    }
}

// =============================================================================
// SPARQL JSON RESULTS
// =============================================================================

/// `{ "head": { "vars": [...] }, "results": { "bindings": [...] } }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparqlJson {
    pub head: Head,
    pub results: Results,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Head {
    #[serde(default)]
    pub vars: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Results {
    pub bindings: Vec<BTreeMap<String, JsonTerm>>,
}

/// One bound value.
///
/// `kind` is `uri` or `literal` for local results; remote endpoints may
/// also report `bnode` or `typed-literal`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonTerm {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(rename = "xml:lang", default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<String>,
}

impl From<&Term> for JsonTerm {
    fn from(term: &Term) -> Self {
        match term {
            Term::Iri(iri) => Self {
                kind: "uri".to_string(),
                value: iri.as_str().to_string(),
                lang: None,
                datatype: None,
            },
            Term::Literal(lit) => Self {
                kind: "literal".to_string(),
                value: lit.value().to_string(),
                lang: lit.language().map(str::to_string),
                datatype: lit.datatype().map(|d| d.as_str().to_string()),
            },
            Term::Variable(var) => Self {
                kind: "variable".to_string(),
                value: var.name().to_string(),
                lang: None,
                datatype: None,
            },
        }
    }
}

impl SparqlJson {
    /// Parse a SPARQL JSON results document.
    pub fn from_slice(body: &[u8]) -> Result<Self, PhyloError> {
        serde_json::from_slice(body)
            .map_err(|e| PhyloError::SerializationError(format!("invalid SPARQL JSON results: {}", e)))
    }

    /// Render as pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String, PhyloError> {
        serde_json::to_string_pretty(self).map_err(|e| PhyloError::SerializationError(e.to_string()))
    }
}
