//! # Core Type Definitions
//!
//! This module contains all core types for the PhyloGraph triple store:
//! - Terms (`Iri`, `Literal`, `Variable`, `Term`)
//! - Statements (`Triple`)
//! - Error types (`PhyloError`)
//!
//! ## Term Classification
//!
//! Every string that enters the store is classified exactly once, when it is
//! wrapped in one of the term types below. Downstream code never guesses
//! whether a bare string is a reference or a value.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// IRI
// =============================================================================

/// An absolute identifier naming an entity or a relation.
///
/// Construction is unchecked; `Iri::validate` is applied by the store when a
/// batch is ingested.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Iri(String);

impl Iri {
    /// Wrap a string as an IRI without validation.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the IRI as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the IRI and return the inner string.
    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }

    /// Check that the IRI is absolute (has a URI scheme) and contains no
    /// characters that are illegal in an IRI reference.
    pub fn validate(&self) -> Result<(), String> {
        let s = self.0.as_str();
        let Some(colon) = s.find(':') else {
            return Err(format!("'{}' has no URI scheme", s));
        };

        let scheme = &s[..colon];
        let mut chars = scheme.chars();
        let scheme_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
            && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
        if !scheme_ok {
            return Err(format!("'{}' has an invalid URI scheme", s));
        }

        if s.len() == colon + 1 {
            return Err(format!("'{}' is empty after its scheme", s));
        }

        if let Some(bad) = s.chars().find(|c| {
            c.is_whitespace()
                || c.is_control()
                || matches!(c, '<' | '>' | '"' | '{' | '}' | '|' | '\\' | '^' | '`')
        }) {
            return Err(format!("'{}' contains illegal character {:?}", s, bad));
        }

        Ok(())
    }

    /// Check whether the IRI is absolute without producing a message.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Iri {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

// =============================================================================
// LITERAL
// =============================================================================

/// A scalar value, optionally tagged with a language or a datatype.
///
/// A literal carries at most one of `language` and `datatype`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Literal {
    value: String,
    language: Option<String>,
    datatype: Option<Iri>,
}

impl Literal {
    /// A plain string literal.
    #[must_use]
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            language: None,
            datatype: None,
        }
    }

    /// A language-tagged literal.
    #[must_use]
    pub fn with_language(value: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            language: Some(language.into()),
            datatype: None,
        }
    }

    /// A datatyped literal.
    #[must_use]
    pub fn typed(value: impl Into<String>, datatype: Iri) -> Self {
        Self {
            value: value.into(),
            language: None,
            datatype: Some(datatype),
        }
    }

    /// The lexical value.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The language tag, if any.
    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// The datatype IRI, if any.
    #[must_use]
    pub fn datatype(&self) -> Option<&Iri> {
        self.datatype.as_ref()
    }

    /// Check the language tag shape and the datatype IRI.
    pub fn validate(&self) -> Result<(), String> {
        if self.language.is_some() && self.datatype.is_some() {
            return Err("literal has both a language tag and a datatype".to_string());
        }
        if let Some(lang) = &self.language
            && !is_language_tag(lang)
        {
            return Err(format!("'{}' is not a valid language tag", lang));
        }
        if let Some(datatype) = &self.datatype {
            datatype.validate()?;
        }
        Ok(())
    }
}

/// `[A-Za-z]+(-[A-Za-z0-9]+)*`
pub(crate) fn is_language_tag(tag: &str) -> bool {
    let mut parts = tag.split('-');
    let primary_ok = parts
        .next()
        .is_some_and(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_alphabetic()));
    primary_ok && parts.all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_alphanumeric()))
}

// =============================================================================
// VARIABLE
// =============================================================================

/// A query variable. Variables exist only inside query patterns.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Variable(String);

impl Variable {
    /// Create a variable from its name (without the leading `?`).
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The variable name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "?{}", self.0)
    }
}

// =============================================================================
// TERM
// =============================================================================

/// A node in a triple or a triple pattern.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Term {
    Iri(Iri),
    Literal(Literal),
    Variable(Variable),
}

impl Term {
    /// Shorthand for an IRI term.
    #[must_use]
    pub fn iri(s: impl Into<String>) -> Self {
        Self::Iri(Iri::new(s))
    }

    /// Shorthand for a plain literal term.
    #[must_use]
    pub fn literal(s: impl Into<String>) -> Self {
        Self::Literal(Literal::plain(s))
    }

    /// Shorthand for a variable term.
    #[must_use]
    pub fn var(name: impl Into<String>) -> Self {
        Self::Variable(Variable::new(name))
    }

    #[must_use]
    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            Self::Iri(iri) => Some(iri),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Self::Literal(lit) => Some(lit),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_variable(&self) -> Option<&Variable> {
        match self {
            Self::Variable(var) => Some(var),
            _ => None,
        }
    }

    /// The IRI string or the literal's lexical value.
    ///
    /// Variables have no value and yield their name.
    #[must_use]
    pub fn lexical(&self) -> &str {
        match self {
            Self::Iri(iri) => iri.as_str(),
            Self::Literal(lit) => lit.value(),
            Self::Variable(var) => var.name(),
        }
    }
}

impl From<Iri> for Term {
    fn from(iri: Iri) -> Self {
        Self::Iri(iri)
    }
}

impl From<Literal> for Term {
    fn from(lit: Literal) -> Self {
        Self::Literal(lit)
    }
}

// =============================================================================
// TRIPLE
// =============================================================================

/// A subject-predicate-object statement, the atomic unit of the store.
///
/// Subject and predicate are IRIs by construction; the object may be an IRI
/// or a literal. A triple whose object is a variable is rejected on insert.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Triple {
    pub subject: Iri,
    pub predicate: Iri,
    pub object: Term,
}

impl Triple {
    /// Create a new triple.
    #[must_use]
    pub fn new(subject: Iri, predicate: Iri, object: impl Into<Term>) -> Self {
        Self {
            subject,
            predicate,
            object: object.into(),
        }
    }

    /// Validate the triple for insertion into a store.
    pub fn validate(&self) -> Result<(), String> {
        self.subject
            .validate()
            .map_err(|e| format!("subject {}", e))?;
        self.predicate
            .validate()
            .map_err(|e| format!("predicate {}", e))?;
        match &self.object {
            Term::Iri(iri) => iri.validate().map_err(|e| format!("object {}", e)),
            Term::Literal(lit) => lit.validate().map_err(|e| format!("object {}", e)),
            Term::Variable(var) => Err(format!("object {} is a query variable", var)),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the PhyloGraph system.
///
/// - No silent failures
/// - Use `Result<T, PhyloError>` for fallible operations
/// - A failed operation leaves the store exactly as it was
#[derive(Debug, Error)]
pub enum PhyloError {
    /// An ingest batch contained a malformed triple; the batch was rejected.
    #[error("Malformed triple at index {index}: {reason}")]
    MalformedTriple { index: usize, reason: String },

    /// Codec input could not be parsed; the target store is unchanged.
    #[error("Parse error at line {line}, column {column}: {message}")]
    ParseError {
        line: usize,
        column: usize,
        message: String,
    },

    /// The query uses syntax outside the supported pattern-join subset.
    #[error("Query syntax error: {0}")]
    QuerySyntax(String),

    /// The query could not be evaluated.
    #[error("Query evaluation error: {0}")]
    QueryEvaluation(String),

    /// A remote endpoint could not be queried.
    #[error("Federation error for {endpoint}: {cause}")]
    Federation { endpoint: String, cause: String },

    /// The store contents cannot be expressed in the requested format.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iri_validation_accepts_absolute() {
        assert!(Iri::new("http://example.org/AT1G01010").is_valid());
        assert!(Iri::new("urn:isbn:0451450523").is_valid());
    }

    #[test]
    fn iri_validation_rejects_relative_and_illegal() {
        assert!(!Iri::new("AT1G01010").is_valid());
        assert!(!Iri::new("1http://x").is_valid());
        assert!(!Iri::new("http:").is_valid());
        assert!(!Iri::new("http://x/a b").is_valid());
        assert!(!Iri::new("http://x/<a>").is_valid());
    }

    #[test]
    fn literal_cannot_carry_language_and_datatype() {
        let lit = Literal {
            value: "x".to_string(),
            language: Some("en".to_string()),
            datatype: Some(Iri::new("http://www.w3.org/2001/XMLSchema#string")),
        };
        assert!(lit.validate().is_err());
    }

    #[test]
    fn language_tag_shape() {
        assert!(is_language_tag("en"));
        assert!(is_language_tag("en-US"));
        assert!(!is_language_tag(""));
        assert!(!is_language_tag("en-"));
        assert!(!is_language_tag("1en"));
    }

    #[test]
    fn triple_with_variable_object_is_malformed() {
        let triple = Triple::new(
            Iri::new("http://x/s"),
            Iri::new("http://x/p"),
            Term::var("o"),
        );
        assert!(triple.validate().is_err());
    }

    #[test]
    fn term_accessors() {
        let term = Term::iri("http://x/a");
        assert_eq!(term.as_iri().map(Iri::as_str), Some("http://x/a"));
        assert!(term.as_literal().is_none());
        assert_eq!(Term::literal("v").lexical(), "v");
        assert_eq!(Term::var("g").as_variable().map(Variable::name), Some("g"));
    }
}
