//! # Turtle Codec
//!
//! Textual triple format: a Turtle subset without blank nodes or collections.
//!
//! Serialization is deterministic for a given graph value: prefixes in name
//! order, subjects in first-seen order, one line per triple in insertion
//! order.

use crate::formats::resolve_iri;
use crate::graph::{Graph, GraphStore};
use crate::lex::{Token, TokenKind, tokenize};
use crate::primitives::{RDF_TYPE, XSD_BOOLEAN, XSD_DECIMAL, XSD_INTEGER};
use crate::types::is_language_tag;
use crate::{Iri, Literal, PhyloError, Term, Triple};
use std::collections::BTreeMap;
use std::fmt::Write;

// =============================================================================
// SERIALIZATION
// =============================================================================

/// Serialize a graph as turtle text.
#[must_use]
pub fn serialize(graph: &Graph) -> String {
    let prefixes: Vec<(&str, &str)> = graph
        .prefixes()
        .iter()
        .filter(|(prefix, ns)| is_prefix_name(prefix) && Iri::new(ns.as_str()).is_valid())
        .map(|(p, ns)| (p.as_str(), ns.as_str()))
        .collect();

    let mut out = String::new();
    for (prefix, namespace) in &prefixes {
        let _ = writeln!(out, "@prefix {}: <{}> .", prefix, namespace);
    }

    for subject in graph.subjects() {
        out.push('\n');
        let _ = write!(out, "{}", write_iri(subject.as_str(), &prefixes));

        let mut first = true;
        for triple in graph.triples_matching(Some(subject), None, None) {
            let predicate = if triple.predicate.as_str() == RDF_TYPE {
                "a".to_string()
            } else {
                write_iri(triple.predicate.as_str(), &prefixes)
            };
            let object = write_term(&triple.object, &prefixes);

            if first {
                let _ = write!(out, " {} {}", predicate, object);
                first = false;
            } else {
                let _ = write!(out, " ;\n    {} {}", predicate, object);
            }
        }
        out.push_str(" .\n");
    }

    out
}

fn is_prefix_name(prefix: &str) -> bool {
    prefix.is_empty()
        || (prefix.starts_with(|c: char| c.is_alphabetic())
            && prefix.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-'))
}

fn is_local_name(local: &str) -> bool {
    !local.is_empty()
        && !local.starts_with('-')
        && local.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-')
}

/// Prefixed name under the longest matching namespace, else `<iri>`.
fn write_iri(iri: &str, prefixes: &[(&str, &str)]) -> String {
    prefixes
        .iter()
        .filter(|(_, ns)| !ns.is_empty() && iri.starts_with(ns))
        .filter(|(_, ns)| is_local_name(&iri[ns.len()..]))
        .max_by_key(|(_, ns)| ns.len())
        .map(|(prefix, ns)| format!("{}:{}", prefix, &iri[ns.len()..]))
        .unwrap_or_else(|| format!("<{}>", iri))
}

fn write_term(term: &Term, prefixes: &[(&str, &str)]) -> String {
    match term {
        Term::Iri(iri) => write_iri(iri.as_str(), prefixes),
        Term::Literal(lit) => {
            let mut out = format!("\"{}\"", escape_string(lit.value()));
            if let Some(lang) = lit.language() {
                out.push('@');
                out.push_str(lang);
            } else if let Some(datatype) = lit.datatype() {
                out.push_str("^^");
                out.push_str(&write_iri(datatype.as_str(), prefixes));
            }
            out
        }
        Term::Variable(var) => var.to_string(),
    }
}

/// Escape a literal value for a short double-quoted string.
pub(crate) fn escape_string(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04X}", c as u32);
            }
            c => out.push(c),
        }
    }
    out
}

// =============================================================================
// PARSING
// =============================================================================

/// Parse turtle text into a fresh graph.
///
/// The result carries only the prefixes the document declares. A failed
/// parse returns `PhyloError::ParseError` and produces no graph.
pub fn parse(input: &str) -> Result<Graph, PhyloError> {
    let tokens = tokenize(input).map_err(|e| PhyloError::ParseError {
        line: e.line,
        column: e.column,
        message: e.message,
    })?;

    let (line, column) = crate::formats::line_column(input, input.len());
    let mut parser = Parser {
        tokens: &tokens,
        pos: 0,
        prefixes: BTreeMap::new(),
        base: None,
        graph: Graph::bare(),
        eof: (line, column),
    };
    parser.document()?;

    let Parser {
        mut graph,
        prefixes,
        ..
    } = parser;
    for (prefix, namespace) in prefixes {
        graph.bind_prefix(prefix, namespace);
    }
    Ok(graph)
}

/// Build the typed literal for a bare numeric token.
pub(crate) fn number_literal(number: &str) -> Literal {
    let datatype = if number.contains('.') {
        XSD_DECIMAL
    } else {
        XSD_INTEGER
    };
    Literal::typed(number, Iri::new(datatype))
}

/// Build the typed literal for a bare `true` / `false`.
pub(crate) fn boolean_literal(word: &str) -> Option<Literal> {
    matches!(word, "true" | "false").then(|| Literal::typed(word, Iri::new(XSD_BOOLEAN)))
}

struct Parser<'t> {
    tokens: &'t [Token],
    pos: usize,
    prefixes: BTreeMap<String, String>,
    base: Option<String>,
    graph: Graph,
    eof: (usize, usize),
}

impl<'t> Parser<'t> {
    fn current(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn error(&self, token: Option<&Token>, message: impl Into<String>) -> PhyloError {
        let (line, column) = token.map_or(self.eof, |t| (t.line, t.column));
        PhyloError::ParseError {
            line,
            column,
            message: message.into(),
        }
    }

    fn unexpected(&self, token: Option<&Token>, expected: &str) -> PhyloError {
        match token {
            Some(t) => self.error(token, format!("expected {}, found {}", expected, t.kind)),
            None => self.error(None, format!("expected {}, found end of input", expected)),
        }
    }

    fn expect_dot(&mut self) -> Result<(), PhyloError> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::Dot,
                ..
            }) => Ok(()),
            other => Err(self.unexpected(other, "'.'")),
        }
    }

    fn document(&mut self) -> Result<(), PhyloError> {
        while let Some(token) = self.current() {
            match &token.kind {
                TokenKind::At(directive) if directive == "prefix" => {
                    self.advance();
                    self.prefix_declaration()?;
                    self.expect_dot()?;
                }
                TokenKind::At(directive) if directive == "base" => {
                    self.advance();
                    self.base_declaration()?;
                    self.expect_dot()?;
                }
                TokenKind::At(directive) => {
                    return Err(self.error(Some(token), format!("unknown directive @{}", directive)));
                }
                TokenKind::Word(w) if w.eq_ignore_ascii_case("PREFIX") => {
                    self.advance();
                    self.prefix_declaration()?;
                }
                TokenKind::Word(w) if w.eq_ignore_ascii_case("BASE") => {
                    self.advance();
                    self.base_declaration()?;
                }
                _ => {
                    self.triples()?;
                    self.expect_dot()?;
                }
            }
        }
        Ok(())
    }

    fn prefix_declaration(&mut self) -> Result<(), PhyloError> {
        let token = self.advance();
        let prefix = match token.map(|t| &t.kind) {
            Some(TokenKind::PrefixedName { prefix, local }) if local.is_empty() => prefix.clone(),
            _ => return Err(self.unexpected(token, "prefix name ending in ':'")),
        };
        let namespace = self.iri_ref()?;
        self.prefixes.insert(prefix, namespace.into_string());
        Ok(())
    }

    fn base_declaration(&mut self) -> Result<(), PhyloError> {
        let base = self.iri_ref()?;
        self.base = Some(base.into_string());
        Ok(())
    }

    fn iri_ref(&mut self) -> Result<Iri, PhyloError> {
        let token = self.advance();
        match token.map(|t| &t.kind) {
            Some(TokenKind::IriRef(reference)) => self.absolute(token, reference),
            _ => Err(self.unexpected(token, "IRI reference")),
        }
    }

    fn absolute(&self, token: Option<&Token>, reference: &str) -> Result<Iri, PhyloError> {
        let iri = resolve_iri(self.base.as_deref(), reference);
        iri.validate()
            .map_err(|reason| self.error(token, format!("invalid IRI: {}", reason)))?;
        Ok(iri)
    }

    /// IRI reference or prefixed name.
    fn iri(&mut self, role: &str) -> Result<Iri, PhyloError> {
        let token = self.current();
        match token.map(|t| &t.kind) {
            Some(TokenKind::IriRef(reference)) => {
                self.advance();
                self.absolute(token, reference)
            }
            Some(TokenKind::PrefixedName { prefix, local }) => {
                self.advance();
                let namespace = self
                    .prefixes
                    .get(prefix)
                    .ok_or_else(|| self.error(token, format!("undeclared prefix '{}:'", prefix)))?;
                self.absolute(token, &format!("{}{}", namespace, local))
            }
            Some(TokenKind::BlankNode(_) | TokenKind::LBracket) => {
                Err(self.error(token, "blank nodes are not supported"))
            }
            Some(TokenKind::LParen) => Err(self.error(token, "collections are not supported")),
            Some(TokenKind::Str(_) | TokenKind::Number(_)) => {
                Err(self.error(token, format!("a literal cannot be a {}", role)))
            }
            _ => Err(self.unexpected(token, role)),
        }
    }

    fn triples(&mut self) -> Result<(), PhyloError> {
        let subject = self.iri("subject")?;

        loop {
            let predicate = match self.current().map(|t| &t.kind) {
                Some(TokenKind::Word(w)) if w == "a" => {
                    self.advance();
                    Iri::new(RDF_TYPE)
                }
                _ => self.iri("predicate")?,
            };

            loop {
                let object = self.object()?;
                self.graph
                    .insert(Triple::new(subject.clone(), predicate.clone(), object));
                if matches!(self.current().map(|t| &t.kind), Some(TokenKind::Comma)) {
                    self.advance();
                } else {
                    break;
                }
            }

            if !matches!(self.current().map(|t| &t.kind), Some(TokenKind::Semicolon)) {
                return Ok(());
            }
            while matches!(self.current().map(|t| &t.kind), Some(TokenKind::Semicolon)) {
                self.advance();
            }
            if matches!(self.current().map(|t| &t.kind), Some(TokenKind::Dot) | None) {
                return Ok(());
            }
        }
    }

    fn object(&mut self) -> Result<Term, PhyloError> {
        let token = self.current();
        match token.map(|t| &t.kind) {
            Some(TokenKind::Str(value)) => {
                self.advance();
                self.literal_suffix(value).map(Term::Literal)
            }
            Some(TokenKind::Number(number)) => {
                self.advance();
                Ok(Term::Literal(number_literal(number)))
            }
            Some(TokenKind::Word(word)) => match boolean_literal(word) {
                Some(lit) => {
                    self.advance();
                    Ok(Term::Literal(lit))
                }
                None => Err(self.unexpected(token, "object")),
            },
            _ => self.iri("object").map(Term::Iri),
        }
    }

    fn literal_suffix(&mut self, value: &str) -> Result<Literal, PhyloError> {
        let token = self.current();
        match token.map(|t| &t.kind) {
            Some(TokenKind::At(lang)) => {
                self.advance();
                if !is_language_tag(lang) {
                    return Err(self.error(token, format!("invalid language tag '{}'", lang)));
                }
                Ok(Literal::with_language(value, lang.as_str()))
            }
            Some(TokenKind::DoubleCaret) => {
                self.advance();
                let datatype = self.iri("datatype")?;
                Ok(Literal::typed(value, datatype))
            }
            _ => Ok(Literal::plain(value)),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
