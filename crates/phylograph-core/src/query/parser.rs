//! # Query Parser
//!
//! SELECT queries over basic graph patterns.
//!
//! Supported: `PREFIX`, `BASE`, `SELECT [DISTINCT] (* | ?var...)`, an
//! optional `WHERE`, one group of triple patterns with `;` / `,` shorthand
//! and `a`, `FILTER(term = term)` / `FILTER(term != term)`, `LIMIT`,
//! `OFFSET`. Everything else fails with `PhyloError::QuerySyntax` naming
//! the construct.

use crate::formats::resolve_iri;
use crate::formats::turtle::{boolean_literal, number_literal};
use crate::lex::{Token, TokenKind, tokenize};
use crate::primitives::{MAX_QUERY_PATTERNS, RDF_TYPE};
use crate::query::{Filter, FilterOp, Projection, Query, TriplePattern};
use crate::types::is_language_tag;
use crate::{Iri, Literal, PhyloError, Term, Variable};
use std::collections::HashMap;

/// Keywords of constructs outside the supported subset.
const UNSUPPORTED: &[&str] = &[
    "CONSTRUCT", "DESCRIBE", "ASK", "OPTIONAL", "UNION", "MINUS", "GRAPH", "SERVICE", "BIND",
    "VALUES", "ORDER", "GROUP", "HAVING", "FROM", "NAMED", "REDUCED", "INSERT", "DELETE", "LOAD",
    "CLEAR", "CREATE", "DROP", "COPY", "MOVE", "ADD", "WITH", "EXISTS", "NOT",
];

/// Parse query text into a `Query`.
pub fn parse_query(text: &str) -> Result<Query, PhyloError> {
    let tokens = tokenize(text).map_err(|e| {
        PhyloError::QuerySyntax(format!(
            "{} at line {}, column {}",
            e.message, e.line, e.column
        ))
    })?;

    let mut parser = QueryParser {
        tokens: &tokens,
        pos: 0,
        prefixes: HashMap::new(),
        base: None,
    };
    parser.query()
}

struct QueryParser<'t> {
    tokens: &'t [Token],
    pos: usize,
    prefixes: HashMap<String, String>,
    base: Option<String>,
}

impl<'t> QueryParser<'t> {
    fn current(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn current_kind(&self) -> Option<&'t TokenKind> {
        self.current().map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<&'t Token> {
        let token = self.tokens.get(self.pos);
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Upper-cased bare word at the cursor.
    fn keyword(&self) -> Option<String> {
        match self.current_kind() {
            Some(TokenKind::Word(w)) if w != "a" => Some(w.to_ascii_uppercase()),
            _ => None,
        }
    }

    fn error(&self, token: Option<&Token>, message: impl std::fmt::Display) -> PhyloError {
        match token {
            Some(t) => PhyloError::QuerySyntax(format!(
                "{} at line {}, column {}",
                message, t.line, t.column
            )),
            None => PhyloError::QuerySyntax(format!("{} at end of query", message)),
        }
    }

    fn unexpected(&self, token: Option<&Token>, expected: &str) -> PhyloError {
        match token {
            Some(t) => self.error(token, format!("expected {}, found {}", expected, t.kind)),
            None => self.error(None, format!("expected {}", expected)),
        }
    }

    fn unsupported(&self, token: Option<&Token>, construct: &str) -> PhyloError {
        self.error(token, format!("{} is not supported", construct))
    }

    /// Fail on a keyword of an unsupported construct at the cursor.
    fn reject_unsupported_keyword(&self) -> Result<(), PhyloError> {
        if let Some(word) = self.keyword()
            && UNSUPPORTED.contains(&word.as_str())
        {
            return Err(self.unsupported(self.current(), &word));
        }
        Ok(())
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), PhyloError> {
        let token = self.advance();
        match token {
            Some(t) if &t.kind == kind => Ok(()),
            _ => Err(self.unexpected(token, &kind.to_string())),
        }
    }

    // -------------------------------------------------------------------------
    // Query structure
    // -------------------------------------------------------------------------

    fn query(&mut self) -> Result<Query, PhyloError> {
        self.prologue()?;

        self.reject_unsupported_keyword()?;
        if self.keyword().as_deref() != Some("SELECT") {
            return Err(self.unexpected(self.current(), "SELECT"));
        }
        self.advance();

        let distinct = self.keyword().as_deref() == Some("DISTINCT");
        if distinct {
            self.advance();
        }
        self.reject_unsupported_keyword()?;

        let projection = self.projection()?;

        self.reject_unsupported_keyword()?;
        if self.keyword().as_deref() == Some("WHERE") {
            self.advance();
        }
        self.expect(&TokenKind::LBrace)?;

        let mut patterns = Vec::new();
        let mut filters = Vec::new();
        self.group(&mut patterns, &mut filters)?;

        if patterns.len() > MAX_QUERY_PATTERNS {
            return Err(PhyloError::QuerySyntax(format!(
                "query has {} patterns, maximum is {}",
                patterns.len(),
                MAX_QUERY_PATTERNS
            )));
        }

        let (limit, offset) = self.modifiers()?;

        Ok(Query {
            projection,
            distinct,
            patterns,
            filters,
            limit,
            offset: offset.unwrap_or(0),
        })
    }

    fn prologue(&mut self) -> Result<(), PhyloError> {
        loop {
            match self.keyword().as_deref() {
                Some("PREFIX") => {
                    self.advance();
                    let token = self.advance();
                    let prefix = match token.map(|t| &t.kind) {
                        Some(TokenKind::PrefixedName { prefix, local }) if local.is_empty() => {
                            prefix.clone()
                        }
                        _ => return Err(self.unexpected(token, "prefix name ending in ':'")),
                    };
                    let namespace = self.iri_ref()?;
                    self.prefixes.insert(prefix, namespace.into_string());
                }
                Some("BASE") => {
                    self.advance();
                    let base = self.iri_ref()?;
                    self.base = Some(base.into_string());
                }
                _ => return Ok(()),
            }
        }
    }

    fn projection(&mut self) -> Result<Projection, PhyloError> {
        if matches!(self.current_kind(), Some(TokenKind::Star)) {
            self.advance();
            return Ok(Projection::All);
        }

        let mut vars = Vec::new();
        loop {
            match self.current_kind() {
                Some(TokenKind::Variable(name)) => {
                    self.advance();
                    vars.push(Variable::new(name.as_str()));
                }
                Some(TokenKind::LParen) => {
                    return Err(self.unsupported(self.current(), "a SELECT expression"));
                }
                _ => break,
            }
        }

        if vars.is_empty() {
            return Err(self.unexpected(self.current(), "'*' or variables"));
        }
        Ok(Projection::Variables(vars))
    }

    fn group(
        &mut self,
        patterns: &mut Vec<TriplePattern>,
        filters: &mut Vec<Filter>,
    ) -> Result<(), PhyloError> {
        loop {
            match self.current_kind() {
                None => return Err(self.unexpected(None, "'}'")),
                Some(TokenKind::RBrace) => {
                    self.advance();
                    return Ok(());
                }
                Some(TokenKind::Dot) => {
                    self.advance();
                }
                Some(TokenKind::LBrace) => {
                    return Err(self.unsupported(self.current(), "a nested group pattern"));
                }
                Some(TokenKind::Word(_)) if self.keyword().as_deref() == Some("FILTER") => {
                    self.advance();
                    filters.push(self.filter()?);
                }
                _ => {
                    self.reject_unsupported_keyword()?;
                    self.triples(patterns)?;
                    if !matches!(
                        self.current_kind(),
                        Some(TokenKind::Dot | TokenKind::RBrace | TokenKind::Word(_))
                    ) {
                        return Err(self.unexpected(self.current(), "'.' or '}'"));
                    }
                }
            }
        }
    }

    fn triples(&mut self, patterns: &mut Vec<TriplePattern>) -> Result<(), PhyloError> {
        let subject = self.term("subject")?;

        loop {
            let predicate = if matches!(self.current_kind(), Some(TokenKind::Word(w)) if w == "a") {
                self.advance();
                Term::iri(RDF_TYPE)
            } else {
                self.term("predicate")?
            };

            loop {
                let object = self.term("object")?;
                patterns.push(TriplePattern::new(
                    subject.clone(),
                    predicate.clone(),
                    object,
                ));
                if matches!(self.current_kind(), Some(TokenKind::Comma)) {
                    self.advance();
                } else {
                    break;
                }
            }

            if !matches!(self.current_kind(), Some(TokenKind::Semicolon)) {
                return Ok(());
            }
            while matches!(self.current_kind(), Some(TokenKind::Semicolon)) {
                self.advance();
            }
            if matches!(
                self.current_kind(),
                Some(TokenKind::Dot | TokenKind::RBrace) | None
            ) {
                return Ok(());
            }
        }
    }

    fn filter(&mut self) -> Result<Filter, PhyloError> {
        if let Some(word) = self.keyword() {
            return Err(self.unsupported(self.current(), &format!("FILTER function {}", word)));
        }
        self.expect(&TokenKind::LParen)?;

        let left = self.term("filter operand")?;
        let token = self.advance();
        let op = match token.map(|t| &t.kind) {
            Some(TokenKind::Eq) => FilterOp::Eq,
            Some(TokenKind::NotEq) => FilterOp::NotEq,
            _ => return Err(self.unexpected(token, "'=' or '!='")),
        };
        let right = self.term("filter operand")?;
        self.expect(&TokenKind::RParen)?;

        if left.as_variable().is_none() && right.as_variable().is_none() {
            return Err(self.error(token, "a filter must compare at least one variable"));
        }
        Ok(Filter { left, op, right })
    }

    fn modifiers(&mut self) -> Result<(Option<usize>, Option<usize>), PhyloError> {
        let mut limit = None;
        let mut offset = None;

        while self.current().is_some() {
            self.reject_unsupported_keyword()?;
            match self.keyword().as_deref() {
                Some("LIMIT") if limit.is_none() => {
                    self.advance();
                    limit = Some(self.count()?);
                }
                Some("OFFSET") if offset.is_none() => {
                    self.advance();
                    offset = Some(self.count()?);
                }
                _ => return Err(self.unexpected(self.current(), "LIMIT, OFFSET or end of query")),
            }
        }

        Ok((limit, offset))
    }

    fn count(&mut self) -> Result<usize, PhyloError> {
        let token = self.advance();
        match token.map(|t| &t.kind) {
            Some(TokenKind::Number(n)) => n
                .parse::<usize>()
                .map_err(|_| self.error(token, format!("'{}' is not a non-negative integer", n))),
            _ => Err(self.unexpected(token, "integer")),
        }
    }

    // -------------------------------------------------------------------------
    // Terms
    // -------------------------------------------------------------------------

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

    fn term(&mut self, role: &str) -> Result<Term, PhyloError> {
        let token = self.current();
        let Some(kind) = token.map(|t| &t.kind) else {
            return Err(self.unexpected(None, role));
        };

        match kind {
            TokenKind::Variable(name) => {
                self.advance();
                Ok(Term::Variable(Variable::new(name.as_str())))
            }
            TokenKind::IriRef(reference) => {
                self.advance();
                self.absolute(token, reference).map(Term::Iri)
            }
            TokenKind::PrefixedName { prefix, local } => {
                self.advance();
                let namespace = self
                    .prefixes
                    .get(prefix)
                    .ok_or_else(|| self.error(token, format!("undeclared prefix '{}:'", prefix)))?;
                self.absolute(token, &format!("{}{}", namespace, local))
                    .map(Term::Iri)
            }
            TokenKind::Str(value) => {
                self.advance();
                self.literal_suffix(value).map(Term::Literal)
            }
            TokenKind::Number(number) => {
                self.advance();
                Ok(Term::Literal(number_literal(number)))
            }
            TokenKind::Word(word) => match boolean_literal(word) {
                Some(lit) => {
                    self.advance();
                    Ok(Term::Literal(lit))
                }
                None => {
                    self.reject_unsupported_keyword()?;
                    Err(self.unexpected(token, role))
                }
            },
            TokenKind::BlankNode(_) | TokenKind::LBracket => {
                Err(self.unsupported(token, "a blank node"))
            }
            TokenKind::LParen => Err(self.unsupported(token, "a collection or expression")),
            TokenKind::LBrace => Err(self.unsupported(token, "a nested group pattern")),
            _ => Err(self.unexpected(token, role)),
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
                match self.term("datatype")? {
                    Term::Iri(datatype) => Ok(Literal::typed(value, datatype)),
                    _ => Err(self.unexpected(token, "datatype IRI")),
                }
            }
            _ => Ok(Literal::plain(value)),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
