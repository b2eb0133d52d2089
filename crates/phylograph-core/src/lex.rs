//! # Lexer
//!
//! Tokenizer shared by the turtle codec and the query parser.
//!
//! Both grammars use the same terminals (IRI references, prefixed names,
//! quoted strings, language tags, numbers, punctuation); each parser decides
//! which tokens are legal where. Every token carries its 1-based line and
//! column so parse errors can point at the offending input.

use std::fmt;

/// A lexical token kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TokenKind {
    /// `<...>`, contents unescaped.
    IriRef(String),
    /// `prefix:local`; either part may be empty.
    PrefixedName { prefix: String, local: String },
    /// A quoted string in any of the four quote styles, unescaped.
    Str(String),
    /// `@word`: a directive (`@prefix`) or a language tag (`@en-GB`).
    At(String),
    /// `^^`
    DoubleCaret,
    /// `?name` or `$name`
    Variable(String),
    /// A bare word: keyword, `a`, `true`, `false`.
    Word(String),
    /// An integer or decimal, sign included.
    Number(String),
    /// `_:label`
    BlankNode(String),
    Dot,
    Semicolon,
    Comma,
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Star,
    Eq,
    NotEq,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IriRef(iri) => write!(f, "<{}>", iri),
            Self::PrefixedName { prefix, local } => write!(f, "{}:{}", prefix, local),
            Self::Str(s) => write!(f, "{:?}", s),
            Self::At(w) => write!(f, "@{}", w),
            Self::DoubleCaret => f.write_str("^^"),
            Self::Variable(v) => write!(f, "?{}", v),
            Self::Word(w) | Self::Number(w) => f.write_str(w),
            Self::BlankNode(b) => write!(f, "_:{}", b),
            Self::Dot => f.write_str("'.'"),
            Self::Semicolon => f.write_str("';'"),
            Self::Comma => f.write_str("','"),
            Self::LBrace => f.write_str("'{'"),
            Self::RBrace => f.write_str("'}'"),
            Self::LParen => f.write_str("'('"),
            Self::RParen => f.write_str("')'"),
            Self::LBracket => f.write_str("'['"),
            Self::RBracket => f.write_str("']'"),
            Self::Star => f.write_str("'*'"),
            Self::Eq => f.write_str("'='"),
            Self::NotEq => f.write_str("'!='"),
        }
    }
}

/// A token with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

/// A tokenization failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LexError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

/// Split input into tokens. Whitespace and `#` comments are skipped.
pub(crate) fn tokenize(input: &str) -> Result<Vec<Token>, LexError> {
    Lexer::new(input).run()
}

fn is_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | '\u{00B7}')
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, line: usize, column: usize, message: impl Into<String>) -> LexError {
        LexError {
            line,
            column,
            message: message.into(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();

        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
                continue;
            }
            if c == '#' {
                while self.peek().is_some_and(|c| c != '\n') {
                    self.bump();
                }
                continue;
            }

            let (line, column) = (self.line, self.column);
            let kind = self.next_kind(c)?;
            tokens.push(Token { kind, line, column });
        }

        Ok(tokens)
    }

    fn next_kind(&mut self, c: char) -> Result<TokenKind, LexError> {
        let (line, column) = (self.line, self.column);

        let single = match c {
            '.' if !self.peek_at(1).is_some_and(|d| d.is_ascii_digit()) => Some(TokenKind::Dot),
            ';' => Some(TokenKind::Semicolon),
            ',' => Some(TokenKind::Comma),
            '{' => Some(TokenKind::LBrace),
            '}' => Some(TokenKind::RBrace),
            '(' => Some(TokenKind::LParen),
            ')' => Some(TokenKind::RParen),
            '[' => Some(TokenKind::LBracket),
            ']' => Some(TokenKind::RBracket),
            '*' => Some(TokenKind::Star),
            '=' => Some(TokenKind::Eq),
            _ => None,
        };
        if let Some(kind) = single {
            self.bump();
            return Ok(kind);
        }

        match c {
            '<' => self.iri_ref(),
            '"' | '\'' => self.string(c),
            '@' => {
                self.bump();
                let word = self.take_while(|c| c.is_ascii_alphanumeric() || c == '-');
                if word.is_empty() {
                    return Err(self.error(line, column, "expected a word after '@'"));
                }
                Ok(TokenKind::At(word))
            }
            '^' => {
                self.bump();
                if self.bump() != Some('^') {
                    return Err(self.error(line, column, "expected '^^'"));
                }
                Ok(TokenKind::DoubleCaret)
            }
            '!' => {
                self.bump();
                if self.bump() != Some('=') {
                    return Err(self.error(line, column, "expected '!='"));
                }
                Ok(TokenKind::NotEq)
            }
            '?' | '$' => {
                self.bump();
                let name = self.take_while(|c| c.is_alphanumeric() || c == '_');
                if name.is_empty() {
                    return Err(self.error(line, column, "empty variable name"));
                }
                Ok(TokenKind::Variable(name))
            }
            '_' if self.peek_at(1) == Some(':') => {
                self.bump();
                self.bump();
                Ok(TokenKind::BlankNode(self.name()))
            }
            '+' | '-' | '.' | '0'..='9' => self.number(),
            c if c.is_alphabetic() || c == '_' || c == ':' => Ok(self.word_or_name()),
            other => Err(self.error(
                line,
                column,
                format!("unexpected character {:?}", other),
            )),
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek().filter(|&c| pred(c)) {
            out.push(c);
            self.bump();
        }
        out
    }

    /// Name characters; a trailing `.` is left for the statement terminator.
    fn name(&mut self) -> String {
        let mut end = self.pos;
        while self.chars.get(end).is_some_and(|&c| is_name_char(c)) {
            end += 1;
        }
        while end > self.pos && self.chars[end - 1] == '.' {
            end -= 1;
        }

        let mut out = String::new();
        while self.pos < end {
            if let Some(c) = self.bump() {
                out.push(c);
            }
        }
        out
    }

    fn word_or_name(&mut self) -> TokenKind {
        let head = if self.peek() == Some(':') {
            String::new()
        } else {
            self.name()
        };

        if self.peek() == Some(':') {
            self.bump();
            let local = self.name();
            TokenKind::PrefixedName {
                prefix: head,
                local,
            }
        } else {
            TokenKind::Word(head)
        }
    }

    fn number(&mut self) -> Result<TokenKind, LexError> {
        let (line, column) = (self.line, self.column);
        let mut out = String::new();

        if let Some(sign) = self.peek().filter(|&c| c == '+' || c == '-') {
            out.push(sign);
            self.bump();
        }
        out.push_str(&self.take_while(|c| c.is_ascii_digit()));
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            out.push('.');
            out.push_str(&self.take_while(|c| c.is_ascii_digit()));
        }

        if !out.chars().any(|c| c.is_ascii_digit()) {
            return Err(self.error(line, column, format!("malformed number '{}'", out)));
        }
        Ok(TokenKind::Number(out))
    }

    fn iri_ref(&mut self) -> Result<TokenKind, LexError> {
        let (line, column) = (self.line, self.column);
        self.bump();

        let mut out = String::new();
        loop {
            match self.bump() {
                Some('>') => return Ok(TokenKind::IriRef(out)),
                Some('\\') => out.push(self.unicode_escape(line, column)?),
                Some(c) if c.is_whitespace() => {
                    return Err(self.error(line, column, "whitespace inside IRI reference"));
                }
                Some(c) => out.push(c),
                None => return Err(self.error(line, column, "unterminated IRI reference")),
            }
        }
    }

    fn unicode_escape(&mut self, line: usize, column: usize) -> Result<char, LexError> {
        let width = match self.bump() {
            Some('u') => 4,
            Some('U') => 8,
            _ => return Err(self.error(line, column, "invalid escape sequence")),
        };

        let mut code = 0u32;
        for _ in 0..width {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| self.error(line, column, "invalid unicode escape"))?;
            code = code * 16 + digit;
        }
        char::from_u32(code)
            .ok_or_else(|| self.error(line, column, format!("invalid code point U+{:X}", code)))
    }

    fn string(&mut self, quote: char) -> Result<TokenKind, LexError> {
        let (line, column) = (self.line, self.column);
        let long = self.peek_at(1) == Some(quote) && self.peek_at(2) == Some(quote);
        let open = if long { 3 } else { 1 };
        for _ in 0..open {
            self.bump();
        }

        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(self.error(line, column, "unterminated string"));
            };

            match c {
                '\\' => out.push(self.string_escape(line, column)?),
                c if c == quote && !long => return Ok(TokenKind::Str(out)),
                c if c == quote && self.peek() == Some(quote) && self.peek_at(1) == Some(quote) => {
                    // A closing triple quote may be preceded by one or two
                    // quotes belonging to the value.
                    if self.peek_at(2) == Some(quote) {
                        out.push(c);
                        continue;
                    }
                    self.bump();
                    self.bump();
                    return Ok(TokenKind::Str(out));
                }
                '\n' | '\r' if !long => {
                    return Err(self.error(line, column, "line break in short string"));
                }
                c => out.push(c),
            }
        }
    }

    fn string_escape(&mut self, line: usize, column: usize) -> Result<char, LexError> {
        let escaped = match self.peek() {
            Some('t') => '\t',
            Some('n') => '\n',
            Some('r') => '\r',
            Some('b') => '\u{0008}',
            Some('f') => '\u{000C}',
            Some('"') => '"',
            Some('\'') => '\'',
            Some('\\') => '\\',
            Some('u' | 'U') => return self.unicode_escape(line, column),
            _ => return Err(self.error(line, column, "invalid escape sequence")),
        };
        self.bump();
        Ok(escaped)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        tokenize(input)
            .expect("tokenize")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn statement_terminator_is_not_part_of_name() {
        assert_eq!(
            kinds("ex:a ex:b ex:c."),
            vec![
                TokenKind::PrefixedName {
                    prefix: "ex".into(),
                    local: "a".into()
                },
                TokenKind::PrefixedName {
                    prefix: "ex".into(),
                    local: "b".into()
                },
                TokenKind::PrefixedName {
                    prefix: "ex".into(),
                    local: "c".into()
                },
                TokenKind::Dot,
            ]
        );
    }

    #[test]
    fn prefix_declaration_tokens() {
        assert_eq!(
            kinds("@prefix ex: <http://example.org/> ."),
            vec![
                TokenKind::At("prefix".into()),
                TokenKind::PrefixedName {
                    prefix: "ex".into(),
                    local: String::new()
                },
                TokenKind::IriRef("http://example.org/".into()),
                TokenKind::Dot,
            ]
        );
    }

    #[test]
    fn strings_and_escapes() {
        assert_eq!(
            kinds(r#""a\"b\n" 'c' """x "y" z""""#),
            vec![
                TokenKind::Str("a\"b\n".into()),
                TokenKind::Str("c".into()),
                TokenKind::Str("x \"y\" z\"".into()),
            ]
        );
        assert_eq!(kinds(r#""é""#), vec![TokenKind::Str("é".into())]);
    }

    #[test]
    fn literal_suffixes() {
        assert_eq!(
            kinds(r#""x"@en-GB "5"^^xsd:integer"#),
            vec![
                TokenKind::Str("x".into()),
                TokenKind::At("en-GB".into()),
                TokenKind::Str("5".into()),
                TokenKind::DoubleCaret,
                TokenKind::PrefixedName {
                    prefix: "xsd".into(),
                    local: "integer".into()
                },
            ]
        );
    }

    #[test]
    fn numbers_and_terminators() {
        assert_eq!(
            kinds("42 -1.5 7."),
            vec![
                TokenKind::Number("42".into()),
                TokenKind::Number("-1.5".into()),
                TokenKind::Number("7".into()),
                TokenKind::Dot,
            ]
        );
    }

    #[test]
    fn query_punctuation() {
        assert_eq!(
            kinds("SELECT * { ?g != $h }"),
            vec![
                TokenKind::Word("SELECT".into()),
                TokenKind::Star,
                TokenKind::LBrace,
                TokenKind::Variable("g".into()),
                TokenKind::NotEq,
                TokenKind::Variable("h".into()),
                TokenKind::RBrace,
            ]
        );
    }

    #[test]
    fn comments_are_skipped_and_positions_tracked() {
        let tokens = tokenize("# header\n  ex:a").expect("tokenize");
        assert_eq!(tokens.len(), 1);
        assert_eq!((tokens[0].line, tokens[0].column), (2, 3));
    }

    #[test]
    fn blank_node_label() {
        assert_eq!(kinds("_:b0"), vec![TokenKind::BlankNode("b0".into())]);
    }

    #[test]
    fn errors_carry_position() {
        let err = tokenize("ex:a\n  \"open").expect_err("unterminated");
        assert_eq!((err.line, err.column), (2, 3));

        let err = tokenize("<http://x/a b>").expect_err("whitespace");
        assert_eq!(err.line, 1);
    }
}
