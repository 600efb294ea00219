//! UTF-8 aware tokenizer with position tracking and directive recognition (§4.A).

use crate::diagnostics::{source_file, Diagnostics, SourceFile, SourceLocation, Span};
use crate::token::{Directive, Token, TokenKind, Unit};
use smol_str::SmolStr;
use std::path::PathBuf;

/// Whether whitespace/comments are dropped or kept as trivia tokens (§4.A).
#[derive(Debug, Clone, Copy)]
pub struct LexerConfig {
    pub emit_comments: bool,
}

impl Default for LexerConfig {
    fn default() -> Self {
        Self { emit_comments: false }
    }
}

/// Tracks how many unclosed `{` there are inside the current `${ ... }`
/// interpolation, so the lexer knows when a `}` closes the expression and
/// drops back into string-literal mode rather than closing an element body.
#[derive(Default)]
struct TemplateState {
    stack: Vec<u32>,
}

pub struct Lexer<'a> {
    source: &'a str,
    bytes: &'a [u8],
    pos: usize,
    file: SourceFile,
    config: LexerConfig,
    template: TemplateState,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, filename: Option<PathBuf>, config: LexerConfig) -> Self {
        let file = source_file(filename.unwrap_or_else(|| PathBuf::from("<memory>")), source.to_string());
        Self { source, bytes: source.as_bytes(), pos: 0, file, config, template: TemplateState::default() }
    }

    fn loc(&self, start: usize) -> SourceLocation {
        SourceLocation { file: self.file.clone(), span: Span::new(start as u32, (self.pos - start) as u32) }
    }

    fn peek(&self) -> Option<char> {
        self.source[self.pos..].chars().next()
    }

    fn peek_at(&self, byte_offset_from_pos: usize) -> Option<char> {
        self.source.get(self.pos + byte_offset_from_pos..)?.chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn starts_with(&self, s: &str) -> bool {
        self.source[self.pos..].starts_with(s)
    }

    fn is_id_start(c: char) -> bool {
        c == '_' || (c.is_alphabetic())
    }

    fn is_id_continue(c: char) -> bool {
        Self::is_id_start(c) || c.is_ascii_digit()
    }

    /// Tokenizes the whole source. Malformed bytes produce `Error` tokens and
    /// lexing continues rather than aborting (§4.A "error recovery").
    pub fn tokenize(mut self) -> (Vec<Token>, Diagnostics) {
        let mut tokens = Vec::new();
        let mut diags = Diagnostics::new();
        loop {
            match self.next_token(&mut diags) {
                Some(tok) => {
                    let is_eof = matches!(tok.kind, TokenKind::Eof);
                    tokens.push(tok);
                    if is_eof {
                        break;
                    }
                }
                None => continue,
            }
        }
        (tokens, diags)
    }

    /// Returns `None` for trivia that was dropped (caller should loop again).
    fn next_token(&mut self, diags: &mut Diagnostics) -> Option<Token> {
        let start = self.pos;

        if self.pos >= self.bytes.len() {
            return Some(Token { kind: TokenKind::Eof, location: self.loc(start) });
        }

        let c = self.peek().unwrap();

        if c.is_whitespace() {
            while self.peek().is_some_and(|c| c.is_whitespace()) {
                self.bump();
            }
            return None;
        }

        if self.starts_with("#") {
            while self.peek().is_some_and(|c| c != '\n') {
                self.bump();
            }
            let text = SmolStr::new(&self.source[start..self.pos]);
            return self.config.emit_comments.then(|| Token {
                kind: TokenKind::LineComment(text),
                location: self.loc(start),
            });
        }

        if self.starts_with("/*") {
            self.pos += 2;
            let mut depth = 1u32;
            while depth > 0 {
                if self.pos >= self.bytes.len() {
                    diags.push(
                        crate::diagnostics::Diagnostic::new(
                            crate::diagnostics::Severity::Error,
                            "unterminated block comment",
                        )
                        .at(self.loc(start)),
                    );
                    break;
                }
                if self.starts_with("/*") {
                    depth += 1;
                    self.pos += 2;
                } else if self.starts_with("*/") {
                    depth -= 1;
                    self.pos += 2;
                } else {
                    self.bump();
                }
            }
            let text = SmolStr::new(&self.source[start..self.pos]);
            return self.config.emit_comments.then(|| Token {
                kind: TokenKind::BlockComment(text),
                location: self.loc(start),
            });
        }

        if c == '"' {
            return Some(self.lex_string(diags));
        }

        if c == '$' && self.peek_at(1).is_some_and(Self::is_id_start) {
            self.bump();
            let id_start = self.pos;
            while self.peek().is_some_and(Self::is_id_continue) {
                self.bump();
            }
            return Some(Token {
                kind: TokenKind::Variable(SmolStr::new(&self.source[id_start..self.pos])),
                location: self.loc(start),
            });
        }

        if c == '@' {
            self.bump();
            let id_start = self.pos;
            while self.peek().is_some_and(Self::is_id_continue) {
                self.bump();
            }
            let name = &self.source[id_start..self.pos];
            return Some(match Directive::from_name(name) {
                Some(d) => Token { kind: TokenKind::At(d), location: self.loc(start) },
                None => {
                    let msg = format!("unknown directive `@{name}`");
                    diags.push(crate::diagnostics::Diagnostic::new(crate::diagnostics::Severity::Error, msg).at(self.loc(start)));
                    Token { kind: TokenKind::Error(SmolStr::new(format!("@{name}"))), location: self.loc(start) }
                }
            });
        }

        if c.is_ascii_digit() {
            return Some(self.lex_number(diags));
        }

        if Self::is_id_start(c) {
            while self.peek().is_some_and(Self::is_id_continue) {
                self.bump();
            }
            let text = &self.source[start..self.pos];
            return Some(Token { kind: classify_word(text), location: self.loc(start) });
        }

        // Closing brace might resume a template string if we're inside one.
        if c == '}' {
            if let Some(depth) = self.template.stack.last_mut() {
                if *depth == 0 {
                    self.template.stack.pop();
                    self.bump();
                    return Some(self.resume_template_string(start, diags));
                } else {
                    *depth -= 1;
                }
            }
            self.bump();
            return Some(Token { kind: TokenKind::RightBrace, location: self.loc(start) });
        }
        if c == '{' {
            if let Some(depth) = self.template.stack.last_mut() {
                *depth += 1;
            }
            self.bump();
            return Some(Token { kind: TokenKind::LeftBrace, location: self.loc(start) });
        }

        let kind = match c {
            '(' => { self.bump(); TokenKind::LeftParen }
            ')' => { self.bump(); TokenKind::RightParen }
            '[' => { self.bump(); TokenKind::LeftBracket }
            ']' => { self.bump(); TokenKind::RightBracket }
            ':' => { self.bump(); TokenKind::Colon }
            ';' => { self.bump(); TokenKind::Semicolon }
            ',' => { self.bump(); TokenKind::Comma }
            '?' => { self.bump(); TokenKind::Question }
            '+' => { self.bump(); TokenKind::Plus }
            '-' => { self.bump(); TokenKind::Minus }
            '*' => { self.bump(); TokenKind::Star }
            '%' => { self.bump(); TokenKind::Percent }
            '.' => {
                self.bump();
                if self.peek() == Some('.') {
                    self.bump();
                    TokenKind::DotDot
                } else {
                    TokenKind::Dot
                }
            }
            '/' => { self.bump(); TokenKind::Slash }
            '=' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::EqEq
                } else {
                    TokenKind::Assign
                }
            }
            '!' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                }
            }
            '<' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::LtEq
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::GtEq
                } else {
                    TokenKind::Gt
                }
            }
            '&' if self.peek_at(1) == Some('&') => { self.pos += 2; TokenKind::AndAnd }
            '|' if self.peek_at(1) == Some('|') => { self.pos += 2; TokenKind::OrOr }
            _ => {
                self.bump();
                let text = self.source[start..self.pos].to_string();
                diags.push(
                    crate::diagnostics::Diagnostic::new(
                        crate::diagnostics::Severity::Error,
                        format!("unexpected byte sequence `{text}`"),
                    )
                    .at(self.loc(start)),
                );
                TokenKind::Error(SmolStr::new(text))
            }
        };
        Some(Token { kind, location: self.loc(start) })
    }

    fn lex_number(&mut self, diags: &mut Diagnostics) -> Token {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.bump();
            while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                self.bump();
            }
        }
        if matches!(self.peek(), Some('e') | Some('E')) {
            let save = self.pos;
            self.bump();
            if matches!(self.peek(), Some('+') | Some('-')) {
                self.bump();
            }
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                is_float = true;
                while self.peek().is_some_and(|c| c.is_ascii_digit()) {
                    self.bump();
                }
            } else {
                self.pos = save;
            }
        }
        let text = &self.source[start..self.pos];

        // unit suffix, e.g. `12px`
        let unit_start = self.pos;
        if self.peek().is_some_and(|c| c.is_ascii_alphabetic()) || self.peek() == Some('%') {
            while self.peek().is_some_and(|c| c.is_ascii_alphabetic()) {
                self.bump();
            }
            if self.peek() == Some('%') && self.pos == unit_start {
                self.bump();
            }
            let suffix = &self.source[unit_start..self.pos];
            if let Some(unit) = Unit::from_suffix(suffix) {
                let value: f64 = text.parse().unwrap_or(0.0);
                return Token { kind: TokenKind::DimensionNumber(value, unit), location: self.loc(start) };
            }
            // Not a recognized unit: back off, let the identifier lexer deal with it next token.
            self.pos = unit_start;
        }

        if is_float {
            let value: f64 = text.parse().unwrap_or(0.0);
            Token { kind: TokenKind::Float(value), location: self.loc(start) }
        } else {
            match text.parse::<i64>() {
                Ok(value) => Token { kind: TokenKind::Integer(value), location: self.loc(start) },
                Err(_) => {
                    diags.push(
                        crate::diagnostics::Diagnostic::new(
                            crate::diagnostics::Severity::Error,
                            format!("integer literal `{text}` does not fit in 64 bits"),
                        )
                        .at(self.loc(start)),
                    );
                    Token { kind: TokenKind::Error(SmolStr::new(text)), location: self.loc(start) }
                }
            }
        }
    }

    fn lex_string(&mut self, diags: &mut Diagnostics) -> Token {
        let start = self.pos;
        self.bump(); // opening quote
        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    diags.push(
                        crate::diagnostics::Diagnostic::new(crate::diagnostics::Severity::Error, "unterminated string literal")
                            .at(self.loc(start)),
                    );
                    return Token { kind: TokenKind::Error(SmolStr::new(value)), location: self.loc(start) };
                }
                Some('"') => {
                    self.bump();
                    return Token { kind: TokenKind::String(SmolStr::new(value)), location: self.loc(start) };
                }
                Some('\\') => {
                    self.bump();
                    match self.bump() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('"') => value.push('"'),
                        Some('\\') => value.push('\\'),
                        Some('u') => {
                            let hex_start = self.pos;
                            for _ in 0..4 {
                                self.bump();
                            }
                            let hex = &self.source[hex_start..self.pos];
                            match u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
                                Some(c) => value.push(c),
                                None => {
                                    diags.push(
                                        crate::diagnostics::Diagnostic::new(
                                            crate::diagnostics::Severity::Error,
                                            format!("invalid unicode escape `\\u{hex}`"),
                                        )
                                        .at(self.loc(start)),
                                    );
                                }
                            }
                        }
                        Some(other) => {
                            diags.push(
                                crate::diagnostics::Diagnostic::new(
                                    crate::diagnostics::Severity::Error,
                                    format!("invalid escape sequence `\\{other}`"),
                                )
                                .at(self.loc(start)),
                            );
                        }
                        None => {}
                    }
                }
                Some('$') if self.peek_at(1) == Some('{') => {
                    self.pos += 2;
                    self.template.stack.push(0);
                    return Token { kind: TokenKind::TemplateStringPart(SmolStr::new(value)), location: self.loc(start) };
                }
                Some(c) => {
                    self.bump();
                    value.push(c);
                }
            }
        }
    }

    /// Resumes lexing the string literal after a `${ ... }` interpolation's
    /// closing `}`, producing either another `TemplateStringPart` (if another
    /// `${` follows) or the final closing-quote segment as a plain `String`.
    fn resume_template_string(&mut self, start: usize, diags: &mut Diagnostics) -> Token {
        let mut value = String::new();
        loop {
            match self.peek() {
                None => {
                    diags.push(
                        crate::diagnostics::Diagnostic::new(crate::diagnostics::Severity::Error, "unterminated string literal")
                            .at(self.loc(start)),
                    );
                    return Token { kind: TokenKind::Error(SmolStr::new(value)), location: self.loc(start) };
                }
                Some('"') => {
                    self.bump();
                    return Token { kind: TokenKind::String(SmolStr::new(value)), location: self.loc(start) };
                }
                Some('$') if self.peek_at(1) == Some('{') => {
                    self.pos += 2;
                    self.template.stack.push(0);
                    return Token { kind: TokenKind::TemplateStringPart(SmolStr::new(value)), location: self.loc(start) };
                }
                Some('\\') => {
                    self.bump();
                    if let Some(c) = self.bump() {
                        value.push(match c {
                            'n' => '\n',
                            't' => '\t',
                            other => other,
                        });
                    }
                }
                Some(c) => {
                    self.bump();
                    value.push(c);
                }
            }
        }
    }

    pub fn source_file(&self) -> SourceFile {
        self.file.clone()
    }
}

fn classify_word(text: &str) -> TokenKind {
    match text {
        "true" => TokenKind::Bool(true),
        "false" => TokenKind::Bool(false),
        "null" => TokenKind::Null,
        "style" => TokenKind::KwStyle,
        "extends" => TokenKind::KwExtends,
        "in" => TokenKind::KwIn,
        _ => {
            let first = text.chars().next().unwrap();
            if first.is_ascii_uppercase() {
                TokenKind::ElementType(SmolStr::new(text))
            } else {
                TokenKind::Identifier(SmolStr::new(text))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let (tokens, diags) = Lexer::new(src, None, LexerConfig::default()).tokenize();
        assert!(diags.is_empty(), "unexpected diagnostics: {diags}");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn spec_scenario_one_button_with_text() {
        let got = kinds(r#"Button { text: "Hi"; }"#);
        assert_eq!(
            got,
            vec![
                TokenKind::ElementType("Button".into()),
                TokenKind::LeftBrace,
                TokenKind::Identifier("text".into()),
                TokenKind::Colon,
                TokenKind::String("Hi".into()),
                TokenKind::Semicolon,
                TokenKind::RightBrace,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn template_interpolation_splits_into_parts_and_expression_tokens() {
        let got = kinds(r#""hello ${name}""#);
        assert_eq!(
            got,
            vec![
                TokenKind::TemplateStringPart("hello ".into()),
                TokenKind::Identifier("name".into()),
                TokenKind::String("".into()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn variable_reference() {
        let got = kinds("$count");
        assert_eq!(got, vec![TokenKind::Variable("count".into()), TokenKind::Eof]);
    }

    #[test]
    fn range_operator_beats_two_dots() {
        let got = kinds("0..5");
        assert_eq!(
            got,
            vec![TokenKind::Integer(0), TokenKind::DotDot, TokenKind::Integer(5), TokenKind::Eof]
        );
    }

    #[test]
    fn dimension_number_gets_unit() {
        let got = kinds("12px 50%");
        assert_eq!(
            got,
            vec![
                TokenKind::DimensionNumber(12.0, Unit::Px),
                TokenKind::DimensionNumber(50.0, Unit::Percent),
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn unknown_directive_is_an_error_token_but_lexing_continues() {
        let (tokens, diags) = Lexer::new("@bogus Text {}", None, LexerConfig::default()).tokenize();
        assert!(!diags.is_empty());
        assert!(matches!(tokens[0].kind, TokenKind::Error(_)));
        assert!(matches!(tokens.last().unwrap().kind, TokenKind::Eof));
    }

    #[test]
    fn integer_overflow_is_lexical_error() {
        let (_tokens, diags) = Lexer::new("99999999999999999999999", None, LexerConfig::default()).tokenize();
        assert!(diags.has_blocking_errors());
    }

    #[test]
    fn non_ascii_identifier_start_accepted() {
        let got = kinds("café: 1");
        assert_eq!(got[0], TokenKind::Identifier("café".into()));
    }

    #[test]
    fn line_comment_dropped_by_default() {
        let got = kinds("# hi\nText {}");
        assert_eq!(got[0], TokenKind::ElementType("Text".into()));
    }
}
