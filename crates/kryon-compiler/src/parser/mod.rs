//! Recursive-descent parser producing the AST (§4.B).
//!
//! Each submodule owns one grammar area and calls back into the shared
//! [`Parser`] cursor, the way the teacher splits `parser/document.rs`,
//! `parser/element.rs` and `parser/expressions.rs` out of a common driver.

mod directives;
mod element;
mod expressions;

use crate::ast::Document;
use crate::diagnostics::{Diagnostic, Diagnostics, SourceLocation, Severity, Span};
use crate::lexer::{Lexer, LexerConfig};
use crate::token::{Token, TokenKind};
use std::path::PathBuf;

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    pub(crate) diags: Diagnostics,
}

/// Parses a complete `.kry` source file into a [`Document`] plus whatever
/// diagnostics were accumulated along the way. Errors use panic-mode
/// recovery (§4.B): a malformed construct is skipped up to the next element
/// or body boundary rather than aborting the whole parse.
pub fn parse(source: &str, filename: Option<PathBuf>) -> (Document, Diagnostics) {
    let lexer = Lexer::new(source, filename, LexerConfig::default());
    let (tokens, lex_diags) = lexer.tokenize();
    let mut parser = Parser { tokens, pos: 0, diags: lex_diags };
    let doc = parser.parse_document();
    (doc, parser.diags)
}

impl Parser {
    pub(crate) fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos.min(self.tokens.len() - 1)].kind
    }

    pub(crate) fn peek_nth(&self, n: usize) -> &TokenKind {
        let idx = (self.pos + n).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    pub(crate) fn current_location(&self) -> SourceLocation {
        self.tokens[self.pos.min(self.tokens.len() - 1)].location.clone()
    }

    pub(crate) fn at_eof(&self) -> bool {
        matches!(self.peek(), TokenKind::Eof)
    }

    pub(crate) fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.tokens.len() - 1)].clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    pub(crate) fn error(&mut self, message: impl Into<String>) {
        self.diags.push(Diagnostic::new(Severity::Error, message).at(self.current_location()));
    }

    pub(crate) fn expect(&mut self, expected: &TokenKind) -> Option<Token> {
        if std::mem::discriminant(self.peek()) == std::mem::discriminant(expected) {
            Some(self.bump())
        } else {
            self.error(format!("expected {expected:?}, found {:?}", self.peek()));
            None
        }
    }

    /// Consumes a `;` if present; trailing semicolons are optional (§4.B).
    pub(crate) fn eat_semicolon(&mut self) {
        if matches!(self.peek(), TokenKind::Semicolon) {
            self.bump();
        }
    }

    /// Panic-mode recovery: skip tokens until a likely element or body
    /// boundary, so one malformed construct doesn't cascade into bogus
    /// errors for everything after it (§4.B).
    pub(crate) fn synchronize(&mut self) {
        while !self.at_eof() {
            match self.peek() {
                TokenKind::RightBrace | TokenKind::Semicolon => {
                    self.bump();
                    return;
                }
                TokenKind::ElementType(_) | TokenKind::At(_) => return,
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn parse_document(&mut self) -> Document {
        let start = self.current_location();
        let mut items = Vec::new();
        while !self.at_eof() {
            match directives::parse_item(self) {
                Some(item) => items.push(item),
                None => {
                    if !self.at_eof() {
                        self.synchronize();
                    }
                }
            }
        }
        Document { items, location: join(&start, &self.current_location()) }
    }
}

/// Builds a location spanning from `start` through (and including) `end`.
pub(crate) fn join(start: &SourceLocation, end: &SourceLocation) -> SourceLocation {
    let offset = start.span.offset;
    let end_offset = end.span.offset + end.span.length;
    SourceLocation { file: start.file.clone(), span: Span::new(offset, end_offset.saturating_sub(offset)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Item;

    #[test]
    fn empty_source_parses_to_an_empty_document() {
        let (doc, diags) = parse("", None);
        assert!(diags.is_empty());
        assert!(doc.items.is_empty());
    }

    #[test]
    fn single_element_document() {
        let (doc, diags) = parse(r#"Container { Text { text: "hi"; } }"#, None);
        assert!(diags.is_empty(), "{diags}");
        assert_eq!(doc.items.len(), 1);
        assert!(matches!(&doc.items[0], Item::Element(_)));
    }
}
