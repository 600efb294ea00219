//! The token alphabet produced by the lexer (§3, §4.A).

use crate::diagnostics::{SourceLocation, Spanned};
use smol_str::SmolStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Px,
    Percent,
    Em,
    Rem,
    Vw,
    Vh,
    Pt,
}

impl Unit {
    pub fn from_suffix(s: &str) -> Option<Self> {
        Some(match s {
            "px" => Self::Px,
            "%" => Self::Percent,
            "em" => Self::Em,
            "rem" => Self::Rem,
            "vw" => Self::Vw,
            "vh" => Self::Vh,
            "pt" => Self::Pt,
            _ => return None,
        })
    }
}

/// Fixed directive table (§4.A: "classified against a fixed table").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive {
    Style,
    Theme,
    Component,
    Const,
    ConstFor,
    For,
    If,
    Include,
    Variables,
    Function,
    Onload,
    Onmount,
    Onunmount,
    Metadata,
    Props,
    Slots,
    State,
    Watch,
    Store,
    Import,
    Export,
}

impl Directive {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "style" => Self::Style,
            "theme" => Self::Theme,
            "component" => Self::Component,
            "const" => Self::Const,
            "const_for" => Self::ConstFor,
            "for" => Self::For,
            "if" => Self::If,
            "include" => Self::Include,
            "variables" => Self::Variables,
            "function" => Self::Function,
            "onload" => Self::Onload,
            "onmount" => Self::Onmount,
            "onunmount" => Self::Onunmount,
            "metadata" => Self::Metadata,
            "props" => Self::Props,
            "slots" => Self::Slots,
            "state" => Self::State,
            "watch" => Self::Watch,
            "store" => Self::Store,
            "import" => Self::Import,
            "export" => Self::Export,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    String(SmolStr),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
    /// A number immediately followed by a unit suffix, e.g. `12px` (§4.B).
    DimensionNumber(f64, Unit),

    Identifier(SmolStr),
    /// `$name`
    Variable(SmolStr),
    /// Identifier beginning with an uppercase ASCII letter (§4.A).
    ElementType(SmolStr),
    /// `@directive`
    At(Directive),

    /// The literal text segment of a template string up to and including the
    /// `${` that opens an interpolation (§4.A). The expression tokens that
    /// follow are ordinary tokens; the lexer itself swallows the matching
    /// `}` and resumes string-literal mode, producing either another
    /// `TemplateStringPart` or the final `String` segment.
    TemplateStringPart(SmolStr),

    // Reserved words with their own token type (not plain identifiers)
    KwStyle,
    KwExtends,
    KwIn,

    // Punctuation / operators
    LeftBrace,
    RightBrace,
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    Colon,
    Semicolon,
    Comma,
    Dot,
    DotDot,
    Question,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    NotEq,
    Lt,
    Gt,
    LtEq,
    GtEq,
    AndAnd,
    OrOr,
    Bang,

    LineComment(SmolStr),
    BlockComment(SmolStr),

    Eof,
    Error(SmolStr),
}

#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub location: SourceLocation,
}

impl Spanned for Token {
    fn span(&self) -> SourceLocation {
        self.location.clone()
    }
}
