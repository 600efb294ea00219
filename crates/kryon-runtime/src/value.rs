//! Runtime property values (§3 "Property (runtime)"): the decoded,
//! table-resolved counterpart of [`kryon_krb::ValueTag`]'s wire payloads —
//! strings are plain owned `String`s here, not string-table indices.

use kryon_krb::Rgba8888;

/// Unit suffix for a dimension value, mirroring the compiler's `token::Unit`
/// without depending on the compiler crate (the runtime only depends on
/// `kryon-krb`, per the workspace layout).
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
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => Self::Percent,
            2 => Self::Em,
            3 => Self::Rem,
            4 => Self::Vw,
            5 => Self::Vh,
            6 => Self::Pt,
            _ => Self::Px,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSegment {
    Literal(String),
    Variable(String),
    Expr(kryon_krb::ExprNode),
}

/// A property's decoded value (§3's `type` ∈ string/integer/float/boolean/
/// color/reference/expression/array/template; `function` values live in the
/// function table and are referenced by name via a plain string here).
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Dimension(f64, Unit),
    String(String),
    Color(Rgba8888),
    /// Element id referenced by another element's property.
    Reference(u32),
    Expr(kryon_krb::ExprNode),
    Array(Vec<RuntimeValue>),
    Template(Vec<TemplateSegment>),
}

impl RuntimeValue {
    /// Numeric coercion for expression evaluation (§4.G): non-numeric values
    /// coerce to `0.0` rather than erroring, matching the evaluator's
    /// "unresolved references evaluate to a default, not an error" rule.
    pub fn as_f64(&self) -> f64 {
        match self {
            RuntimeValue::Int(n) => *n as f64,
            RuntimeValue::Float(n) => *n,
            RuntimeValue::Dimension(n, _) => *n,
            RuntimeValue::Bool(b) => if *b { 1.0 } else { 0.0 },
            RuntimeValue::String(s) => s.parse().unwrap_or(0.0),
            _ => 0.0,
        }
    }

    pub fn as_bool(&self) -> bool {
        match self {
            RuntimeValue::Bool(b) => *b,
            RuntimeValue::Int(n) => *n != 0,
            RuntimeValue::Float(n) => *n != 0.0,
            RuntimeValue::String(s) => !s.is_empty(),
            RuntimeValue::Null => false,
            _ => true,
        }
    }

    pub fn as_display_string(&self) -> String {
        match self {
            RuntimeValue::Null => String::new(),
            RuntimeValue::Bool(b) => b.to_string(),
            RuntimeValue::Int(n) => n.to_string(),
            RuntimeValue::Float(n) => n.to_string(),
            RuntimeValue::Dimension(n, _) => n.to_string(),
            RuntimeValue::String(s) => s.clone(),
            RuntimeValue::Color(c) => format!("#{:02x}{:02x}{:02x}{:02x}", c.r, c.g, c.b, c.a),
            RuntimeValue::Reference(id) => id.to_string(),
            _ => String::new(),
        }
    }

    /// Array length, used by the directive engine to size a `@for` body
    /// without the caller having to match out the variant first.
    pub fn array_len(&self) -> Option<usize> {
        match self {
            RuntimeValue::Array(items) => Some(items.len()),
            _ => None,
        }
    }
}
