//! KIR (§4.D): bidirectional JSON codec for the AST. Defines its own
//! serde-friendly node tree rather than deriving `Serialize`/`Deserialize`
//! directly on the parser's AST, so the AST stays free to carry
//! non-serializable bookkeeping (`Rc<SourceFileInner>`) without leaking that
//! choice into the wire format.

use crate::ast::{
    Child, ComponentDef, ComponentParam, ConstDef, Document, Element, ExportDef, ForLoop, FunctionDef, IfBlock,
    ImportDef, IncludeDef, Item, LifecycleHook, LifecycleKind, MetadataDef, Property, PropertyValue, StateVar,
    StyleDef, TemplateSegment, ThemeDef, VariablesBlock,
};
use crate::diagnostics::{anonymous_source_file, SourceLocation, Span};
use crate::error::KirError;
use crate::expr::{BinOp, Expr, ExprKind, Literal, UnOp};
use crate::options::KirStyle;
use crate::token::Unit;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

pub const KIR_MAJOR: u32 = 1;
pub const KIR_VERSION: &str = "1.0.0";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KirDocument {
    pub kir_version: String,
    pub format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_file: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compiler: Option<String>,
    pub root: Vec<KirItem>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct KirLocation {
    pub line: u32,
    pub column: u32,
    pub offset: u32,
    pub length: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind")]
pub enum KirItem {
    Element(KirElement),
    Style { name: String, extends: Option<String>, properties: Vec<KirProperty> },
    Theme { name: String, properties: Vec<KirProperty> },
    Component {
        name: String,
        extends: Option<String>,
        props: Vec<KirParam>,
        slots: Vec<String>,
        state: Vec<KirStateVar>,
        functions: Vec<KirFunction>,
        lifecycle: Vec<KirLifecycle>,
        template: KirElement,
    },
    Const { name: String, value: KirValue },
    Variables { entries: Vec<(String, KirValue)> },
    Function(KirFunction),
    Include { path: String },
    Metadata { entries: Vec<(String, KirValue)> },
    Lifecycle(KirLifecycle),
    Import { names: Vec<String>, path: String },
    Export { names: Vec<String> },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KirParam {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<KirValue>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KirStateVar {
    pub name: String,
    pub initial: KirValue,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KirFunction {
    pub name: String,
    pub params: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub body: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KirLifecycle {
    pub phase: String,
    pub body: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KirElement {
    pub type_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<KirLocation>,
    pub properties: Vec<KirProperty>,
    pub children: Vec<KirChild>,
    /// Sibling field documenting what expansion did to produce this element
    /// (§4.D `verbose` style). Only ever populated when writing `Verbose`;
    /// `Compact`/`Readable` always omit it, even if the AST carries a note.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub expansion_note: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct KirProperty {
    pub name: String,
    pub value: KirValue,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind")]
pub enum KirChild {
    Element(KirElement),
    For { var_name: String, iterable: KirExpr, body: Vec<KirChild>, is_const: bool },
    If { condition: KirExpr, then_body: Vec<KirChild>, else_body: Option<Vec<KirChild>> },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind")]
pub enum KirValue {
    Null,
    Bool { value: bool },
    Number { value: f64 },
    Dimension { value: f64, unit: String },
    String { value: String },
    Variable { name: String },
    Template { segments: Vec<KirSegment> },
    Array { items: Vec<KirValue> },
    Expr { expr: KirExpr },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind")]
pub enum KirSegment {
    Literal { text: String },
    Variable { name: String },
    Expr { expr: KirExpr },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind")]
pub enum KirExpr {
    Null,
    Bool { value: bool },
    Number { value: f64 },
    String { value: String },
    Variable { name: String },
    Unary { op: String, operand: Box<KirExpr> },
    Binary { op: String, lhs: Box<KirExpr>, rhs: Box<KirExpr> },
    Ternary { cond: Box<KirExpr>, then_branch: Box<KirExpr>, else_branch: Box<KirExpr> },
}

/// Serializes a post-expansion (or any) AST to a JSON string in the
/// requested style.
pub fn write(doc: &Document, style: KirStyle, source_file: Option<String>) -> Result<String, KirError> {
    let verbose = style == KirStyle::Verbose;
    let kir = KirDocument {
        kir_version: KIR_VERSION.to_string(),
        format: "kir-json".to_string(),
        source_file,
        timestamp: None,
        compiler: Some("kryon-compiler".to_string()),
        root: doc.items.iter().map(|item| item_to_kir(item, verbose)).collect(),
    };
    Ok(match style {
        KirStyle::Compact => serde_json::to_string(&kir)?,
        KirStyle::Readable | KirStyle::Verbose => serde_json::to_string_pretty(&kir)?,
    })
}

/// Parses a KIR JSON document, rejecting a major version newer than this
/// reader's (§4.D); a differing minor/patch is accepted.
pub fn read(json: &str) -> Result<Document, KirError> {
    let kir: KirDocument = serde_json::from_str(json)?;
    let found_major = kir.kir_version.split('.').next().and_then(|s| s.parse().ok()).unwrap_or(0);
    if found_major > KIR_MAJOR {
        return Err(KirError::UnsupportedVersion { found: found_major, expected: KIR_MAJOR });
    }
    let items = kir.root.iter().map(item_from_kir).collect();
    Ok(Document { items, location: synth_location() })
}

fn synth_location() -> SourceLocation {
    SourceLocation { file: anonymous_source_file(""), span: Span::default() }
}

fn loc_to_kir(loc: &SourceLocation) -> KirLocation {
    let (line, column) = loc.line_column();
    KirLocation { line, column, offset: loc.span.offset, length: loc.span.length }
}

fn loc_from_kir(_loc: &Option<KirLocation>) -> SourceLocation {
    // Locations round-trip as descriptive (line/column/offset/length) data,
    // not as a reference back into the exact original source bytes (§4.D:
    // "structurally equal up to location synthesis settings").
    synth_location()
}

fn item_to_kir(item: &Item, verbose: bool) -> KirItem {
    match item {
        Item::Element(e) => KirItem::Element(element_to_kir(e, verbose)),
        Item::Style(s) => KirItem::Style {
            name: s.name.to_string(),
            extends: s.extends.as_ref().map(|e| e.to_string()),
            properties: s.properties.iter().map(property_to_kir).collect(),
        },
        Item::Theme(t) => {
            KirItem::Theme { name: t.name.to_string(), properties: t.properties.iter().map(property_to_kir).collect() }
        }
        Item::Component(c) => KirItem::Component {
            name: c.name.to_string(),
            extends: c.extends.as_ref().map(|e| e.to_string()),
            props: c.props.iter().map(param_to_kir).collect(),
            slots: c.slots.iter().map(|s| s.to_string()).collect(),
            state: c.state.iter().map(state_to_kir).collect(),
            functions: c.functions.iter().map(function_to_kir).collect(),
            lifecycle: c.lifecycle.iter().map(lifecycle_to_kir).collect(),
            template: element_to_kir(&c.template, verbose),
        },
        Item::Const(c) => KirItem::Const { name: c.name.to_string(), value: value_to_kir(&c.value) },
        Item::Variables(v) => KirItem::Variables {
            entries: v.entries.iter().map(|e| (e.name.to_string(), value_to_kir(&e.value))).collect(),
        },
        Item::Function(f) => KirItem::Function(function_to_kir(f)),
        Item::Include(i) => KirItem::Include { path: i.path.to_string() },
        Item::Metadata(m) => {
            KirItem::Metadata { entries: m.entries.iter().map(|(k, v)| (k.to_string(), value_to_kir(v))).collect() }
        }
        Item::Lifecycle(l) => KirItem::Lifecycle(lifecycle_to_kir(l)),
        Item::Import(i) => {
            KirItem::Import { names: i.names.iter().map(|n| n.to_string()).collect(), path: i.path.to_string() }
        }
        Item::Export(e) => KirItem::Export { names: e.names.iter().map(|n| n.to_string()).collect() },
    }
}

fn item_from_kir(item: &KirItem) -> Item {
    let loc = synth_location();
    match item {
        KirItem::Element(e) => Item::Element(element_from_kir(e)),
        KirItem::Style { name, extends, properties } => Item::Style(StyleDef {
            name: SmolStr::new(name),
            extends: extends.as_ref().map(SmolStr::new),
            properties: properties.iter().map(property_from_kir).collect(),
            location: loc,
        }),
        KirItem::Theme { name, properties } => Item::Theme(ThemeDef {
            name: SmolStr::new(name),
            properties: properties.iter().map(property_from_kir).collect(),
            location: loc,
        }),
        KirItem::Component { name, extends, props, slots, state, functions, lifecycle, template } => {
            Item::Component(ComponentDef {
                name: SmolStr::new(name),
                extends: extends.as_ref().map(SmolStr::new),
                props: props.iter().map(param_from_kir).collect(),
                slots: slots.iter().map(SmolStr::new).collect(),
                state: state.iter().map(state_from_kir).collect(),
                functions: functions.iter().map(function_from_kir).collect(),
                lifecycle: lifecycle.iter().map(lifecycle_from_kir).collect(),
                template: element_from_kir(template),
                location: loc,
            })
        }
        KirItem::Const { name, value } => {
            Item::Const(ConstDef { name: SmolStr::new(name), value: value_from_kir(value), location: loc })
        }
        KirItem::Variables { entries } => Item::Variables(VariablesBlock {
            entries: entries
                .iter()
                .map(|(name, value)| ConstDef { name: SmolStr::new(name), value: value_from_kir(value), location: loc.clone() })
                .collect(),
            location: loc,
        }),
        KirItem::Function(f) => Item::Function(function_from_kir(f)),
        KirItem::Include { path } => Item::Include(IncludeDef { path: SmolStr::new(path), location: loc }),
        KirItem::Metadata { entries } => Item::Metadata(MetadataDef {
            entries: entries.iter().map(|(k, v)| (SmolStr::new(k), value_from_kir(v))).collect(),
            location: loc,
        }),
        KirItem::Lifecycle(l) => Item::Lifecycle(lifecycle_from_kir(l)),
        KirItem::Import { names, path } => Item::Import(ImportDef {
            names: names.iter().map(SmolStr::new).collect(),
            path: SmolStr::new(path),
            location: loc,
        }),
        KirItem::Export { names } => {
            Item::Export(ExportDef { names: names.iter().map(SmolStr::new).collect(), location: loc })
        }
    }
}

fn param_to_kir(p: &ComponentParam) -> KirParam {
    KirParam { name: p.name.to_string(), default: p.default.as_ref().map(value_to_kir) }
}

fn param_from_kir(p: &KirParam) -> ComponentParam {
    ComponentParam { name: SmolStr::new(&p.name), default: p.default.as_ref().map(value_from_kir) }
}

fn state_to_kir(s: &StateVar) -> KirStateVar {
    KirStateVar { name: s.name.to_string(), initial: value_to_kir(&s.initial) }
}

fn state_from_kir(s: &KirStateVar) -> StateVar {
    StateVar { name: SmolStr::new(&s.name), initial: value_from_kir(&s.initial) }
}

fn function_to_kir(f: &FunctionDef) -> KirFunction {
    KirFunction {
        name: f.name.to_string(),
        params: f.params.iter().map(|p| p.to_string()).collect(),
        language: f.language.as_ref().map(|l| l.to_string()),
        body: f.body.to_string(),
    }
}

fn function_from_kir(f: &KirFunction) -> FunctionDef {
    FunctionDef {
        name: SmolStr::new(&f.name),
        params: f.params.iter().map(SmolStr::new).collect(),
        language: f.language.as_ref().map(SmolStr::new),
        body: SmolStr::new(&f.body),
        location: synth_location(),
    }
}

fn lifecycle_phase_name(k: LifecycleKind) -> &'static str {
    match k {
        LifecycleKind::Onload => "onload",
        LifecycleKind::Onmount => "onmount",
        LifecycleKind::Onunmount => "onunmount",
    }
}

fn lifecycle_to_kir(l: &LifecycleHook) -> KirLifecycle {
    KirLifecycle { phase: lifecycle_phase_name(l.kind).to_string(), body: l.body.to_string() }
}

fn lifecycle_from_kir(l: &KirLifecycle) -> LifecycleHook {
    let kind = match l.phase.as_str() {
        "onmount" => LifecycleKind::Onmount,
        "onunmount" => LifecycleKind::Onunmount,
        _ => LifecycleKind::Onload,
    };
    LifecycleHook { kind, body: SmolStr::new(&l.body), location: synth_location() }
}

fn element_to_kir(e: &Element, verbose: bool) -> KirElement {
    KirElement {
        type_name: e.type_name.to_string(),
        location: Some(loc_to_kir(&e.location)),
        properties: e.properties.iter().map(property_to_kir).collect(),
        children: e.children.iter().map(|c| child_to_kir(c, verbose)).collect(),
        expansion_note: if verbose { e.expansion_note.as_ref().map(|s| s.to_string()) } else { None },
    }
}

fn element_from_kir(e: &KirElement) -> Element {
    Element {
        type_name: SmolStr::new(&e.type_name),
        properties: e.properties.iter().map(property_from_kir).collect(),
        children: e.children.iter().map(child_from_kir).collect(),
        location: loc_from_kir(&e.location),
        expansion_note: e.expansion_note.as_ref().map(SmolStr::new),
    }
}

fn property_to_kir(p: &Property) -> KirProperty {
    KirProperty { name: p.name.to_string(), value: value_to_kir(&p.value) }
}

fn property_from_kir(p: &KirProperty) -> Property {
    Property { name: SmolStr::new(&p.name), value: value_from_kir(&p.value), location: synth_location() }
}

fn child_to_kir(c: &Child, verbose: bool) -> KirChild {
    match c {
        Child::Element(e) => KirChild::Element(element_to_kir(e, verbose)),
        Child::For(f) => KirChild::For {
            var_name: f.var_name.to_string(),
            iterable: expr_to_kir(&f.iterable),
            body: f.body.iter().map(|c| child_to_kir(c, verbose)).collect(),
            is_const: f.is_const,
        },
        Child::If(i) => KirChild::If {
            condition: expr_to_kir(&i.condition),
            then_body: i.then_body.iter().map(|c| child_to_kir(c, verbose)).collect(),
            else_body: i.else_body.as_ref().map(|b| b.iter().map(|c| child_to_kir(c, verbose)).collect()),
        },
    }
}

fn child_from_kir(c: &KirChild) -> Child {
    let loc = synth_location();
    match c {
        KirChild::Element(e) => Child::Element(element_from_kir(e)),
        KirChild::For { var_name, iterable, body, is_const } => Child::For(ForLoop {
            var_name: SmolStr::new(var_name),
            iterable: expr_from_kir(iterable),
            body: body.iter().map(child_from_kir).collect(),
            is_const: *is_const,
            location: loc,
        }),
        KirChild::If { condition, then_body, else_body } => Child::If(IfBlock {
            condition: expr_from_kir(condition),
            then_body: then_body.iter().map(child_from_kir).collect(),
            else_body: else_body.as_ref().map(|b| b.iter().map(child_from_kir).collect()),
            location: loc,
        }),
    }
}

fn value_to_kir(v: &PropertyValue) -> KirValue {
    match v {
        PropertyValue::Null => KirValue::Null,
        PropertyValue::Bool(b) => KirValue::Bool { value: *b },
        PropertyValue::Number(n) => KirValue::Number { value: *n },
        PropertyValue::Dimension(n, unit) => KirValue::Dimension { value: *n, unit: unit_name(*unit).to_string() },
        PropertyValue::String(s) => KirValue::String { value: s.to_string() },
        PropertyValue::Variable(name) => KirValue::Variable { name: name.to_string() },
        PropertyValue::Template(segments) => KirValue::Template { segments: segments.iter().map(segment_to_kir).collect() },
        PropertyValue::Array(items) => KirValue::Array { items: items.iter().map(value_to_kir).collect() },
        PropertyValue::Expr(e) => KirValue::Expr { expr: expr_to_kir(e) },
    }
}

fn value_from_kir(v: &KirValue) -> PropertyValue {
    match v {
        KirValue::Null => PropertyValue::Null,
        KirValue::Bool { value } => PropertyValue::Bool(*value),
        KirValue::Number { value } => PropertyValue::Number(*value),
        KirValue::Dimension { value, unit } => PropertyValue::Dimension(*value, unit_from_name(unit)),
        KirValue::String { value } => PropertyValue::String(SmolStr::new(value)),
        KirValue::Variable { name } => PropertyValue::Variable(SmolStr::new(name)),
        KirValue::Template { segments } => PropertyValue::Template(segments.iter().map(segment_from_kir).collect()),
        KirValue::Array { items } => PropertyValue::Array(items.iter().map(value_from_kir).collect()),
        KirValue::Expr { expr } => PropertyValue::Expr(expr_from_kir(expr)),
    }
}

fn segment_to_kir(s: &TemplateSegment) -> KirSegment {
    match s {
        TemplateSegment::Literal(text) => KirSegment::Literal { text: text.to_string() },
        TemplateSegment::Variable(name) => KirSegment::Variable { name: name.to_string() },
        TemplateSegment::Expr(e) => KirSegment::Expr { expr: expr_to_kir(e) },
    }
}

fn segment_from_kir(s: &KirSegment) -> TemplateSegment {
    match s {
        KirSegment::Literal { text } => TemplateSegment::Literal(SmolStr::new(text)),
        KirSegment::Variable { name } => TemplateSegment::Variable(SmolStr::new(name)),
        KirSegment::Expr { expr } => TemplateSegment::Expr(expr_from_kir(expr)),
    }
}

fn expr_to_kir(e: &Expr) -> KirExpr {
    match &e.kind {
        ExprKind::Literal(Literal::Null) => KirExpr::Null,
        ExprKind::Literal(Literal::Bool(b)) => KirExpr::Bool { value: *b },
        ExprKind::Literal(Literal::Number(n)) => KirExpr::Number { value: *n },
        ExprKind::Literal(Literal::String(s)) => KirExpr::String { value: s.to_string() },
        ExprKind::Variable(name) => KirExpr::Variable { name: name.to_string() },
        ExprKind::Unary(op, inner) => KirExpr::Unary { op: unop_name(*op).to_string(), operand: Box::new(expr_to_kir(inner)) },
        ExprKind::Binary(op, lhs, rhs) => {
            KirExpr::Binary { op: binop_name(*op).to_string(), lhs: Box::new(expr_to_kir(lhs)), rhs: Box::new(expr_to_kir(rhs)) }
        }
        ExprKind::Ternary(c, a, b) => KirExpr::Ternary {
            cond: Box::new(expr_to_kir(c)),
            then_branch: Box::new(expr_to_kir(a)),
            else_branch: Box::new(expr_to_kir(b)),
        },
    }
}

fn expr_from_kir(e: &KirExpr) -> Expr {
    let loc = synth_location();
    let kind = match e {
        KirExpr::Null => ExprKind::Literal(Literal::Null),
        KirExpr::Bool { value } => ExprKind::Literal(Literal::Bool(*value)),
        KirExpr::Number { value } => ExprKind::Literal(Literal::Number(*value)),
        KirExpr::String { value } => ExprKind::Literal(Literal::String(SmolStr::new(value))),
        KirExpr::Variable { name } => ExprKind::Variable(SmolStr::new(name)),
        KirExpr::Unary { op, operand } => ExprKind::Unary(unop_from_name(op), Box::new(expr_from_kir(operand))),
        KirExpr::Binary { op, lhs, rhs } => {
            ExprKind::Binary(binop_from_name(op), Box::new(expr_from_kir(lhs)), Box::new(expr_from_kir(rhs)))
        }
        KirExpr::Ternary { cond, then_branch, else_branch } => ExprKind::Ternary(
            Box::new(expr_from_kir(cond)),
            Box::new(expr_from_kir(then_branch)),
            Box::new(expr_from_kir(else_branch)),
        ),
    };
    Expr::new(kind, loc)
}

fn unit_name(u: Unit) -> &'static str {
    match u {
        Unit::Px => "px",
        Unit::Percent => "%",
        Unit::Em => "em",
        Unit::Rem => "rem",
        Unit::Vw => "vw",
        Unit::Vh => "vh",
        Unit::Pt => "pt",
    }
}

fn unit_from_name(s: &str) -> Unit {
    Unit::from_suffix(s).unwrap_or(Unit::Px)
}

fn binop_name(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::Eq => "==",
        BinOp::Ne => "!=",
        BinOp::Lt => "<",
        BinOp::Gt => ">",
        BinOp::Le => "<=",
        BinOp::Ge => ">=",
        BinOp::And => "&&",
        BinOp::Or => "||",
    }
}

fn binop_from_name(s: &str) -> BinOp {
    match s {
        "-" => BinOp::Sub,
        "*" => BinOp::Mul,
        "/" => BinOp::Div,
        "%" => BinOp::Mod,
        "==" => BinOp::Eq,
        "!=" => BinOp::Ne,
        "<" => BinOp::Lt,
        ">" => BinOp::Gt,
        "<=" => BinOp::Le,
        ">=" => BinOp::Ge,
        "&&" => BinOp::And,
        "||" => BinOp::Or,
        _ => BinOp::Add,
    }
}

fn unop_name(op: UnOp) -> &'static str {
    match op {
        UnOp::Neg => "-",
        UnOp::Not => "!",
    }
}

fn unop_from_name(s: &str) -> UnOp {
    match s {
        "!" => UnOp::Not,
        _ => UnOp::Neg,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(src: &str, style: KirStyle) -> Document {
        let (doc, diags) = crate::parser::parse(src, None);
        assert!(diags.is_empty(), "{diags}");
        let (expanded, _, _) =
            crate::expansion::expand(&doc, &crate::options::ExpansionFlags::default(), &crate::expansion::FsIncludeResolver)
                .unwrap();
        let json = write(&expanded, style, None).unwrap();
        let back = read(&json).unwrap();
        assert_eq!(items_kind_shape(&expanded), items_kind_shape(&back));
        back
    }

    /// Structural comparison ignoring synthesized locations (§4.D round-trip law).
    fn items_kind_shape(doc: &Document) -> Vec<KirItem> {
        doc.items.iter().map(|item| item_to_kir(item, false)).collect()
    }

    #[test]
    fn round_trips_compact_and_readable() {
        let src = r#"Column { Text { text: "hello ${name}"; } Button { onClick: submit; } }"#;
        roundtrip(src, KirStyle::Compact);
        roundtrip(src, KirStyle::Readable);
    }

    #[test]
    fn verbose_carries_expansion_notes_that_readable_omits() {
        let src = r#"
            @component Badge {
                Text { text: "hi"; }
            }
            Badge {}
        "#;
        let (doc, diags) = crate::parser::parse(src, None);
        assert!(diags.is_empty(), "{diags}");
        let flags = crate::options::ExpansionFlags { add_expansion_metadata: true, ..Default::default() };
        let (expanded, _, _) = crate::expansion::expand(&doc, &flags, &crate::expansion::FsIncludeResolver).unwrap();

        let readable = write(&expanded, KirStyle::Readable, None).unwrap();
        let verbose = write(&expanded, KirStyle::Verbose, None).unwrap();
        assert!(!readable.contains("expansion_note"), "readable style must not carry provenance notes");
        assert!(verbose.contains("expansion_note"), "verbose style must carry provenance notes");
        assert_ne!(readable, verbose);
    }

    #[test]
    fn rejects_newer_major_version() {
        let json = r#"{"kir_version":"99.0.0","format":"kir-json","root":[]}"#;
        let err = read(json).unwrap_err();
        assert!(matches!(err, KirError::UnsupportedVersion { .. }));
    }

    #[test]
    fn accepts_same_major_different_minor() {
        let json = r#"{"kir_version":"1.9.3","format":"kir-json","root":[]}"#;
        assert!(read(json).is_ok());
    }

    #[test]
    fn expression_tree_round_trips_through_json() {
        let doc = roundtrip(r#"Text { opacity: 1 + 2 * 3; }"#, KirStyle::Compact);
        let Item::Element(e) = &doc.items[0] else { panic!() };
        assert!(matches!(e.properties[0].value, PropertyValue::Expr(_)));
    }
}
