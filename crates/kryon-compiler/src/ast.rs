//! The tagged-variant AST produced by the parser (§3 "AST node", §4.B).
//!
//! Every node kind the source language can contain is a distinct struct or
//! enum variant rather than a shared "Node" base class (Design Note 9:
//! "Tagged unions over inheritance").

use crate::diagnostics::SourceLocation;
use crate::expr::Expr;
use crate::token::Unit;
use smol_str::SmolStr;

#[derive(Debug, Clone, PartialEq)]
pub enum TemplateSegment {
    Literal(SmolStr),
    Variable(SmolStr),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Number(f64),
    Dimension(f64, Unit),
    String(SmolStr),
    /// `$name` used directly as a property value (not inside a template).
    Variable(SmolStr),
    Template(Vec<TemplateSegment>),
    Array(Vec<PropertyValue>),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: SmolStr,
    pub value: PropertyValue,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub type_name: SmolStr,
    pub properties: Vec<Property>,
    pub children: Vec<Child>,
    pub location: SourceLocation,
    /// Set by the expansion pass when `ExpansionFlags::add_expansion_metadata`
    /// is on, describing what produced this element (component instantiation,
    /// `@for`/`@const_for` unrolling). `None` for anything straight out of the
    /// parser. KIR's `verbose` style is the only one that serializes it.
    pub expansion_note: Option<SmolStr>,
}

impl Element {
    pub fn id(&self) -> Option<&str> {
        self.properties.iter().find(|p| p.name == "id").and_then(|p| match &p.value {
            PropertyValue::String(s) => Some(s.as_str()),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ForLoop {
    pub var_name: SmolStr,
    pub iterable: Expr,
    pub body: Vec<Child>,
    /// `@const_for` resolves during expansion; plain `@for` is a runtime directive (§4.C/§4.H).
    pub is_const: bool,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IfBlock {
    pub condition: Expr,
    pub then_body: Vec<Child>,
    pub else_body: Option<Vec<Child>>,
    pub location: SourceLocation,
}

/// Anything that can appear inside an element's body besides a `key: value` property.
#[derive(Debug, Clone, PartialEq)]
pub enum Child {
    Element(Element),
    For(ForLoop),
    If(IfBlock),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StyleDef {
    pub name: SmolStr,
    pub extends: Option<SmolStr>,
    pub properties: Vec<Property>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThemeDef {
    pub name: SmolStr,
    pub properties: Vec<Property>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentParam {
    pub name: SmolStr,
    pub default: Option<PropertyValue>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StateVar {
    pub name: SmolStr,
    pub initial: PropertyValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDef {
    pub name: SmolStr,
    pub params: Vec<SmolStr>,
    pub language: Option<SmolStr>,
    /// Raw brace-balanced body text, as handed back by the lexer's script-body mode (§4.A).
    pub body: SmolStr,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleKind {
    Onload,
    Onmount,
    Onunmount,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleHook {
    pub kind: LifecycleKind,
    pub body: SmolStr,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDef {
    pub name: SmolStr,
    pub extends: Option<SmolStr>,
    pub props: Vec<ComponentParam>,
    pub slots: Vec<SmolStr>,
    pub state: Vec<StateVar>,
    pub functions: Vec<FunctionDef>,
    pub lifecycle: Vec<LifecycleHook>,
    pub template: Element,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstDef {
    pub name: SmolStr,
    pub value: PropertyValue,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VariablesBlock {
    pub entries: Vec<ConstDef>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct IncludeDef {
    pub path: SmolStr,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MetadataDef {
    pub entries: Vec<(SmolStr, PropertyValue)>,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportDef {
    pub names: Vec<SmolStr>,
    pub path: SmolStr,
    pub location: SourceLocation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportDef {
    pub names: Vec<SmolStr>,
    pub location: SourceLocation,
}

/// A top-level form (§4.B "Recognized top-level forms").
#[derive(Debug, Clone, PartialEq)]
pub enum Item {
    Element(Element),
    Style(StyleDef),
    Theme(ThemeDef),
    Component(ComponentDef),
    Const(ConstDef),
    Variables(VariablesBlock),
    Function(FunctionDef),
    Include(IncludeDef),
    Metadata(MetadataDef),
    Lifecycle(LifecycleHook),
    Import(ImportDef),
    Export(ExportDef),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub items: Vec<Item>,
    pub location: SourceLocation,
}

impl Document {
    /// The element tree root, if the document declares exactly one top-level element.
    pub fn root_element(&self) -> Option<&Element> {
        self.items.iter().find_map(|item| match item {
            Item::Element(e) => Some(e),
            _ => None,
        })
    }

    pub fn components(&self) -> impl Iterator<Item = &ComponentDef> {
        self.items.iter().filter_map(|item| match item {
            Item::Component(c) => Some(c),
            _ => None,
        })
    }

    pub fn styles(&self) -> impl Iterator<Item = &StyleDef> {
        self.items.iter().filter_map(|item| match item {
            Item::Style(s) => Some(s),
            _ => None,
        })
    }
}
