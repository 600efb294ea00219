//! Top-level forms and the child-level `@for`/`@if` control directives (§4.B).

use super::element::{parse_element, parse_property_value};
use super::expressions::parse_expr;
use super::{join, Parser};
use crate::ast::{
    Child, ComponentDef, ComponentParam, ConstDef, Element, ExportDef, ForLoop, FunctionDef, IfBlock, ImportDef,
    IncludeDef, Item, LifecycleHook, LifecycleKind, MetadataDef, Property, StateVar, StyleDef, ThemeDef,
    VariablesBlock,
};
use crate::token::{Directive, TokenKind};
use smol_str::SmolStr;

/// Parses one top-level form. Returns `None` (after recording a diagnostic)
/// for a token that cannot start one, so the caller can resynchronize.
pub(crate) fn parse_item(p: &mut Parser) -> Option<Item> {
    match p.peek().clone() {
        TokenKind::ElementType(name) => {
            let loc = p.current_location();
            p.bump();
            Some(Item::Element(parse_element(p, name, loc)))
        }
        TokenKind::At(Directive::Style) => Some(Item::Style(parse_style(p))),
        TokenKind::At(Directive::Theme) => Some(Item::Theme(parse_theme(p))),
        TokenKind::At(Directive::Component) => Some(Item::Component(parse_component(p))),
        TokenKind::At(Directive::Const) => Some(Item::Const(parse_const(p))),
        TokenKind::At(Directive::Variables) => Some(Item::Variables(parse_variables(p))),
        TokenKind::At(Directive::Function) => Some(Item::Function(parse_function(p))),
        TokenKind::At(Directive::Include) => Some(Item::Include(parse_include(p))),
        TokenKind::At(Directive::Metadata) => Some(Item::Metadata(parse_metadata(p))),
        TokenKind::At(kind @ (Directive::Onload | Directive::Onmount | Directive::Onunmount)) => {
            Some(Item::Lifecycle(parse_lifecycle(p, lifecycle_kind(kind))))
        }
        TokenKind::At(Directive::Import) => Some(Item::Import(parse_import(p))),
        TokenKind::At(Directive::Export) => Some(Item::Export(parse_export(p))),
        TokenKind::At(Directive::For | Directive::ConstFor | Directive::If) => {
            p.error("`@for`/`@const_for`/`@if` are only valid inside an element body");
            p.bump();
            None
        }
        TokenKind::At(Directive::Props | Directive::Slots | Directive::State | Directive::Watch | Directive::Store) => {
            p.error("this directive is only valid inside `@component`");
            p.bump();
            None
        }
        other => {
            p.error(format!("expected an element, directive, or end of file, found {other:?}"));
            None
        }
    }
}

/// `@for`/`@const_for`/`@if` nested inside an element body (§4.B, §4.C).
pub(crate) fn parse_child_directive(p: &mut Parser) -> Option<Child> {
    match p.peek().clone() {
        TokenKind::At(Directive::For) | TokenKind::At(Directive::ConstFor) => Some(Child::For(parse_for(p))),
        TokenKind::At(Directive::If) => Some(Child::If(parse_if(p))),
        other => {
            p.error(format!("`{other:?}` is not valid here"));
            p.bump();
            None
        }
    }
}

fn lifecycle_kind(d: Directive) -> LifecycleKind {
    match d {
        Directive::Onload => LifecycleKind::Onload,
        Directive::Onmount => LifecycleKind::Onmount,
        Directive::Onunmount => LifecycleKind::Onunmount,
        _ => unreachable!(),
    }
}

fn parse_style(p: &mut Parser) -> StyleDef {
    let start = p.current_location();
    p.bump(); // @style
    let name = expect_name(p);
    let extends = if matches!(p.peek(), TokenKind::KwExtends) {
        p.bump();
        Some(expect_name(p))
    } else {
        None
    };
    let properties = parse_braced_property_list(p);
    let end = p.current_location();
    StyleDef { name, extends, properties, location: join(&start, &end) }
}

fn parse_theme(p: &mut Parser) -> ThemeDef {
    let start = p.current_location();
    p.bump(); // @theme
    let name = expect_name(p);
    let properties = parse_braced_property_list(p);
    let end = p.current_location();
    ThemeDef { name, properties, location: join(&start, &end) }
}

fn parse_const(p: &mut Parser) -> ConstDef {
    let start = p.current_location();
    p.bump(); // @const
    let name = expect_name(p);
    p.expect(&TokenKind::Assign);
    let value = parse_property_value(p);
    p.eat_semicolon();
    let end = p.current_location();
    ConstDef { name, value, location: join(&start, &end) }
}

fn parse_variables(p: &mut Parser) -> VariablesBlock {
    let start = p.current_location();
    p.bump(); // @variables
    p.expect(&TokenKind::LeftBrace);
    let mut entries = Vec::new();
    while !matches!(p.peek(), TokenKind::RightBrace | TokenKind::Eof) {
        let entry_start = p.current_location();
        let name = expect_name(p);
        p.expect(&TokenKind::Assign);
        let value = parse_property_value(p);
        p.eat_semicolon();
        entries.push(ConstDef { name, value, location: join(&entry_start, &p.current_location()) });
    }
    p.expect(&TokenKind::RightBrace);
    let end = p.current_location();
    VariablesBlock { entries, location: join(&start, &end) }
}

fn parse_function(p: &mut Parser) -> FunctionDef {
    let start = p.current_location();
    p.bump(); // @function
    let name = expect_name(p);
    p.expect(&TokenKind::LeftParen);
    let mut params = Vec::new();
    while !matches!(p.peek(), TokenKind::RightParen | TokenKind::Eof) {
        params.push(expect_name(p));
        if matches!(p.peek(), TokenKind::Comma) {
            p.bump();
        } else {
            break;
        }
    }
    p.expect(&TokenKind::RightParen);
    let language = if matches!(p.peek(), TokenKind::Colon) {
        p.bump();
        match p.peek().clone() {
            TokenKind::String(s) => {
                p.bump();
                Some(s)
            }
            _ => {
                p.error("expected a string naming the script language");
                None
            }
        }
    } else {
        None
    };
    let body = capture_brace_balanced_body(p);
    let end = p.current_location();
    FunctionDef { name, params, language, body, location: join(&start, &end) }
}

fn parse_lifecycle(p: &mut Parser, kind: LifecycleKind) -> LifecycleHook {
    let start = p.current_location();
    p.bump(); // @onload / @onmount / @onunmount
    let body = capture_brace_balanced_body(p);
    let end = p.current_location();
    LifecycleHook { kind, body, location: join(&start, &end) }
}

fn parse_include(p: &mut Parser) -> IncludeDef {
    let start = p.current_location();
    p.bump(); // @include
    let path = match p.peek().clone() {
        TokenKind::String(s) => {
            p.bump();
            s
        }
        _ => {
            p.error("expected a quoted path after `@include`");
            SmolStr::default()
        }
    };
    p.eat_semicolon();
    let end = p.current_location();
    IncludeDef { path, location: join(&start, &end) }
}

fn parse_metadata(p: &mut Parser) -> MetadataDef {
    let start = p.current_location();
    p.bump(); // @metadata
    let properties = parse_braced_property_list(p);
    let end = p.current_location();
    let entries = properties.into_iter().map(|prop| (prop.name, prop.value)).collect();
    MetadataDef { entries, location: join(&start, &end) }
}

fn parse_import(p: &mut Parser) -> ImportDef {
    let start = p.current_location();
    p.bump(); // @import
    let mut names = vec![expect_name(p)];
    while matches!(p.peek(), TokenKind::Comma) {
        p.bump();
        names.push(expect_name(p));
    }
    if !is_keyword(p, "from") {
        p.error("expected `from` after the imported names");
    } else {
        p.bump();
    }
    let path = match p.peek().clone() {
        TokenKind::String(s) => {
            p.bump();
            s
        }
        _ => {
            p.error("expected a quoted module path");
            SmolStr::default()
        }
    };
    p.eat_semicolon();
    let end = p.current_location();
    ImportDef { names, path, location: join(&start, &end) }
}

fn parse_export(p: &mut Parser) -> ExportDef {
    let start = p.current_location();
    p.bump(); // @export
    let mut names = vec![expect_name(p)];
    while matches!(p.peek(), TokenKind::Comma) {
        p.bump();
        names.push(expect_name(p));
    }
    p.eat_semicolon();
    let end = p.current_location();
    ExportDef { names, location: join(&start, &end) }
}

fn parse_for(p: &mut Parser) -> ForLoop {
    let start = p.current_location();
    let is_const = matches!(p.peek(), TokenKind::At(Directive::ConstFor));
    p.bump(); // @for / @const_for
    let var_name = match p.peek().clone() {
        TokenKind::Variable(name) => {
            p.bump();
            name
        }
        _ => {
            p.error("expected `$name` after `@for`");
            SmolStr::default()
        }
    };
    p.expect(&TokenKind::KwIn);
    let iterable = parse_expr(p);
    p.expect(&TokenKind::LeftBrace);
    let body = parse_children_until_rbrace(p);
    p.expect(&TokenKind::RightBrace);
    let end = p.current_location();
    ForLoop { var_name, iterable, body, is_const, location: join(&start, &end) }
}

fn parse_if(p: &mut Parser) -> IfBlock {
    let start = p.current_location();
    p.bump(); // @if
    let condition = parse_expr(p);
    p.expect(&TokenKind::LeftBrace);
    let then_body = parse_children_until_rbrace(p);
    p.expect(&TokenKind::RightBrace);
    let else_body = if is_keyword(p, "else") {
        p.bump();
        if matches!(p.peek(), TokenKind::At(Directive::If)) {
            Some(vec![Child::If(parse_if(p))])
        } else {
            p.expect(&TokenKind::LeftBrace);
            let body = parse_children_until_rbrace(p);
            p.expect(&TokenKind::RightBrace);
            Some(body)
        }
    } else {
        None
    };
    let end = p.current_location();
    IfBlock { condition, then_body, else_body, location: join(&start, &end) }
}

fn parse_children_until_rbrace(p: &mut Parser) -> Vec<Child> {
    let mut children = Vec::new();
    loop {
        match p.peek().clone() {
            TokenKind::RightBrace | TokenKind::Eof => break,
            TokenKind::ElementType(name) => {
                let loc = p.current_location();
                p.bump();
                children.push(Child::Element(parse_element(p, name, loc)));
            }
            TokenKind::At(_) => {
                if let Some(child) = parse_child_directive(p) {
                    children.push(child);
                } else {
                    p.synchronize();
                }
            }
            other => {
                p.error(format!("expected a nested element or directive, found {other:?}"));
                p.synchronize();
            }
        }
    }
    children
}

fn parse_component(p: &mut Parser) -> ComponentDef {
    let start = p.current_location();
    p.bump(); // @component
    let name = expect_name(p);
    let extends = if matches!(p.peek(), TokenKind::KwExtends) {
        p.bump();
        Some(expect_name(p))
    } else {
        None
    };
    p.expect(&TokenKind::LeftBrace);

    let mut props = Vec::new();
    let mut slots = Vec::new();
    let mut state = Vec::new();
    let mut functions = Vec::new();
    let mut lifecycle = Vec::new();
    let mut template = None;

    loop {
        match p.peek().clone() {
            TokenKind::RightBrace | TokenKind::Eof => break,
            TokenKind::At(Directive::Props) => {
                p.bump();
                props = parse_props_block(p);
            }
            TokenKind::At(Directive::Slots) => {
                p.bump();
                slots = parse_slots_block(p);
            }
            TokenKind::At(Directive::State) => {
                p.bump();
                state = parse_state_block(p);
            }
            TokenKind::At(Directive::Function) => functions.push(parse_function(p)),
            TokenKind::At(kind @ (Directive::Onload | Directive::Onmount | Directive::Onunmount)) => {
                lifecycle.push(parse_lifecycle(p, lifecycle_kind(kind)));
            }
            TokenKind::ElementType(type_name) => {
                let loc = p.current_location();
                p.bump();
                let element = parse_element(p, type_name, loc);
                if template.is_some() {
                    p.error("a component may only declare one root template element");
                }
                template = Some(element);
            }
            other => {
                p.error(format!("unexpected `{other:?}` inside `@component` body"));
                p.synchronize();
            }
        }
    }
    let end = p.current_location();
    p.expect(&TokenKind::RightBrace);

    let template = template.unwrap_or_else(|| {
        p.error("`@component` has no root template element");
        Element {
            type_name: "Container".into(),
            properties: Vec::new(),
            children: Vec::new(),
            location: join(&start, &end),
            expansion_note: None,
        }
    });

    ComponentDef { name, extends, props, slots, state, functions, lifecycle, template, location: join(&start, &end) }
}

fn parse_props_block(p: &mut Parser) -> Vec<ComponentParam> {
    p.expect(&TokenKind::LeftBrace);
    let mut params = Vec::new();
    while !matches!(p.peek(), TokenKind::RightBrace | TokenKind::Eof) {
        let name = expect_name(p);
        let default = if matches!(p.peek(), TokenKind::Colon) {
            p.bump();
            Some(parse_property_value(p))
        } else {
            None
        };
        params.push(ComponentParam { name, default });
        if matches!(p.peek(), TokenKind::Comma | TokenKind::Semicolon) {
            p.bump();
        } else {
            break;
        }
    }
    p.expect(&TokenKind::RightBrace);
    params
}

fn parse_slots_block(p: &mut Parser) -> Vec<SmolStr> {
    p.expect(&TokenKind::LeftBrace);
    let mut names = Vec::new();
    while !matches!(p.peek(), TokenKind::RightBrace | TokenKind::Eof) {
        names.push(expect_name(p));
        if matches!(p.peek(), TokenKind::Comma | TokenKind::Semicolon) {
            p.bump();
        } else {
            break;
        }
    }
    p.expect(&TokenKind::RightBrace);
    names
}

fn parse_state_block(p: &mut Parser) -> Vec<StateVar> {
    p.expect(&TokenKind::LeftBrace);
    let mut vars = Vec::new();
    while !matches!(p.peek(), TokenKind::RightBrace | TokenKind::Eof) {
        let name = expect_name(p);
        p.expect(&TokenKind::Assign);
        let initial = parse_property_value(p);
        vars.push(StateVar { name, initial });
        if matches!(p.peek(), TokenKind::Comma | TokenKind::Semicolon) {
            p.bump();
        } else {
            break;
        }
    }
    p.expect(&TokenKind::RightBrace);
    vars
}

fn parse_braced_property_list(p: &mut Parser) -> Vec<Property> {
    p.expect(&TokenKind::LeftBrace);
    let mut properties = Vec::new();
    while !matches!(p.peek(), TokenKind::RightBrace | TokenKind::Eof) {
        let loc = p.current_location();
        let name = expect_name(p);
        p.expect(&TokenKind::Colon);
        let value = parse_property_value(p);
        p.eat_semicolon();
        properties.push(Property { name, value, location: loc });
    }
    p.expect(&TokenKind::RightBrace);
    properties
}

/// Accepts an identifier as a bare name (style/component/const names etc.
/// aren't required to start lowercase the way element-type tokens are).
fn expect_name(p: &mut Parser) -> SmolStr {
    match p.peek().clone() {
        TokenKind::Identifier(name) | TokenKind::ElementType(name) => {
            p.bump();
            name
        }
        other => {
            p.error(format!("expected a name, found {other:?}"));
            SmolStr::default()
        }
    }
}

fn is_keyword(p: &Parser, word: &str) -> bool {
    matches!(p.peek(), TokenKind::Identifier(name) if name.as_str() == word)
}

/// Captures the raw source text of a `{ ... }` body without re-lexing it,
/// by brace-balancing over already-produced tokens and slicing their
/// combined span out of the original source (§4.A script-body mode).
fn capture_brace_balanced_body(p: &mut Parser) -> SmolStr {
    p.expect(&TokenKind::LeftBrace);
    if matches!(p.peek(), TokenKind::RightBrace) {
        p.bump();
        return SmolStr::default();
    }
    let start_loc = p.current_location();
    let mut last_loc = start_loc.clone();
    let mut depth = 1i32;
    loop {
        match p.peek() {
            TokenKind::LeftBrace => depth += 1,
            TokenKind::RightBrace => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            TokenKind::Eof => {
                p.error("unterminated `{ ... }` body");
                break;
            }
            _ => {}
        }
        last_loc = p.current_location();
        p.bump();
    }
    p.expect(&TokenKind::RightBrace);
    SmolStr::new(join(&start_loc, &last_loc).text())
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use crate::ast::{Child, Item};
    use smol_str::SmolStr;

    #[test]
    fn style_with_extends() {
        let (doc, diags) = parse(r#"@style card extends base { backgroundColor: "#fff"; }"#, None);
        assert!(diags.is_empty(), "{diags}");
        let Item::Style(s) = &doc.items[0] else { panic!() };
        assert_eq!(s.name, "card");
        assert_eq!(s.extends.as_deref(), Some("base"));
        assert_eq!(s.properties.len(), 1);
    }

    #[test]
    fn const_and_variables_block() {
        let (doc, diags) = parse(
            r#"
            @const MAX = 10;
            @variables {
                count = 0;
                label = "hi";
            }
            "#,
            None,
        );
        assert!(diags.is_empty(), "{diags}");
        assert!(matches!(doc.items[0], Item::Const(_)));
        let Item::Variables(v) = &doc.items[1] else { panic!() };
        assert_eq!(v.entries.len(), 2);
    }

    #[test]
    fn function_body_is_captured_verbatim() {
        let (doc, diags) = parse(
            r#"@function increment(amount) {
                count = count + amount;
            }"#,
            None,
        );
        assert!(diags.is_empty(), "{diags}");
        let Item::Function(f) = &doc.items[0] else { panic!() };
        assert_eq!(f.name, "increment");
        assert_eq!(f.params, vec![SmolStr::new("amount")]);
        assert!(f.body.contains("count = count + amount"));
    }

    #[test]
    fn component_with_props_state_function_and_template() {
        let (doc, diags) = parse(
            r#"@component Counter {
                @props { initial: 0 }
                @state { count = $initial }
                @function increment() { count = count + 1; }
                Column {
                    Text { text: "${count}"; }
                }
            }"#,
            None,
        );
        assert!(diags.is_empty(), "{diags}");
        let Item::Component(c) = &doc.items[0] else { panic!() };
        assert_eq!(c.name, "Counter");
        assert_eq!(c.props.len(), 1);
        assert_eq!(c.state.len(), 1);
        assert_eq!(c.functions.len(), 1);
        assert_eq!(c.template.type_name, "Column");
    }

    #[test]
    fn for_and_if_are_rejected_at_top_level() {
        let (_doc, diags) = parse(r#"@for $x in $items { }"#, None);
        assert!(diags.has_blocking_errors());
    }

    #[test]
    fn for_loop_over_children_with_const_flag() {
        let (doc, diags) = parse(
            r#"Column {
                @const_for $item in $items {
                    Text { text: "${item}"; }
                }
            }"#,
            None,
        );
        assert!(diags.is_empty(), "{diags}");
        let Item::Element(col) = &doc.items[0] else { panic!() };
        let Child::For(for_loop) = &col.children[0] else { panic!() };
        assert!(for_loop.is_const);
        assert_eq!(for_loop.var_name, "item");
    }

    #[test]
    fn if_else_chain() {
        let (doc, diags) = parse(
            r#"Column {
                @if $loggedIn {
                    Text { text: "welcome"; }
                } else {
                    Text { text: "log in"; }
                }
            }"#,
            None,
        );
        assert!(diags.is_empty(), "{diags}");
        let Item::Element(col) = &doc.items[0] else { panic!() };
        let Child::If(if_block) = &col.children[0] else { panic!() };
        assert!(if_block.else_body.is_some());
    }
}
