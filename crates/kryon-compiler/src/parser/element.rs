//! Element bodies, property values, and template interpolation (§4.B).

use super::expressions::parse_expr;
use super::{directives, join, Parser};
use crate::ast::{Child, Element, Property, PropertyValue, TemplateSegment};
use crate::expr::{ExprKind, Literal};
use crate::token::TokenKind;
use smol_str::SmolStr;

pub(crate) fn parse_element(p: &mut Parser, type_name: SmolStr, start: crate::diagnostics::SourceLocation) -> Element {
    p.expect(&TokenKind::LeftBrace);
    let mut properties = Vec::new();
    let mut children = Vec::new();
    loop {
        match p.peek() {
            TokenKind::RightBrace => break,
            TokenKind::Eof => {
                p.error("unexpected end of file inside element body");
                break;
            }
            TokenKind::ElementType(name) => {
                let name = name.clone();
                let loc = p.current_location();
                p.bump();
                children.push(Child::Element(parse_element(p, name, loc)));
            }
            TokenKind::At(_) => {
                if let Some(child) = directives::parse_child_directive(p) {
                    children.push(child);
                } else {
                    p.synchronize();
                }
            }
            TokenKind::Identifier(name) => {
                let name = name.clone();
                let loc = p.current_location();
                p.bump();
                if p.expect(&TokenKind::Colon).is_none() {
                    p.synchronize();
                    continue;
                }
                let value = parse_property_value(p);
                p.eat_semicolon();
                properties.push(Property { name, value, location: loc });
            }
            other => {
                let msg = format!("expected a property, nested element, or directive, found {other:?}");
                p.error(msg);
                p.synchronize();
            }
        }
    }
    let end = p.current_location();
    p.expect(&TokenKind::RightBrace);
    Element { type_name, properties, children, location: join(&start, &end), expansion_note: None }
}

pub(crate) fn parse_property_value(p: &mut Parser) -> PropertyValue {
    match p.peek().clone() {
        TokenKind::DimensionNumber(v, unit) => {
            p.bump();
            PropertyValue::Dimension(v, unit)
        }
        TokenKind::LeftBracket => parse_array(p),
        TokenKind::TemplateStringPart(_) => parse_template(p),
        TokenKind::String(s) => {
            p.bump();
            PropertyValue::String(s)
        }
        _ => simplify(parse_expr(p)),
    }
}

/// Collapses a parsed expression back down to a plain literal/variable value
/// when it turned out to be nothing more than one, so that e.g. `width: 400;`
/// round-trips as a plain number instead of a single-node expression tree.
fn simplify(expr: crate::expr::Expr) -> PropertyValue {
    match expr.kind {
        ExprKind::Literal(Literal::Null) => PropertyValue::Null,
        ExprKind::Literal(Literal::Bool(b)) => PropertyValue::Bool(b),
        ExprKind::Literal(Literal::Number(n)) => PropertyValue::Number(n),
        ExprKind::Literal(Literal::String(s)) => PropertyValue::String(s),
        ExprKind::Variable(name) => PropertyValue::Variable(name),
        _ => PropertyValue::Expr(expr),
    }
}

fn parse_array(p: &mut Parser) -> PropertyValue {
    p.bump(); // [
    let mut items = Vec::new();
    while !matches!(p.peek(), TokenKind::RightBracket | TokenKind::Eof) {
        items.push(parse_property_value(p));
        if matches!(p.peek(), TokenKind::Comma) {
            p.bump();
        } else {
            break;
        }
    }
    p.expect(&TokenKind::RightBracket);
    PropertyValue::Array(items)
}

fn parse_template(p: &mut Parser) -> PropertyValue {
    let mut segments = Vec::new();
    loop {
        match p.peek().clone() {
            TokenKind::TemplateStringPart(text) => {
                p.bump();
                if !text.is_empty() {
                    segments.push(TemplateSegment::Literal(text));
                }
                let expr = parse_expr(p);
                segments.push(match expr.kind {
                    ExprKind::Variable(name) => TemplateSegment::Variable(name),
                    _ => TemplateSegment::Expr(expr),
                });
            }
            TokenKind::String(text) => {
                p.bump();
                if !text.is_empty() {
                    segments.push(TemplateSegment::Literal(text));
                }
                break;
            }
            _ => {
                p.error("unterminated template string");
                break;
            }
        }
    }
    PropertyValue::Template(segments)
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use crate::ast::{Child, Item, PropertyValue, TemplateSegment};

    #[test]
    fn spec_scenario_two_template_with_two_segments() {
        let (doc, diags) = parse(r#"Text { text: "hello ${name}"; }"#, None);
        assert!(diags.is_empty(), "{diags}");
        let Item::Element(e) = &doc.items[0] else { panic!() };
        let PropertyValue::Template(segments) = &e.properties[0].value else { panic!() };
        assert_eq!(
            segments,
            &vec![TemplateSegment::Literal("hello ".into()), TemplateSegment::Variable("name".into())]
        );
    }

    #[test]
    fn nested_elements_and_trailing_semicolons_are_optional() {
        let (doc, diags) = parse(
            r#"Column {
                Button { text: "A" }
                Button { text: "B" }
            }"#,
            None,
        );
        assert!(diags.is_empty(), "{diags}");
        let Item::Element(col) = &doc.items[0] else { panic!() };
        assert_eq!(col.children.len(), 2);
        for child in &col.children {
            assert!(matches!(child, Child::Element(_)));
        }
    }

    #[test]
    fn array_property_value() {
        let (doc, diags) = parse(r#"Dropdown { options: ["a", "b", "c"]; }"#, None);
        assert!(diags.is_empty(), "{diags}");
        let Item::Element(e) = &doc.items[0] else { panic!() };
        let PropertyValue::Array(items) = &e.properties[0].value else { panic!() };
        assert_eq!(items.len(), 3);
    }

    #[test]
    fn dimension_value_records_its_unit() {
        let (doc, diags) = parse("Container { width: 50%; }", None);
        assert!(diags.is_empty(), "{diags}");
        let Item::Element(e) = &doc.items[0] else { panic!() };
        assert!(matches!(e.properties[0].value, PropertyValue::Dimension(50.0, _)));
    }
}
