//! Expression parsing with precedence climbing (§4.B):
//! ternary < logical-or < logical-and < equality < relational < additive < multiplicative < unary < primary.

use super::{join, Parser};
use crate::expr::{BinOp, Expr, ExprKind, Literal, UnOp};
use crate::token::TokenKind;

pub(crate) fn parse_expr(p: &mut Parser) -> Expr {
    parse_ternary(p)
}

fn parse_ternary(p: &mut Parser) -> Expr {
    let start = p.current_location();
    let cond = parse_logical_or(p);
    if matches!(p.peek(), TokenKind::Question) {
        p.bump();
        let then_branch = parse_expr(p);
        p.expect(&TokenKind::Colon);
        let else_branch = parse_ternary(p);
        let loc = join(&start, &else_branch.location);
        Expr::new(ExprKind::Ternary(Box::new(cond), Box::new(then_branch), Box::new(else_branch)), loc)
    } else {
        cond
    }
}

macro_rules! left_assoc_level {
    ($name:ident, $next:ident, [$($tok:pat => $op:expr),+ $(,)?]) => {
        fn $name(p: &mut Parser) -> Expr {
            let start = p.current_location();
            let mut lhs = $next(p);
            loop {
                let op = match p.peek() {
                    $($tok => $op,)+
                    _ => break,
                };
                p.bump();
                let rhs = $next(p);
                let loc = join(&start, &rhs.location);
                lhs = Expr::new(ExprKind::Binary(op, Box::new(lhs), Box::new(rhs)), loc);
            }
            lhs
        }
    };
}

left_assoc_level!(parse_logical_or, parse_logical_and, [TokenKind::OrOr => BinOp::Or]);
left_assoc_level!(parse_logical_and, parse_equality, [TokenKind::AndAnd => BinOp::And]);
left_assoc_level!(parse_equality, parse_relational, [
    TokenKind::EqEq => BinOp::Eq,
    TokenKind::NotEq => BinOp::Ne,
]);
left_assoc_level!(parse_relational, parse_additive, [
    TokenKind::Lt => BinOp::Lt,
    TokenKind::Gt => BinOp::Gt,
    TokenKind::LtEq => BinOp::Le,
    TokenKind::GtEq => BinOp::Ge,
]);
left_assoc_level!(parse_additive, parse_multiplicative, [
    TokenKind::Plus => BinOp::Add,
    TokenKind::Minus => BinOp::Sub,
]);
left_assoc_level!(parse_multiplicative, parse_unary, [
    TokenKind::Star => BinOp::Mul,
    TokenKind::Slash => BinOp::Div,
    TokenKind::Percent => BinOp::Mod,
]);

fn parse_unary(p: &mut Parser) -> Expr {
    let start = p.current_location();
    let op = match p.peek() {
        TokenKind::Minus => Some(UnOp::Neg),
        TokenKind::Bang => Some(UnOp::Not),
        _ => None,
    };
    match op {
        Some(op) => {
            p.bump();
            let operand = parse_unary(p);
            let loc = join(&start, &operand.location);
            Expr::new(ExprKind::Unary(op, Box::new(operand)), loc)
        }
        None => parse_primary(p),
    }
}

fn parse_primary(p: &mut Parser) -> Expr {
    let start = p.current_location();
    match p.peek().clone() {
        TokenKind::Integer(v) => {
            p.bump();
            Expr::new(ExprKind::Literal(Literal::Number(v as f64)), start)
        }
        TokenKind::Float(v) => {
            p.bump();
            Expr::new(ExprKind::Literal(Literal::Number(v)), start)
        }
        TokenKind::Bool(v) => {
            p.bump();
            Expr::new(ExprKind::Literal(Literal::Bool(v)), start)
        }
        TokenKind::Null => {
            p.bump();
            Expr::new(ExprKind::Literal(Literal::Null), start)
        }
        TokenKind::String(s) => {
            p.bump();
            Expr::new(ExprKind::Literal(Literal::String(s)), start)
        }
        TokenKind::Variable(name) => {
            p.bump();
            Expr::new(ExprKind::Variable(name), start)
        }
        TokenKind::Identifier(name) => {
            p.bump();
            Expr::new(ExprKind::Variable(name), start)
        }
        TokenKind::Minus => parse_unary(p),
        TokenKind::LeftParen => {
            p.bump();
            let inner = parse_expr(p);
            let end = p.current_location();
            p.expect(&TokenKind::RightParen);
            Expr::new(inner.kind, join(&start, &end))
        }
        other => {
            p.error(format!("expected an expression, found {other:?}"));
            Expr::new(ExprKind::Literal(Literal::Null), start)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::parse;
    use crate::ast::{Item, PropertyValue};
    use crate::expr::{BinOp, ExprKind};

    fn single_property_value(src: &str) -> PropertyValue {
        let (doc, diags) = parse(src, None);
        assert!(diags.is_empty(), "{diags}");
        match &doc.items[0] {
            Item::Element(e) => e.properties[0].value.clone(),
            other => panic!("expected element, got {other:?}"),
        }
    }

    #[test]
    fn precedence_climbing_binds_multiplicative_tighter_than_additive() {
        let value = single_property_value("Text { opacity: 1 + 2 * 3; }");
        let PropertyValue::Expr(expr) = value else { panic!("expected expression") };
        match expr.kind {
            ExprKind::Binary(BinOp::Add, _, rhs) => {
                assert!(matches!(rhs.kind, ExprKind::Binary(BinOp::Mul, _, _)));
            }
            other => panic!("unexpected shape: {other:?}"),
        }
    }

    #[test]
    fn ternary_is_lowest_precedence() {
        let value = single_property_value("Text { opacity: 1 < 2 ? 3 : 4; }");
        let PropertyValue::Expr(expr) = value else { panic!("expected expression") };
        assert!(matches!(expr.kind, ExprKind::Ternary(..)));
    }
}
