//! AST-level expression trees (§3 "Expression node").
//!
//! This is the parser's representation: literals keep their actual text and
//! variable references keep their name. The code generator lowers this into
//! `kryon_krb::ExprNode`, which stores strings as string-table indices
//! instead — the wire format is defined once in `kryon-krb` so the compiler
//! and runtime never disagree about its shape.

use crate::diagnostics::SourceLocation;
use smol_str::SmolStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Number(f64),
    String(SmolStr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    Literal(Literal),
    Variable(SmolStr),
    Unary(UnOp, Box<Expr>),
    Binary(BinOp, Box<Expr>, Box<Expr>),
    Ternary(Box<Expr>, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub location: SourceLocation,
}

impl Expr {
    pub fn new(kind: ExprKind, location: SourceLocation) -> Self {
        Self { kind, location }
    }
}

/// Lowers an AST expression into the shared wire format, interning string
/// literals and variable names through `intern`.
pub fn lower_expr(expr: &Expr, intern: &mut impl FnMut(&str) -> u32) -> kryon_krb::ExprNode {
    use kryon_krb::{ExprLiteral, ExprNode};
    match &expr.kind {
        ExprKind::Literal(Literal::Null) => ExprNode::Literal(ExprLiteral::Null),
        ExprKind::Literal(Literal::Bool(b)) => ExprNode::Literal(ExprLiteral::Bool(*b)),
        ExprKind::Literal(Literal::Number(n)) => ExprNode::Literal(ExprLiteral::Number(*n)),
        ExprKind::Literal(Literal::String(s)) => ExprNode::Literal(ExprLiteral::StringRef(intern(s))),
        ExprKind::Variable(name) => ExprNode::Var(intern(name)),
        ExprKind::Unary(op, inner) => ExprNode::Unary(lower_unop(*op), Box::new(lower_expr(inner, intern))),
        ExprKind::Binary(op, lhs, rhs) => ExprNode::Binary(
            lower_binop(*op),
            Box::new(lower_expr(lhs, intern)),
            Box::new(lower_expr(rhs, intern)),
        ),
        ExprKind::Ternary(cond, a, b) => ExprNode::Ternary(
            Box::new(lower_expr(cond, intern)),
            Box::new(lower_expr(a, intern)),
            Box::new(lower_expr(b, intern)),
        ),
    }
}

fn lower_binop(op: BinOp) -> kryon_krb::BinOp {
    use kryon_krb::BinOp as W;
    match op {
        BinOp::Add => W::Add,
        BinOp::Sub => W::Sub,
        BinOp::Mul => W::Mul,
        BinOp::Div => W::Div,
        BinOp::Mod => W::Mod,
        BinOp::Eq => W::Eq,
        BinOp::Ne => W::Ne,
        BinOp::Lt => W::Lt,
        BinOp::Gt => W::Gt,
        BinOp::Le => W::Le,
        BinOp::Ge => W::Ge,
        BinOp::And => W::And,
        BinOp::Or => W::Or,
    }
}

fn lower_unop(op: UnOp) -> kryon_krb::UnOp {
    match op {
        UnOp::Neg => kryon_krb::UnOp::Neg,
        UnOp::Not => kryon_krb::UnOp::Not,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{anonymous_source_file, Span};

    fn loc() -> SourceLocation {
        SourceLocation { file: anonymous_source_file(""), span: Span::default() }
    }

    #[test]
    fn lowers_nested_expression_interning_strings() {
        let expr = Expr::new(
            ExprKind::Ternary(
                Box::new(Expr::new(
                    ExprKind::Binary(
                        BinOp::Gt,
                        Box::new(Expr::new(ExprKind::Variable("count".into()), loc())),
                        Box::new(Expr::new(ExprKind::Literal(Literal::Number(3.0)), loc())),
                    ),
                    loc(),
                )),
                Box::new(Expr::new(ExprKind::Literal(Literal::String("many".into())), loc())),
                Box::new(Expr::new(ExprKind::Literal(Literal::String("few".into())), loc())),
            ),
            loc(),
        );
        let mut table = Vec::new();
        let mut intern = |s: &str| -> u32 {
            if let Some(idx) = table.iter().position(|existing: &String| existing == s) {
                idx as u32
            } else {
                table.push(s.to_string());
                (table.len() - 1) as u32
            }
        };
        let wire = lower_expr(&expr, &mut intern);
        assert_eq!(table, vec!["count", "many", "few"]);
        assert!(matches!(wire, kryon_krb::ExprNode::Ternary(..)));
    }
}
