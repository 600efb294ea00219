//! Expression evaluator (§4.G): walks an [`ExprNode`] against a three-scope
//! variable lookup — local `@for` iteration variables, then the enclosing
//! component instance's state, then globals.

use crate::state::StateTree;
use crate::value::RuntimeValue;
use kryon_krb::{BinOp, ExprLiteral, ExprNode, UnOp};
use std::collections::HashMap;

/// Resolves `$name` lookups for one evaluation. Built fresh per element
/// (its instance prefix and loop locals can differ from its neighbours).
pub struct Scope<'a> {
    /// `@for` iteration variables currently bound, innermost first.
    pub locals: HashMap<String, RuntimeValue>,
    /// `<instance-id>.` prefix for component-instance state, if this
    /// element was produced by expanding a component (§4.C/§4.G).
    pub instance_prefix: Option<&'a str>,
    pub state: &'a StateTree,
}

impl<'a> Scope<'a> {
    pub fn new(state: &'a StateTree, instance_prefix: Option<&'a str>) -> Self {
        Self { locals: HashMap::new(), instance_prefix, state }
    }

    pub fn with_local(mut self, name: impl Into<String>, value: RuntimeValue) -> Self {
        self.locals.insert(name.into(), value);
        self
    }

    /// Unresolved references evaluate to a default rather than erroring
    /// (§4.G) — the caller is expected to log a warning separately in
    /// validation mode, since this function has no diagnostics channel.
    fn resolve(&self, name: &str) -> RuntimeValue {
        if let Some(v) = self.locals.get(name) {
            return v.clone();
        }
        if let Some(prefix) = self.instance_prefix {
            let path = format!("{prefix}.{name}");
            if self.state.contains(&path) {
                return self.state.get_by_path(&path);
            }
        }
        if self.state.contains(name) {
            return self.state.get_by_path(name);
        }
        RuntimeValue::Null
    }
}

/// Looks a string-table index up; the string table lives with whatever
/// holds the decoded document, not the evaluator, so it's threaded in.
pub fn eval(node: &ExprNode, scope: &Scope, strings: &[String]) -> RuntimeValue {
    match node {
        ExprNode::Literal(ExprLiteral::Null) => RuntimeValue::Null,
        ExprNode::Literal(ExprLiteral::Bool(b)) => RuntimeValue::Bool(*b),
        ExprNode::Literal(ExprLiteral::Number(n)) => RuntimeValue::Float(*n),
        ExprNode::Literal(ExprLiteral::StringRef(idx)) => {
            RuntimeValue::String(strings.get(*idx as usize).cloned().unwrap_or_default())
        }
        ExprNode::Var(idx) => {
            let name = strings.get(*idx as usize).map(String::as_str).unwrap_or("");
            scope.resolve(name)
        }
        ExprNode::Unary(op, inner) => eval_unary(*op, &eval(inner, scope, strings)),
        ExprNode::Binary(op, lhs, rhs) => eval_binary(*op, &eval(lhs, scope, strings), &eval(rhs, scope, strings), scope, rhs, strings),
        ExprNode::Ternary(cond, a, b) => {
            if eval(cond, scope, strings).as_bool() {
                eval(a, scope, strings)
            } else {
                eval(b, scope, strings)
            }
        }
    }
}

fn eval_unary(op: UnOp, value: &RuntimeValue) -> RuntimeValue {
    match op {
        UnOp::Neg => RuntimeValue::Float(-value.as_f64()),
        UnOp::Not => RuntimeValue::Bool(!value.as_bool()),
    }
}

/// Short-circuits `&&`/`||` on the already-evaluated `lhs`, re-evaluating
/// `rhs` lazily so side-effect-free expressions never pay for the skipped
/// branch (boolean operators short-circuit, §4.G).
fn eval_binary(op: BinOp, lhs: &RuntimeValue, rhs: &RuntimeValue, scope: &Scope, rhs_node: &ExprNode, strings: &[String]) -> RuntimeValue {
    match op {
        BinOp::And => {
            if !lhs.as_bool() {
                RuntimeValue::Bool(false)
            } else {
                RuntimeValue::Bool(eval(rhs_node, scope, strings).as_bool())
            }
        }
        BinOp::Or => {
            if lhs.as_bool() {
                RuntimeValue::Bool(true)
            } else {
                RuntimeValue::Bool(eval(rhs_node, scope, strings).as_bool())
            }
        }
        BinOp::Add => {
            if matches!(lhs, RuntimeValue::String(_)) || matches!(rhs, RuntimeValue::String(_)) {
                RuntimeValue::String(format!("{}{}", lhs.as_display_string(), rhs.as_display_string()))
            } else {
                RuntimeValue::Float(lhs.as_f64() + rhs.as_f64())
            }
        }
        BinOp::Sub => RuntimeValue::Float(lhs.as_f64() - rhs.as_f64()),
        BinOp::Mul => RuntimeValue::Float(lhs.as_f64() * rhs.as_f64()),
        BinOp::Div => RuntimeValue::Float(lhs.as_f64() / rhs.as_f64()),
        BinOp::Mod => RuntimeValue::Float(lhs.as_f64() % rhs.as_f64()),
        BinOp::Eq => RuntimeValue::Bool(values_equal(lhs, rhs)),
        BinOp::Ne => RuntimeValue::Bool(!values_equal(lhs, rhs)),
        BinOp::Lt => RuntimeValue::Bool(lhs.as_f64() < rhs.as_f64()),
        BinOp::Gt => RuntimeValue::Bool(lhs.as_f64() > rhs.as_f64()),
        BinOp::Le => RuntimeValue::Bool(lhs.as_f64() <= rhs.as_f64()),
        BinOp::Ge => RuntimeValue::Bool(lhs.as_f64() >= rhs.as_f64()),
    }
}

fn values_equal(a: &RuntimeValue, b: &RuntimeValue) -> bool {
    match (a, b) {
        (RuntimeValue::String(x), RuntimeValue::String(y)) => x == y,
        (RuntimeValue::Null, RuntimeValue::Null) => true,
        _ => a.as_f64() == b.as_f64(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings() -> Vec<String> {
        vec!["count".to_string(), "item".to_string(), "prefix".to_string()]
    }

    #[test]
    fn local_shadows_global() {
        let mut state = StateTree::new();
        state.seed("count", RuntimeValue::Int(10));
        let scope = Scope::new(&state, None).with_local("count", RuntimeValue::Int(1));
        let node = ExprNode::Var(0);
        assert_eq!(eval(&node, &scope, &strings()), RuntimeValue::Int(1));
    }

    #[test]
    fn unresolved_variable_is_null() {
        let state = StateTree::new();
        let scope = Scope::new(&state, None);
        assert_eq!(eval(&ExprNode::Var(1), &scope, &strings()), RuntimeValue::Null);
    }

    #[test]
    fn plus_concatenates_when_either_side_is_a_string() {
        let state = StateTree::new();
        let scope = Scope::new(&state, None);
        let node = ExprNode::Binary(
            BinOp::Add,
            Box::new(ExprNode::Literal(ExprLiteral::StringRef(1))),
            Box::new(ExprNode::Literal(ExprLiteral::Number(3.0))),
        );
        assert_eq!(eval(&node, &scope, &strings()), RuntimeValue::String("item3".to_string()));
    }

    #[test]
    fn instance_state_resolves_before_globals() {
        let mut state = StateTree::new();
        state.seed("count", RuntimeValue::Int(10));
        state.seed("c1.count", RuntimeValue::Int(99));
        let scope = Scope::new(&state, Some("c1"));
        assert_eq!(eval(&ExprNode::Var(0), &scope, &strings()), RuntimeValue::Int(99));
    }
}
