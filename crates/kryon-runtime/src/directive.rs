//! Directive engine (§4.H): turns `ChildTemplate::For`/`::If` bodies into
//! live elements and keeps them in sync as their driving state changes.
//! Regeneration only ever happens during the update phase, never while
//! render commands are being emitted (§4.E design note).

use crate::eval::{eval, Scope};
use crate::item_tree::{ChildSlot, ChildTemplate, Element, ElementTemplate, ItemTree};
use crate::state::StateTree;
use crate::value::RuntimeValue;

/// Materializes one `ElementTemplate` into a fresh, unparented `Element`
/// inserted into `tree`. Nested child templates are materialized too (for
/// `@if`, immediately; `@for` templates a second level down are collapsed by
/// the reader, see `reader::only_elements`, so this never recurses into one).
fn materialize(tree: &mut ItemTree, parent: Option<crate::item_tree::ElementId>, template: &ElementTemplate) -> crate::item_tree::ElementId {
    let mut element = Element::new(0, template.type_code);
    element.parent = parent;
    element.user_id = template.user_id.clone();
    element.properties = template.properties.iter().cloned().collect();
    let id = tree.insert(element);

    let mut children = Vec::with_capacity(template.children.len());
    for child in &template.children {
        children.push(match child {
            crate::item_tree::ChildSlotTemplate::Element(t) => ChildSlot::Element(materialize(tree, Some(id), t)),
            crate::item_tree::ChildSlotTemplate::Template(t) => ChildSlot::Template { template: t.clone(), materialized: Vec::new() },
        });
    }
    tree.get_mut(id).expect("just inserted").children = children;
    id
}

fn destroy_subtree(tree: &mut ItemTree, id: crate::item_tree::ElementId) {
    let children: Vec<_> = tree.get(id).map(|e| e.element_children().collect()).unwrap_or_default();
    for child in children {
        destroy_subtree(tree, child);
    }
    if let Some(el) = tree.get_mut(id) {
        el.lifecycle = crate::item_tree::Lifecycle::Destroyed;
    }
}

/// Regenerates a `@for` body bound under `parent`, destroying `existing`
/// (the previous materialization, if any) and returning the freshly
/// materialized ids that should replace it in the slot's `materialized` list.
pub fn regenerate_for(
    tree: &mut ItemTree,
    parent: crate::item_tree::ElementId,
    var_name: &str,
    iterable: &kryon_krb::ExprNode,
    body: &[ElementTemplate],
    existing: &[crate::item_tree::ElementId],
    state: &StateTree,
    strings: &[String],
    instance_prefix: Option<&str>,
) -> Vec<crate::item_tree::ElementId> {
    let scope = Scope::new(state, instance_prefix);
    let collection = eval(iterable, &scope, strings);
    let items = match collection {
        RuntimeValue::Array(items) => items,
        _ => Vec::new(),
    };

    // Every item is rematerialized rather than patched in place: simpler than
    // per-property diffing, and still correct since regeneration only runs
    // during the update phase. Old elements are always fully destroyed first
    // so overlap-range identities never leak as unreferenced arena entries.
    let new_len = items.len() * body.len();
    for &old in existing {
        destroy_subtree(tree, old);
    }

    let mut new_ids = Vec::with_capacity(new_len);
    for item in &items {
        let item_scope = Scope::new(state, instance_prefix).with_local(var_name, item.clone());
        for template in body {
            let bound = bind_locals(template, &item_scope, strings);
            let id = materialize(tree, Some(parent), &bound);
            if let Some(el) = tree.get_mut(id) {
                el.dirty.position = true;
            }
            new_ids.push(id);
        }
    }
    new_ids
}

/// Substitutes `$var` references inside property values with their bound
/// value before materializing, so the cloned element carries a concrete
/// value rather than an expression that would need the loop scope to
/// outlive it.
fn bind_locals(template: &ElementTemplate, scope: &Scope, strings: &[String]) -> ElementTemplate {
    let mut out = template.clone();
    for (_, value) in out.properties.iter_mut() {
        if let RuntimeValue::Expr(node) = value {
            *value = eval(node, scope, strings);
        }
    }
    out.children = out
        .children
        .into_iter()
        .map(|c| match c {
            crate::item_tree::ChildSlotTemplate::Element(t) => {
                crate::item_tree::ChildSlotTemplate::Element(bind_locals(&t, scope, strings))
            }
            other => other,
        })
        .collect();
    out
}

/// Evaluates an `@if` condition and materializes/destroys its subtree as it
/// flips. `existing` is the previously materialized root, if any.
pub fn regenerate_if(
    tree: &mut ItemTree,
    parent: crate::item_tree::ElementId,
    condition: &kryon_krb::ExprNode,
    then_body: &[ElementTemplate],
    else_body: &[ElementTemplate],
    existing: &[crate::item_tree::ElementId],
    state: &StateTree,
    strings: &[String],
    instance_prefix: Option<&str>,
) -> Vec<crate::item_tree::ElementId> {
    let scope = Scope::new(state, instance_prefix);
    let taken = eval(condition, &scope, strings).as_bool();
    for &old in existing {
        destroy_subtree(tree, old);
    }
    let body = if taken { then_body } else { else_body };
    body.iter().map(|t| materialize(tree, Some(parent), t)).collect()
}

/// Regenerates every live `@for`/`@if` template slot anywhere under `root`
/// (§4.H update phase). Called once per update tick, after state mutations
/// from the current batch have all landed. Each slot keeps its position in
/// its parent's children vector; only its `materialized` list is replaced.
pub fn update_directives(tree: &mut ItemTree, root: crate::item_tree::ElementId, state: &StateTree, strings: &[String]) {
    let ids: Vec<_> = tree.pre_order(root);
    for id in ids {
        let Some(el) = tree.get(id) else { continue };
        let instance_prefix = el.component_instance.clone();
        let slots: Vec<(usize, ChildTemplate, Vec<crate::item_tree::ElementId>)> = el
            .children
            .iter()
            .enumerate()
            .filter_map(|(i, c)| match c {
                ChildSlot::Template { template, materialized } => Some((i, template.clone(), materialized.clone())),
                ChildSlot::Element(_) => None,
            })
            .collect();
        if slots.is_empty() {
            continue;
        }
        for (index, template, existing) in slots {
            let new_ids = match &template {
                ChildTemplate::For { var_name, iterable, body, .. } => {
                    regenerate_for(tree, id, var_name, iterable, body, &existing, state, strings, instance_prefix.as_deref())
                }
                ChildTemplate::If { condition, then_body, else_body } => {
                    regenerate_if(tree, id, condition, then_body, else_body, &existing, state, strings, instance_prefix.as_deref())
                }
            };
            if let Some(el) = tree.get_mut(id) {
                if let Some(ChildSlot::Template { materialized, .. }) = el.children.get_mut(index) {
                    *materialized = new_ids;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item_tree::{ChildSlotTemplate, ElementTemplate};
    use kryon_krb::{ElementTypeCode, ExprNode};

    fn text_template() -> ElementTemplate {
        ElementTemplate { type_code: ElementTypeCode::Text, user_id: None, properties: vec![], children: vec![] }
    }

    #[test]
    fn for_loop_materializes_one_element_per_item() {
        let mut tree = ItemTree::new();
        let parent = tree.insert(Element::new(0, ElementTypeCode::Column));
        let mut state = StateTree::new();
        state.seed("items", RuntimeValue::Array(vec![RuntimeValue::String("a".into()), RuntimeValue::String("b".into())]));
        let strings: Vec<String> = vec!["items".into()];
        let ids = regenerate_for(&mut tree, parent, "item", &ExprNode::Var(0), &[text_template()], &[], &state, &strings, None);
        assert_eq!(ids.len(), 2);
    }

    #[test]
    fn growing_the_collection_adds_children() {
        let mut tree = ItemTree::new();
        let parent = tree.insert(Element::new(0, ElementTypeCode::Column));
        let mut state = StateTree::new();
        state.seed("items", RuntimeValue::Array(vec![RuntimeValue::String("a".into()), RuntimeValue::String("b".into())]));
        let strings: Vec<String> = vec!["items".into()];
        let first = regenerate_for(&mut tree, parent, "item", &ExprNode::Var(0), &[text_template()], &[], &state, &strings, None);
        assert_eq!(first.len(), 2);
        state.seed("items", RuntimeValue::Array(vec![
            RuntimeValue::String("a".into()),
            RuntimeValue::String("b".into()),
            RuntimeValue::String("c".into()),
        ]));
        let second = regenerate_for(&mut tree, parent, "item", &ExprNode::Var(0), &[text_template()], &first, &state, &strings, None);
        assert_eq!(second.len(), 3);
    }

    #[test]
    fn if_false_materializes_else_body() {
        let mut tree = ItemTree::new();
        let parent = tree.insert(Element::new(0, ElementTypeCode::Column));
        let state = StateTree::new();
        let condition = ExprNode::Literal(kryon_krb::ExprLiteral::Bool(false));
        let ids = regenerate_if(&mut tree, parent, &condition, &[], &[text_template()], &[], &state, &[], None);
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn unused_child_slot_template_variant_is_exercised() {
        let t = ChildSlotTemplate::Template(ChildTemplate::If {
            condition: ExprNode::Literal(kryon_krb::ExprLiteral::Bool(true)),
            then_body: vec![],
            else_body: vec![],
        });
        assert!(matches!(t, ChildSlotTemplate::Template(_)));
    }
}
