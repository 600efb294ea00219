//! Expansion pass (§4.C): resolves `@include`, inlines component instances
//! with parameter substitution, merges inheritance, and (opt-in) unrolls
//! `@for`/`@const_for` over a `@const`-bound array.

use crate::ast::{Child, ComponentDef, Document, Element, ForLoop, Item, Property, PropertyValue, TemplateSegment};
use crate::diagnostics::{Diagnostics, SourceLocation};
use crate::error::ExpansionError;
use crate::expr::{Expr, ExprKind, Literal};
use crate::options::ExpansionFlags;
use smol_str::SmolStr;
use std::collections::HashMap;
use std::path::PathBuf;

/// Loads the contents of an `@include`d path. The core never touches the
/// filesystem directly outside this seam, so callers can serve includes from
/// memory (tests, a virtual filesystem) instead of disk.
pub trait IncludeResolver {
    fn resolve(&self, path: &str) -> std::io::Result<String>;
}

pub struct FsIncludeResolver;

impl IncludeResolver for FsIncludeResolver {
    fn resolve(&self, path: &str) -> std::io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// One component instance's private reactive state, keyed by a dotted
/// `<instance-id>.<state-name>` address so the runtime's state tree (§4.G)
/// can address it the same way it addresses any other path. Component
/// *props* are pure compile-time customization and get inlined as literal
/// values; state is mutable at runtime by definition, so its bindings are
/// left as `PropertyValue::Variable(address)` in the expanded template
/// instead of being baked in, and its initial values are collected here for
/// the code generator's variable section (§4.E).
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceState {
    pub address: SmolStr,
    pub initial: PropertyValue,
}

/// Runs the expansion pass over a parsed document, returning the
/// post-expansion AST, any non-fatal diagnostics gathered along the way, and
/// the per-instance state table every component instantiation contributed to.
/// `needs_expansion` is `false` on the returned document whenever
/// `expand_includes`/`expand_components` are both enabled.
pub fn expand(
    doc: &Document,
    flags: &ExpansionFlags,
    resolver: &dyn IncludeResolver,
) -> Result<(Document, Diagnostics, Vec<InstanceState>), ExpansionError> {
    let mut diags = Diagnostics::new();
    let mut items = doc.items.clone();

    if flags.validate_before {
        validate_before(&items, &mut diags);
    }

    if flags.expand_includes {
        items = resolve_includes(items, resolver, flags.max_depth, &mut Vec::new(), &mut diags)?;
    }

    let consts = collect_consts(&items);
    let mut instance_states = Vec::new();

    if flags.expand_components {
        let components = collect_components(&items, flags)?;
        let mut ctx = Ctx {
            components: &components,
            flags,
            consts: &consts,
            diags: &mut diags,
            instance_states: &mut instance_states,
            anon_counter: &mut 0,
        };
        items = items.into_iter().map(|item| expand_item(item, &mut ctx)).collect();
        if !flags.preserve_definitions {
            items.retain(|item| !matches!(item, Item::Component(_)));
        }
    }

    let result = Document { items, location: doc.location.clone() };
    if flags.validate_after {
        validate_after(&result, &mut diags);
    }

    Ok((result, diags, instance_states))
}

/// Catches structural issues that expansion itself wouldn't otherwise flag,
/// ahead of time. Currently: a `Slot` used outside a `@component` template
/// is never replaced by `splice_slot` and survives into the output verbatim.
fn validate_before(items: &[Item], diags: &mut Diagnostics) {
    for item in items {
        match item {
            Item::Element(e) => validate_slot_placement(e, false, diags),
            Item::Component(c) => validate_slot_placement(&c.template, true, diags),
            _ => {}
        }
    }
}

fn validate_slot_placement(el: &Element, inside_template: bool, diags: &mut Diagnostics) {
    if el.type_name == "Slot" && !inside_template {
        diags.warning("`Slot` has no effect outside a `@component` template".to_string(), el.location.clone());
    }
    for child in &el.children {
        validate_slot_placement_child(child, inside_template, diags);
    }
}

fn validate_slot_placement_child(child: &Child, inside_template: bool, diags: &mut Diagnostics) {
    match child {
        Child::Element(e) => validate_slot_placement(e, inside_template, diags),
        Child::For(f) => f.body.iter().for_each(|c| validate_slot_placement_child(c, inside_template, diags)),
        Child::If(ib) => {
            ib.then_body.iter().for_each(|c| validate_slot_placement_child(c, inside_template, diags));
            if let Some(body) = &ib.else_body {
                body.iter().for_each(|c| validate_slot_placement_child(c, inside_template, diags));
            }
        }
    }
}

/// Catches issues only visible once expansion has produced the final tree.
/// Currently: two elements sharing an `id` would have their component state
/// addressed at the same dotted path, silently colliding in the state tree.
fn validate_after(doc: &Document, diags: &mut Diagnostics) {
    let mut seen: HashMap<SmolStr, SourceLocation> = HashMap::new();
    for item in &doc.items {
        if let Item::Element(e) = item {
            check_duplicate_ids(e, &mut seen, diags);
        }
    }
}

fn check_duplicate_ids(el: &Element, seen: &mut HashMap<SmolStr, SourceLocation>, diags: &mut Diagnostics) {
    if let Some(id) = el.id() {
        let id = SmolStr::new(id);
        if seen.contains_key(&id) {
            diags.warning(format!("duplicate element id `{id}`; state addressed by this id will collide"), el.location.clone());
        } else {
            seen.insert(id, el.location.clone());
        }
    }
    for child in &el.children {
        check_duplicate_ids_child(child, seen, diags);
    }
}

fn check_duplicate_ids_child(child: &Child, seen: &mut HashMap<SmolStr, SourceLocation>, diags: &mut Diagnostics) {
    match child {
        Child::Element(e) => check_duplicate_ids(e, seen, diags),
        Child::For(f) => f.body.iter().for_each(|c| check_duplicate_ids_child(c, seen, diags)),
        Child::If(ib) => {
            ib.then_body.iter().for_each(|c| check_duplicate_ids_child(c, seen, diags));
            if let Some(body) = &ib.else_body {
                body.iter().for_each(|c| check_duplicate_ids_child(c, seen, diags));
            }
        }
    }
}

/// `true` iff `doc` still contains something a second expansion pass would
/// have to act on (§4.C output invariant).
pub fn needs_expansion(doc: &Document) -> bool {
    doc.items.iter().any(|item| matches!(item, Item::Include(_)))
}

fn resolve_includes(
    items: Vec<Item>,
    resolver: &dyn IncludeResolver,
    max_depth: u32,
    stack: &mut Vec<String>,
    diags: &mut Diagnostics,
) -> Result<Vec<Item>, ExpansionError> {
    let mut out = Vec::new();
    for item in items {
        match item {
            Item::Include(inc) => {
                let path = inc.path.to_string();
                if stack.len() as u32 >= max_depth {
                    return Err(ExpansionError::IncludeDepthExceeded { path, max: max_depth });
                }
                if stack.contains(&path) {
                    return Err(ExpansionError::IncludeCycle(path));
                }
                let source =
                    resolver.resolve(&path).map_err(|source| ExpansionError::Io { path: path.clone(), source })?;
                let (included, parse_diags) = crate::parser::parse(&source, Some(PathBuf::from(&path)));
                diags.extend(parse_diags);
                stack.push(path);
                let nested = resolve_includes(included.items, resolver, max_depth, stack, diags)?;
                stack.pop();
                out.extend(nested);
            }
            other => out.push(other),
        }
    }
    Ok(out)
}

fn collect_consts(items: &[Item]) -> HashMap<SmolStr, PropertyValue> {
    let mut map = HashMap::new();
    for item in items {
        match item {
            Item::Const(c) => {
                map.insert(c.name.clone(), c.value.clone());
            }
            Item::Variables(v) => {
                for entry in &v.entries {
                    map.insert(entry.name.clone(), entry.value.clone());
                }
            }
            _ => {}
        }
    }
    map
}

fn collect_components(
    items: &[Item],
    flags: &ExpansionFlags,
) -> Result<HashMap<SmolStr, ComponentDef>, ExpansionError> {
    let raw: HashMap<SmolStr, &ComponentDef> = items
        .iter()
        .filter_map(|item| match item {
            Item::Component(c) => Some((c.name.clone(), c)),
            _ => None,
        })
        .collect();
    let mut resolved = HashMap::new();
    let names: Vec<SmolStr> = raw.keys().cloned().collect();
    for name in names {
        resolve_component(&name, &raw, &mut resolved, &mut Vec::new(), flags)?;
    }
    Ok(resolved)
}

fn resolve_component(
    name: &SmolStr,
    raw: &HashMap<SmolStr, &ComponentDef>,
    resolved: &mut HashMap<SmolStr, ComponentDef>,
    stack: &mut Vec<SmolStr>,
    flags: &ExpansionFlags,
) -> Result<ComponentDef, ExpansionError> {
    if let Some(existing) = resolved.get(name) {
        return Ok(existing.clone());
    }
    if stack.contains(name) {
        return Err(ExpansionError::InheritanceCycle(name.to_string()));
    }
    let def = *raw.get(name).ok_or_else(|| ExpansionError::UnknownComponent(name.to_string()))?;
    let merged = match (&def.extends, flags.resolve_inheritance) {
        (Some(base_name), true) => {
            stack.push(name.clone());
            let base = resolve_component(base_name, raw, resolved, stack, flags)?;
            stack.pop();
            merge_component(&base, def)
        }
        _ => def.clone(),
    };
    resolved.insert(name.clone(), merged.clone());
    Ok(merged)
}

/// Parent properties appear first, child properties override by name (§4.C).
fn merge_component(base: &ComponentDef, child: &ComponentDef) -> ComponentDef {
    let props = merge_by_name(&base.props, &child.props, |p| p.name.clone());
    let state = merge_by_name(&base.state, &child.state, |s| s.name.clone());

    let mut template = child.template.clone();
    template.properties = merge_by_name(&base.template.properties, &child.template.properties, |p| p.name.clone());
    if template.children.is_empty() {
        template.children = base.template.children.clone();
    }

    let mut slots = base.slots.clone();
    for s in &child.slots {
        if !slots.contains(s) {
            slots.push(s.clone());
        }
    }
    let mut functions = base.functions.clone();
    functions.extend(child.functions.iter().cloned());
    let mut lifecycle = base.lifecycle.clone();
    lifecycle.extend(child.lifecycle.iter().cloned());

    ComponentDef {
        name: child.name.clone(),
        extends: child.extends.clone(),
        props,
        slots,
        state,
        functions,
        lifecycle,
        template,
        location: child.location.clone(),
    }
}

fn merge_by_name<T: Clone>(base: &[T], overrides: &[T], key: impl Fn(&T) -> SmolStr) -> Vec<T> {
    let mut out = base.to_vec();
    for item in overrides {
        let k = key(item);
        if let Some(existing) = out.iter_mut().find(|e| key(e) == k) {
            *existing = item.clone();
        } else {
            out.push(item.clone());
        }
    }
    out
}

/// Bundles everything the per-element expansion walk needs so its functions
/// don't have to grow a parameter every time one of them needs more context.
struct Ctx<'a> {
    components: &'a HashMap<SmolStr, ComponentDef>,
    flags: &'a ExpansionFlags,
    consts: &'a HashMap<SmolStr, PropertyValue>,
    diags: &'a mut Diagnostics,
    instance_states: &'a mut Vec<InstanceState>,
    anon_counter: &'a mut u32,
}

fn expand_item(item: Item, ctx: &mut Ctx) -> Item {
    match item {
        Item::Element(e) => Item::Element(expand_element(e, ctx)),
        other => other,
    }
}

fn expand_element(e: Element, ctx: &mut Ctx) -> Element {
    let mut result = match ctx.components.get(&e.type_name) {
        Some(def) => instantiate_component(&def.clone(), &e, ctx),
        None => e,
    };
    result.children = result.children.into_iter().flat_map(|c| expand_child(c, ctx)).collect();
    result
}

fn expand_child(child: Child, ctx: &mut Ctx) -> Vec<Child> {
    match child {
        Child::Element(e) => vec![Child::Element(expand_element(e, ctx))],
        Child::If(mut ib) => {
            ib.then_body = ib.then_body.into_iter().flat_map(|c| expand_child(c, ctx)).collect();
            ib.else_body = ib.else_body.map(|body| body.into_iter().flat_map(|c| expand_child(c, ctx)).collect());
            vec![Child::If(ib)]
        }
        Child::For(fl) => expand_for(fl, ctx),
    }
}

fn expand_for(fl: ForLoop, ctx: &mut Ctx) -> Vec<Child> {
    let should_fold = fl.is_const || ctx.flags.fold_const_for;
    if should_fold {
        if let Some(items) = const_array_for(&fl, ctx.consts) {
            let mut out = Vec::new();
            for (index, item_value) in items.iter().enumerate() {
                for body_child in &fl.body {
                    let mut substituted = substitute_child(body_child.clone(), &fl.var_name, item_value);
                    if ctx.flags.add_expansion_metadata {
                        annotate_unrolled(&mut substituted, &fl.var_name, index);
                    }
                    out.extend(expand_child(substituted, ctx));
                }
            }
            return out;
        }
        if fl.is_const {
            ctx.diags.warning(
                format!("`@const_for` over `${}` could not be constant-folded: not bound to a `@const` array", fl.var_name),
                fl.location.clone(),
            );
        }
    }
    let mut fl = fl;
    fl.body = fl.body.into_iter().flat_map(|c| expand_child(c, ctx)).collect();
    vec![Child::For(fl)]
}

fn const_array_for(fl: &ForLoop, consts: &HashMap<SmolStr, PropertyValue>) -> Option<Vec<PropertyValue>> {
    match &fl.iterable.kind {
        ExprKind::Variable(name) => match consts.get(name) {
            Some(PropertyValue::Array(items)) => Some(items.clone()),
            _ => None,
        },
        _ => None,
    }
}

/// Inlines one component instance: binds `instance`'s properties over the
/// template (falling back to prop defaults), leaves state bindings as
/// runtime-addressable variable references rooted at the instance's id, and
/// splices the instance's own children into a `Slot` placeholder if present.
fn instantiate_component(def: &ComponentDef, instance: &Element, ctx: &mut Ctx) -> Element {
    let instance_id = instance.id().map(SmolStr::new).unwrap_or_else(|| {
        *ctx.anon_counter += 1;
        SmolStr::new(format!("__anon{}", *ctx.anon_counter))
    });

    let mut bindings: HashMap<SmolStr, PropertyValue> = HashMap::new();
    for param in &def.props {
        let value = instance
            .properties
            .iter()
            .find(|p| p.name == param.name)
            .map(|p| p.value.clone())
            .or_else(|| param.default.clone());
        match value {
            Some(v) => {
                bindings.insert(param.name.clone(), v);
            }
            None => ctx.diags.warning(
                format!("component `{}` instantiated without required prop `{}`", def.name, param.name),
                instance.location.clone(),
            ),
        }
    }
    for state_var in &def.state {
        let address = SmolStr::new(format!("{instance_id}.{}", state_var.name));
        ctx.instance_states.push(InstanceState { address: address.clone(), initial: state_var.initial.clone() });
        bindings.insert(state_var.name.clone(), PropertyValue::Variable(address));
    }

    let mut root = def.template.clone();
    for (name, value) in &bindings {
        root = substitute_element(root, name, value);
    }
    if !instance.children.is_empty() {
        root = splice_slot(root, &instance.children);
    }
    if root.properties.iter().all(|p| p.name != "id") {
        root.properties.push(Property {
            name: "id".into(),
            value: PropertyValue::String(instance_id.clone()),
            location: instance.location.clone(),
        });
    }
    if ctx.flags.add_expansion_metadata {
        root.expansion_note = Some(SmolStr::new(format!("expanded from component `{}` (instance `{instance_id}`)", def.name)));
    }
    root
}

/// Replaces every `Slot` placeholder element with the instance's own
/// children, so a component can project caller content into its template.
fn splice_slot(mut el: Element, content: &[Child]) -> Element {
    let mut new_children = Vec::with_capacity(el.children.len());
    for child in el.children {
        match child {
            Child::Element(inner) if inner.type_name == "Slot" => new_children.extend(content.iter().cloned()),
            Child::Element(inner) => new_children.push(Child::Element(splice_slot(inner, content))),
            other => new_children.push(other),
        }
    }
    el.children = new_children;
    el
}

fn substitute_element(mut el: Element, name: &str, value: &PropertyValue) -> Element {
    for prop in &mut el.properties {
        prop.value = substitute_property_value(std::mem::replace(&mut prop.value, PropertyValue::Null), name, value);
    }
    el.children = el.children.into_iter().map(|c| substitute_child(c, name, value)).collect();
    el
}

fn substitute_child(child: Child, name: &str, value: &PropertyValue) -> Child {
    match child {
        Child::Element(e) => Child::Element(substitute_element(e, name, value)),
        Child::For(mut fl) => {
            fl.iterable = substitute_expr(fl.iterable, name, value);
            fl.body = fl.body.into_iter().map(|c| substitute_child(c, name, value)).collect();
            Child::For(fl)
        }
        Child::If(mut ib) => {
            ib.condition = substitute_expr(ib.condition, name, value);
            ib.then_body = ib.then_body.into_iter().map(|c| substitute_child(c, name, value)).collect();
            ib.else_body = ib.else_body.map(|body| body.into_iter().map(|c| substitute_child(c, name, value)).collect());
            Child::If(ib)
        }
    }
}

/// Tags the root element of one `@for`/`@const_for` unroll iteration with
/// which iteration produced it (§4.C expansion metadata).
fn annotate_unrolled(child: &mut Child, var_name: &str, index: usize) {
    if let Child::Element(e) = child {
        e.expansion_note = Some(SmolStr::new(format!("unrolled from `@for ${var_name}` iteration {index}")));
    }
}

fn substitute_property_value(pv: PropertyValue, name: &str, value: &PropertyValue) -> PropertyValue {
    match pv {
        PropertyValue::Variable(v) if v == name => value.clone(),
        PropertyValue::Template(segments) => {
            PropertyValue::Template(segments.into_iter().map(|s| substitute_template_segment(s, name, value)).collect())
        }
        PropertyValue::Array(items) => {
            PropertyValue::Array(items.into_iter().map(|v| substitute_property_value(v, name, value)).collect())
        }
        PropertyValue::Expr(e) => simplify_expr(substitute_expr(e, name, value)),
        other => other,
    }
}

fn substitute_template_segment(seg: TemplateSegment, name: &str, value: &PropertyValue) -> TemplateSegment {
    match seg {
        TemplateSegment::Variable(v) if v == name => match value {
            PropertyValue::String(s) => TemplateSegment::Literal(s.clone()),
            PropertyValue::Number(n) => TemplateSegment::Literal(SmolStr::new(n.to_string())),
            PropertyValue::Bool(b) => TemplateSegment::Literal(SmolStr::new(b.to_string())),
            other => TemplateSegment::Expr(property_value_to_expr(other)),
        },
        TemplateSegment::Expr(e) => TemplateSegment::Expr(substitute_expr(e, name, value)),
        other => other,
    }
}

fn substitute_expr(expr: Expr, name: &str, value: &PropertyValue) -> Expr {
    let location = expr.location.clone();
    let kind = match expr.kind {
        ExprKind::Variable(v) if v == name => return property_value_to_expr_at(value, location),
        ExprKind::Unary(op, inner) => ExprKind::Unary(op, Box::new(substitute_expr(*inner, name, value))),
        ExprKind::Binary(op, lhs, rhs) => {
            ExprKind::Binary(op, Box::new(substitute_expr(*lhs, name, value)), Box::new(substitute_expr(*rhs, name, value)))
        }
        ExprKind::Ternary(c, a, b) => ExprKind::Ternary(
            Box::new(substitute_expr(*c, name, value)),
            Box::new(substitute_expr(*a, name, value)),
            Box::new(substitute_expr(*b, name, value)),
        ),
        other => other,
    };
    Expr::new(kind, location)
}

fn property_value_to_expr(value: &PropertyValue) -> Expr {
    property_value_to_expr_at(value, crate::diagnostics::SourceLocation {
        file: crate::diagnostics::anonymous_source_file(""),
        span: crate::diagnostics::Span::default(),
    })
}

fn property_value_to_expr_at(value: &PropertyValue, location: crate::diagnostics::SourceLocation) -> Expr {
    let kind = match value {
        PropertyValue::Null => ExprKind::Literal(Literal::Null),
        PropertyValue::Bool(b) => ExprKind::Literal(Literal::Bool(*b)),
        PropertyValue::Number(n) => ExprKind::Literal(Literal::Number(*n)),
        PropertyValue::Dimension(n, _) => ExprKind::Literal(Literal::Number(*n)),
        PropertyValue::String(s) => ExprKind::Literal(Literal::String(s.clone())),
        PropertyValue::Variable(v) => ExprKind::Variable(v.clone()),
        PropertyValue::Expr(e) => e.kind.clone(),
        // Not representable as a scalar literal; leave a null placeholder
        // rather than silently dropping the substitution.
        _ => ExprKind::Literal(Literal::Null),
    };
    Expr::new(kind, location)
}

/// Collapses a substituted expression back to a plain value when it reduced
/// to a bare literal, mirroring the parser's own simplification.
fn simplify_expr(expr: Expr) -> PropertyValue {
    match expr.kind {
        ExprKind::Literal(Literal::Null) => PropertyValue::Null,
        ExprKind::Literal(Literal::Bool(b)) => PropertyValue::Bool(b),
        ExprKind::Literal(Literal::Number(n)) => PropertyValue::Number(n),
        ExprKind::Literal(Literal::String(s)) => PropertyValue::String(s),
        ExprKind::Variable(v) => PropertyValue::Variable(v),
        _ => PropertyValue::Expr(expr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Item;
    use std::cell::RefCell;
    use std::collections::HashMap as StdHashMap;

    struct MapResolver(RefCell<StdHashMap<String, String>>);

    impl IncludeResolver for MapResolver {
        fn resolve(&self, path: &str) -> std::io::Result<String> {
            self.0
                .borrow()
                .get(path)
                .cloned()
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, path.to_string()))
        }
    }

    fn resolver(entries: &[(&str, &str)]) -> MapResolver {
        MapResolver(RefCell::new(entries.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()))
    }

    #[test]
    fn spec_scenario_three_component_instance_expands_with_bound_prop() {
        let (doc, diags) = crate::parser::parse(
            r#"
            @component Counter {
                @props { label: "n/a" }
                Text { text: $label; }
            }
            Counter { label: "7"; }
            "#,
            None,
        );
        assert!(diags.is_empty(), "{diags}");
        let (expanded, diags, instance_states) = expand(&doc, &ExpansionFlags::default(), &resolver(&[])).unwrap();
        assert!(diags.is_empty(), "{diags}");
        assert!(instance_states.is_empty());
        assert!(!needs_expansion(&expanded));
        assert!(!expanded.items.iter().any(|i| matches!(i, Item::Component(_))));
        let Item::Element(text) = &expanded.items[0] else { panic!("expected the expanded Text element") };
        assert_eq!(text.type_name, "Text");
        assert_eq!(text.properties[0].value, PropertyValue::String("7".into()));
    }

    #[test]
    fn component_state_stays_a_runtime_address_instead_of_being_inlined() {
        let (doc, diags) = crate::parser::parse(
            r#"
            @component Counter {
                @state { count: 0 }
                Text { text: $count; }
            }
            Counter { id: "c1"; }
            "#,
            None,
        );
        assert!(diags.is_empty(), "{diags}");
        let (expanded, diags, instance_states) = expand(&doc, &ExpansionFlags::default(), &resolver(&[])).unwrap();
        assert!(diags.is_empty(), "{diags}");
        assert_eq!(instance_states, vec![InstanceState { address: "c1.count".into(), initial: PropertyValue::Number(0.0) }]);
        let Item::Element(text) = &expanded.items[0] else { panic!() };
        assert_eq!(text.properties[0].value, PropertyValue::Variable("c1.count".into()));
    }

    #[test]
    fn include_is_inlined_and_cycle_is_rejected() {
        let (doc, diags) = crate::parser::parse(r#"@include "shared.kry";"#, None);
        assert!(diags.is_empty(), "{diags}");
        let res = resolver(&[("shared.kry", r#"Text { text: "from include"; }"#)]);
        let (expanded, diags, _) = expand(&doc, &ExpansionFlags::default(), &res).unwrap();
        assert!(diags.is_empty(), "{diags}");
        assert_eq!(expanded.items.len(), 1);
        assert!(matches!(expanded.items[0], Item::Element(_)));

        let (doc, _) = crate::parser::parse(r#"@include "a.kry";"#, None);
        let cyclic = resolver(&[("a.kry", r#"@include "a.kry";"#)]);
        let err = expand(&doc, &ExpansionFlags::default(), &cyclic).unwrap_err();
        assert!(matches!(err, ExpansionError::IncludeCycle(_)));
    }

    #[test]
    fn inheritance_merges_parent_then_overrides_by_child() {
        let (doc, diags) = crate::parser::parse(
            r#"
            @component Base {
                @props { label: "base" }
                Button { text: $label; enabled: true; }
            }
            @component Primary extends Base {
                @props { label: "primary" }
            }
            Primary {}
            "#,
            None,
        );
        assert!(diags.is_empty(), "{diags}");
        let (expanded, diags, _) = expand(&doc, &ExpansionFlags::default(), &resolver(&[])).unwrap();
        assert!(diags.is_empty(), "{diags}");
        let Item::Element(button) = &expanded.items[0] else { panic!() };
        assert_eq!(button.properties.iter().find(|p| p.name == "text").unwrap().value, PropertyValue::String("primary".into()));
        assert!(button.properties.iter().any(|p| p.name == "enabled"));
    }

    #[test]
    fn const_for_unrolls_over_a_const_bound_array() {
        let (doc, diags) = crate::parser::parse(
            r#"
            @const ITEMS = ["a", "b", "c"];
            Column {
                @const_for $item in $ITEMS {
                    Text { text: $item; }
                }
            }
            "#,
            None,
        );
        assert!(diags.is_empty(), "{diags}");
        let (expanded, diags, _) = expand(&doc, &ExpansionFlags::default(), &resolver(&[])).unwrap();
        assert!(diags.is_empty(), "{diags}");
        let Item::Element(col) = &expanded.items[0] else { panic!() };
        assert_eq!(col.children.len(), 3);
        for (child, expected) in col.children.iter().zip(["a", "b", "c"]) {
            let Child::Element(text) = child else { panic!() };
            assert_eq!(text.properties[0].value, PropertyValue::String(expected.into()));
        }
    }

    #[test]
    fn expansion_metadata_is_off_by_default_and_on_when_requested() {
        let (doc, diags) = crate::parser::parse(
            r#"
            @component Counter {
                @props { label: "n/a" }
                Text { text: $label; }
            }
            Counter { label: "7"; }
            "#,
            None,
        );
        assert!(diags.is_empty(), "{diags}");

        let (expanded, _, _) = expand(&doc, &ExpansionFlags::default(), &resolver(&[])).unwrap();
        let Item::Element(text) = &expanded.items[0] else { panic!() };
        assert_eq!(text.expansion_note, None);

        let flags = ExpansionFlags { add_expansion_metadata: true, ..Default::default() };
        let (expanded, _, _) = expand(&doc, &flags, &resolver(&[])).unwrap();
        let Item::Element(text) = &expanded.items[0] else { panic!() };
        assert!(text.expansion_note.as_deref().unwrap().contains("Counter"));
    }

    #[test]
    fn expansion_metadata_tags_const_for_unroll_iterations() {
        let (doc, diags) = crate::parser::parse(
            r#"
            @const ITEMS = ["a", "b"];
            Column {
                @const_for $item in $ITEMS {
                    Text { text: $item; }
                }
            }
            "#,
            None,
        );
        assert!(diags.is_empty(), "{diags}");
        let flags = ExpansionFlags { add_expansion_metadata: true, ..Default::default() };
        let (expanded, _, _) = expand(&doc, &flags, &resolver(&[])).unwrap();
        let Item::Element(col) = &expanded.items[0] else { panic!() };
        let Child::Element(first) = &col.children[0] else { panic!() };
        assert!(first.expansion_note.as_deref().unwrap().contains("iteration 0"));
    }

    #[test]
    fn validate_before_warns_on_slot_outside_a_component_template() {
        let (doc, diags) = crate::parser::parse(r#"Column { Slot {} }"#, None);
        assert!(diags.is_empty(), "{diags}");
        let flags = ExpansionFlags { validate_before: true, ..Default::default() };
        let (_, diags, _) = expand(&doc, &flags, &resolver(&[])).unwrap();
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn validate_after_warns_on_duplicate_ids() {
        let (doc, diags) = crate::parser::parse(r#"Column { Text { id: "dup"; } Text { id: "dup"; } }"#, None);
        assert!(diags.is_empty(), "{diags}");
        let flags = ExpansionFlags { validate_after: true, ..Default::default() };
        let (_, diags, _) = expand(&doc, &flags, &resolver(&[])).unwrap();
        assert_eq!(diags.len(), 1);
    }
}
