//! The runtime element graph (§3 "Element (runtime)"). Parent ownership
//! flows one way: a parent's `children` vector owns its child ids, and a
//! child's `parent` field is a plain back-reference index into the same
//! arena, never a smart pointer — so there is no ownership cycle to break on
//! teardown (§9 "Back-references without cycles in ownership").

use crate::value::RuntimeValue;
use kryon_krb::{ElementTypeCode, PropertyCode};
use std::collections::HashMap;

pub type ElementId = u32;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Geometry {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub last_x: f32,
    pub last_y: f32,
    pub padding: [f32; 4],
    pub margin: [f32; 4],
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DirtyFlags {
    pub layout: bool,
    pub render: bool,
    pub position: bool,
}

impl DirtyFlags {
    pub fn all() -> Self {
        Self { layout: true, render: true, position: true }
    }
}

/// `CREATED → MOUNTING → MOUNTED → (UPDATING)* → UNMOUNTING → UNMOUNTED → DESTROYED` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Created,
    Mounting,
    Mounted,
    Updating,
    Unmounting,
    Unmounted,
    Destroyed,
}

/// A `@for`/`@if` body that survived to the binary as a runtime template
/// (§4.E/§4.H): not yet materialized into real elements, regenerated by the
/// directive engine whenever its driving state changes.
#[derive(Debug, Clone)]
pub enum ChildTemplate {
    For { var_name: String, iterable: kryon_krb::ExprNode, body: Vec<ElementTemplate>, is_const: bool },
    If { condition: kryon_krb::ExprNode, then_body: Vec<ElementTemplate>, else_body: Vec<ElementTemplate> },
}

/// One child slot as read from an element record: either a concrete element
/// (already materialized into the arena) or a `@for`/`@if` template. A
/// template slot keeps its own position in the children vector permanently
/// (so surrounding siblings never shift) and tracks whichever elements it
/// last materialized, so the directive engine can diff against them on the
/// next regeneration instead of starting over (§4.H).
#[derive(Debug, Clone)]
pub enum ChildSlot {
    Element(ElementId),
    Template { template: ChildTemplate, materialized: Vec<ElementId> },
}

/// The not-yet-materialized shape of one element inside a `@for`/`@if` body,
/// cloned once per loop iteration / condition flip by the directive engine.
#[derive(Debug, Clone)]
pub struct ElementTemplate {
    pub type_code: ElementTypeCode,
    pub user_id: Option<String>,
    pub properties: Vec<(PropertyCode, RuntimeValue)>,
    pub children: Vec<ChildSlotTemplate>,
}

#[derive(Debug, Clone)]
pub enum ChildSlotTemplate {
    Element(ElementTemplate),
    Template(ChildTemplate),
}

#[derive(Debug, Clone)]
pub struct Element {
    pub id: ElementId,
    pub type_code: ElementTypeCode,
    pub user_id: Option<String>,
    pub parent: Option<ElementId>,
    pub children: Vec<ChildSlot>,
    pub properties: HashMap<PropertyCode, RuntimeValue>,
    pub class_names: Vec<String>,
    pub geometry: Geometry,
    pub dirty: DirtyFlags,
    pub lifecycle: Lifecycle,
    pub visible: bool,
    pub enabled: bool,
    pub z_index: i32,
    /// Instance-id prefix used to resolve `$name` against this element's
    /// component-instance state scope (§4.G), if this element was produced
    /// by expanding a component instance.
    pub component_instance: Option<String>,
}

impl Element {
    pub fn new(id: ElementId, type_code: ElementTypeCode) -> Self {
        Self {
            id,
            type_code,
            user_id: None,
            parent: None,
            children: Vec::new(),
            properties: HashMap::new(),
            class_names: Vec::new(),
            geometry: Geometry::default(),
            dirty: DirtyFlags::all(),
            lifecycle: Lifecycle::Created,
            visible: true,
            enabled: true,
            z_index: 0,
            component_instance: None,
        }
    }

    pub fn property(&self, code: PropertyCode) -> Option<&RuntimeValue> {
        self.properties.get(&code)
    }

    /// Direct element children in position order: plain elements plus
    /// whatever each template slot currently has materialized.
    pub fn element_children(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.children.iter().flat_map(|c| match c {
            ChildSlot::Element(id) => std::slice::from_ref(id),
            ChildSlot::Template { materialized, .. } => materialized.as_slice(),
        }.iter().copied())
    }
}

/// Flat arena of every element, indexed by id (§9: indices instead of smart
/// pointers, so parent back-references can never keep a subtree alive).
#[derive(Debug, Default)]
pub struct ItemTree {
    elements: Vec<Element>,
    pub root: Option<ElementId>,
}

impl ItemTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mut element: Element) -> ElementId {
        let id = self.elements.len() as ElementId;
        element.id = id;
        self.elements.push(element);
        id
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id as usize)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(id as usize)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Element> {
        self.elements.iter()
    }

    pub fn find_by_user_id(&self, user_id: &str) -> Option<ElementId> {
        self.elements.iter().find(|e| e.user_id.as_deref() == Some(user_id)).map(|e| e.id)
    }

    /// Depth-first post-order walk starting at `root` (§4.F mount order: leaves mount first).
    pub fn post_order(&self, root: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        self.post_order_into(root, &mut out);
        out
    }

    fn post_order_into(&self, id: ElementId, out: &mut Vec<ElementId>) {
        if let Some(el) = self.get(id) {
            for child in el.element_children().collect::<Vec<_>>() {
                self.post_order_into(child, out);
            }
            out.push(id);
        }
    }

    /// Depth-first pre-order walk, the paint-order traversal render-command
    /// emission uses (§4.J: "pre-order traversal ... determines paint order").
    pub fn pre_order(&self, root: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        self.pre_order_into(root, &mut out);
        out
    }

    fn pre_order_into(&self, id: ElementId, out: &mut Vec<ElementId>) {
        out.push(id);
        if let Some(el) = self.get(id) {
            for child in el.element_children().collect::<Vec<_>>() {
                self.pre_order_into(child, out);
            }
        }
    }
}
