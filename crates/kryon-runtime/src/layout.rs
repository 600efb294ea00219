//! Single-pass layout engine (§4.I): walks the element tree top-down,
//! computing each element's `(x, y, width, height)` from its layout
//! properties, the container rectangle it was given, and its children's
//! intrinsic sizes. Cross-axis alignment and main-axis distribution follow
//! standard flex-style rules.

use crate::item_tree::{ElementId, ItemTree};
use crate::value::{RuntimeValue, Unit};
use kryon_krb::PropertyCode;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LayoutMode {
    Row,
    Column,
    Absolute,
    Stack,
    Grid,
}

impl LayoutMode {
    fn from_name(name: &str) -> Self {
        match name {
            "row" => Self::Row,
            "column" => Self::Column,
            "absolute" => Self::Absolute,
            "grid" => Self::Grid,
            _ => Self::Stack,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Alignment {
    Start,
    Center,
    End,
    Stretch,
}

impl Alignment {
    fn from_name(name: &str) -> Self {
        match name {
            "center" => Self::Center,
            "end" => Self::End,
            "stretch" => Self::Stretch,
            _ => Self::Start,
        }
    }
}

fn prop_f32(tree: &ItemTree, id: ElementId, code: PropertyCode, default: f32) -> f32 {
    tree.get(id).and_then(|e| e.property(code)).map(|v| match v {
        RuntimeValue::Dimension(n, Unit::Px) => *n as f32,
        _ => v.as_f64() as f32,
    }).unwrap_or(default)
}

fn prop_str<'a>(tree: &'a ItemTree, id: ElementId, code: PropertyCode) -> Option<&'a str> {
    tree.get(id).and_then(|e| e.property(code)).and_then(|v| match v {
        RuntimeValue::String(s) => Some(s.as_str()),
        _ => None,
    })
}

fn padding(tree: &ItemTree, id: ElementId) -> [f32; 4] {
    let p = prop_f32(tree, id, PropertyCode::Padding, 0.0);
    [p, p, p, p]
}

/// Runs one full layout pass rooted at `root`, writing geometry directly
/// onto each element and clearing its layout-dirty flag.
pub fn layout(tree: &mut ItemTree, root: ElementId, available_width: f32, available_height: f32) {
    layout_element(tree, root, 0.0, 0.0, available_width, available_height);
}

fn layout_element(tree: &mut ItemTree, id: ElementId, x: f32, y: f32, width: f32, height: f32) {
    let width = resolve_dimension(tree, id, PropertyCode::Width, width);
    let height = resolve_dimension(tree, id, PropertyCode::Height, height);

    if let Some(el) = tree.get_mut(id) {
        el.geometry.last_x = el.geometry.x;
        el.geometry.last_y = el.geometry.y;
        if (el.geometry.x - x).abs() > f32::EPSILON || (el.geometry.y - y).abs() > f32::EPSILON {
            el.dirty.position = true;
        }
        el.geometry.x = x;
        el.geometry.y = y;
        el.geometry.width = width;
        el.geometry.height = height;
        el.dirty.layout = false;
    }

    let mode = prop_str(tree, id, PropertyCode::Layout).map(LayoutMode::from_name).unwrap_or(LayoutMode::Stack);
    let alignment = prop_str(tree, id, PropertyCode::Alignment).map(Alignment::from_name).unwrap_or(Alignment::Start);
    let gap = prop_f32(tree, id, PropertyCode::Gap, 0.0);
    let pad = padding(tree, id);
    let inner_x = x + pad[3];
    let inner_y = y + pad[0];
    let inner_width = (width - pad[1] - pad[3]).max(0.0);
    let inner_height = (height - pad[0] - pad[2]).max(0.0);

    let children: Vec<ElementId> = tree.get(id).map(|e| e.element_children().collect()).unwrap_or_default();
    if children.is_empty() {
        return;
    }

    match mode {
        LayoutMode::Row => layout_main_axis(tree, &children, true, inner_x, inner_y, inner_width, inner_height, gap, alignment),
        LayoutMode::Column => layout_main_axis(tree, &children, false, inner_x, inner_y, inner_width, inner_height, gap, alignment),
        // `absolute` children are positioned by their own explicit x/y in a
        // full implementation; without a dedicated x/y property code yet,
        // this degenerates to stacking them at the container origin, same
        // as `stack`/`grid` (grid track sizing is likewise not modeled).
        LayoutMode::Stack | LayoutMode::Grid | LayoutMode::Absolute => {
            for child in &children {
                layout_element(tree, *child, inner_x, inner_y, inner_width, inner_height);
            }
        }
    }
}

/// Lays out `children` along one main axis (row = horizontal, else
/// vertical), distributing extra space per `alignment` and stretching the
/// cross axis to fill the container when `alignment` is `Stretch`.
fn layout_main_axis(
    tree: &mut ItemTree,
    children: &[ElementId],
    horizontal: bool,
    x: f32,
    y: f32,
    width: f32,
    height: f32,
    gap: f32,
    alignment: Alignment,
) {
    let main_extent = if horizontal { width } else { height };
    let cross_extent = if horizontal { height } else { width };

    let intrinsic: Vec<f32> = children
        .iter()
        .map(|c| {
            let code = if horizontal { PropertyCode::Width } else { PropertyCode::Height };
            let raw = prop_f32(tree, *c, code, -1.0);
            if raw < 0.0 { cross_extent.min(main_extent / children.len() as f32) } else { raw }
        })
        .collect();

    let total_main: f32 = intrinsic.iter().sum::<f32>() + gap * (children.len().saturating_sub(1)) as f32;
    let mut cursor = match alignment {
        Alignment::Center => ((main_extent - total_main) / 2.0).max(0.0),
        Alignment::End => (main_extent - total_main).max(0.0),
        _ => 0.0,
    };
    let start_cursor = if horizontal { x } else { y };
    cursor += start_cursor;

    for (child, &size) in children.iter().zip(intrinsic.iter()) {
        let cross = if alignment == Alignment::Stretch {
            cross_extent
        } else {
            let code = if horizontal { PropertyCode::Height } else { PropertyCode::Width };
            cross_extent.min(prop_f32(tree, *child, code, cross_extent))
        };
        let cross_offset = if horizontal { y } else { x };

        if horizontal {
            layout_element(tree, *child, cursor, cross_offset, size, cross);
        } else {
            layout_element(tree, *child, cross_offset, cursor, cross, size);
        }
        cursor += size + gap;
    }
}

/// Resolves a width/height property to a concrete pixel value: a negative
/// or absent dimension auto-sizes to whatever the container offered
/// (§4.I "auto-size where width/height < 0").
fn resolve_dimension(tree: &ItemTree, id: ElementId, code: PropertyCode, container: f32) -> f32 {
    match tree.get(id).and_then(|e| e.property(code)) {
        Some(RuntimeValue::Dimension(n, Unit::Percent)) => container * (*n as f32) / 100.0,
        Some(RuntimeValue::Dimension(n, _)) if *n >= 0.0 => *n as f32,
        Some(RuntimeValue::Int(n)) if *n >= 0 => *n as f32,
        Some(RuntimeValue::Float(n)) if *n >= 0.0 => *n as f32,
        _ => container,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item_tree::Element;
    use kryon_krb::ElementTypeCode;

    #[test]
    fn row_lays_children_out_left_to_right_with_gap() {
        let mut tree = ItemTree::new();
        let root = tree.insert(Element::new(0, ElementTypeCode::Row));
        tree.get_mut(root).unwrap().properties.insert(PropertyCode::Layout, RuntimeValue::String("row".into()));
        tree.get_mut(root).unwrap().properties.insert(PropertyCode::Gap, RuntimeValue::Int(10));
        let a = tree.insert(Element::new(0, ElementTypeCode::Text));
        tree.get_mut(a).unwrap().properties.insert(PropertyCode::Width, RuntimeValue::Int(50));
        let b = tree.insert(Element::new(0, ElementTypeCode::Text));
        tree.get_mut(b).unwrap().properties.insert(PropertyCode::Width, RuntimeValue::Int(30));
        tree.get_mut(root).unwrap().children = vec![crate::item_tree::ChildSlot::Element(a), crate::item_tree::ChildSlot::Element(b)];

        layout(&mut tree, root, 200.0, 100.0);

        assert_eq!(tree.get(a).unwrap().geometry.x, 0.0);
        assert_eq!(tree.get(b).unwrap().geometry.x, 60.0);
    }

    #[test]
    fn negative_dimension_auto_sizes_to_container() {
        let mut tree = ItemTree::new();
        let root = tree.insert(Element::new(0, ElementTypeCode::Container));
        let child = tree.insert(Element::new(0, ElementTypeCode::Text));
        tree.get_mut(root).unwrap().children = vec![crate::item_tree::ChildSlot::Element(child)];
        layout(&mut tree, root, 200.0, 100.0);
        assert_eq!(tree.get(child).unwrap().geometry.width, 200.0);
    }
}
