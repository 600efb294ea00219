//! Render-command emission (§4.J): a pre-order walk of the element tree
//! that fills an ordered command buffer. The runtime never calls into a
//! renderer directly — external backends consume this stream.

use crate::item_tree::{Element, ElementId, ItemTree};
use crate::value::RuntimeValue;
use kryon_krb::{PropertyCode, Rgba8888};

#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    DrawRect { x: f32, y: f32, width: f32, height: f32, color: Rgba8888, radius: f32 },
    DrawText { x: f32, y: f32, text: String, color: Rgba8888, font_size: f32 },
    DrawLine { x1: f32, y1: f32, x2: f32, y2: f32, color: Rgba8888, width: f32 },
    DrawCircle { cx: f32, cy: f32, radius: f32, color: Rgba8888 },
    DrawArc { cx: f32, cy: f32, radius: f32, start_angle: f32, end_angle: f32, color: Rgba8888 },
    DrawImage { x: f32, y: f32, width: f32, height: f32, src: String },
    SetClip { x: f32, y: f32, width: f32, height: f32 },
    PushClip { x: f32, y: f32, width: f32, height: f32 },
    PopClip,
    SetTransform { tx: f32, ty: f32 },
    PushTransform { tx: f32, ty: f32 },
    PopTransform,
}

const DEFAULT_FONT_SIZE: f32 = 14.0;
const DEFAULT_TEXT_COLOR: Rgba8888 = Rgba8888 { r: 0, g: 0, b: 0, a: 255 };

fn color_property(el: &Element, code: PropertyCode, default: Rgba8888) -> Rgba8888 {
    match el.property(code) {
        Some(RuntimeValue::Color(c)) => *c,
        _ => default,
    }
}

fn float_property(el: &Element, code: PropertyCode, default: f32) -> f32 {
    match el.property(code) {
        Some(v @ (RuntimeValue::Int(_) | RuntimeValue::Float(_) | RuntimeValue::Dimension(..))) => v.as_f64() as f32,
        _ => default,
    }
}

/// Emits commands for `root` in pre-order (paint order: later = on top),
/// pushing a clip around any element whose layout was given a finite
/// rectangle and popping it once its subtree is done.
pub fn emit(tree: &ItemTree, root: ElementId) -> Vec<RenderCommand> {
    let mut out = Vec::new();
    emit_subtree(tree, root, &mut out);
    out
}

fn emit_subtree(tree: &ItemTree, id: ElementId, out: &mut Vec<RenderCommand>) {
    let Some(el) = tree.get(id) else { return };
    if !el.visible {
        return;
    }
    let g = el.geometry;

    if let Some(RuntimeValue::Color(color)) = el.property(PropertyCode::BackgroundColor) {
        out.push(RenderCommand::DrawRect {
            x: g.x,
            y: g.y,
            width: g.width,
            height: g.height,
            color: *color,
            radius: float_property(el, PropertyCode::BorderRadius, 0.0),
        });
    }

    if let Some(text) = el.property(PropertyCode::Text) {
        out.push(RenderCommand::DrawText {
            x: g.x,
            y: g.y,
            text: text.as_display_string(),
            color: color_property(el, PropertyCode::Color, DEFAULT_TEXT_COLOR),
            font_size: float_property(el, PropertyCode::FontSize, DEFAULT_FONT_SIZE),
        });
    }

    if let Some(RuntimeValue::String(src)) = el.property(PropertyCode::Src) {
        out.push(RenderCommand::DrawImage { x: g.x, y: g.y, width: g.width, height: g.height, src: src.clone() });
    }

    out.push(RenderCommand::PushClip { x: g.x, y: g.y, width: g.width, height: g.height });
    for child in el.element_children().collect::<Vec<_>>() {
        emit_subtree(tree, child, out);
    }
    out.push(RenderCommand::PopClip);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item_tree::{ChildSlot, Geometry};
    use kryon_krb::ElementTypeCode;

    #[test]
    fn background_color_emits_a_draw_rect_before_its_children() {
        let mut tree = ItemTree::new();
        let mut root = Element::new(0, ElementTypeCode::Container);
        root.geometry = Geometry { x: 0.0, y: 0.0, width: 50.0, height: 50.0, ..Default::default() };
        root.properties.insert(PropertyCode::BackgroundColor, RuntimeValue::Color(Rgba8888::new(255, 0, 0, 255)));
        let root_id = tree.insert(root);

        let mut child = Element::new(0, ElementTypeCode::Text);
        child.properties.insert(PropertyCode::Text, RuntimeValue::String("hi".into()));
        let child_id = tree.insert(child);
        tree.get_mut(root_id).unwrap().children = vec![ChildSlot::Element(child_id)];

        let commands = emit(&tree, root_id);
        assert!(matches!(commands[0], RenderCommand::DrawRect { .. }));
        assert!(commands.iter().any(|c| matches!(c, RenderCommand::DrawText { text, .. } if text == "hi")));
        assert!(matches!(commands.last(), Some(RenderCommand::PopClip)));
    }

    #[test]
    fn invisible_element_emits_nothing() {
        let mut tree = ItemTree::new();
        let mut root = Element::new(0, ElementTypeCode::Container);
        root.visible = false;
        let root_id = tree.insert(root);
        assert!(emit(&tree, root_id).is_empty());
    }
}
