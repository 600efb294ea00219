//! Hit testing and the input event queue (§4.I, §5). The queue is bounded:
//! once full, new events are dropped and an overflow flag is raised rather
//! than growing unbounded or blocking the caller (§5 "bounded event queue").

use crate::item_tree::{Element, ElementId, ItemTree};
use crate::options::RuntimeOptions;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EventKind {
    Clicked,
    DoubleClicked,
    Hovered,
    Unhovered,
    Focused,
    Unfocused,
    MouseMoved,
    KeyPressed,
    KeyTyped,
    SelectionChanged,
    ValueChanged,
    Custom,
}

#[derive(Debug, Clone)]
pub enum EventPayload {
    None,
    Point { x: f32, y: f32 },
    Key(String),
    Text(String),
    Index(usize),
    Value(String),
}

#[derive(Debug, Clone)]
pub struct Event {
    pub kind: EventKind,
    pub target: Option<ElementId>,
    pub payload: EventPayload,
}

/// Bounded FIFO. `push` drops the event and flips `overflowed` once `queue`
/// reaches `capacity`, instead of growing or blocking (§5).
pub struct EventQueue {
    capacity: usize,
    queue: std::collections::VecDeque<Event>,
    pub overflowed: bool,
}

impl EventQueue {
    pub fn new(options: &RuntimeOptions) -> Self {
        Self { capacity: options.event_queue_capacity, queue: std::collections::VecDeque::new(), overflowed: false }
    }

    pub fn push(&mut self, event: Event) {
        if self.queue.len() >= self.capacity {
            self.overflowed = true;
            return;
        }
        self.queue.push_back(event);
    }

    pub fn pop(&mut self) -> Option<Event> {
        self.queue.pop_front()
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// `(element, bounds contains point)` hit test for one element, ignoring
/// its children — callers walk the tree themselves so dropdown popups can
/// be checked ahead of the normal tree (§4.I).
fn contains(el: &Element, x: f32, y: f32) -> bool {
    let g = el.geometry;
    el.visible && x >= g.x && x < g.x + g.width && y >= g.y && y < g.y + g.height
}

/// Finds the topmost element under `(x, y)`: the normal tree walked in
/// reverse z-order (later siblings paint on top, so they're hit first).
/// `popup_roots` are checked before the normal tree, since dropdown popups
/// always sit above everything else (§4.I).
pub fn hit_test(tree: &ItemTree, root: ElementId, popup_roots: &[ElementId], x: f32, y: f32) -> Option<ElementId> {
    for &popup in popup_roots.iter().rev() {
        if let Some(hit) = hit_test_subtree(tree, popup, x, y) {
            return Some(hit);
        }
    }
    hit_test_subtree(tree, root, x, y)
}

fn hit_test_subtree(tree: &ItemTree, id: ElementId, x: f32, y: f32) -> Option<ElementId> {
    let el = tree.get(id)?;
    if !contains(el, x, y) {
        return None;
    }
    let children: Vec<ElementId> = el.element_children().collect();
    for &child in children.iter().rev() {
        if let Some(hit) = hit_test_subtree(tree, child, x, y) {
            return Some(hit);
        }
    }
    Some(id)
}

/// Tracks pointer state across calls so `fire_pointer_event` can detect
/// hover transitions and double clicks (§4.I).
pub struct PointerState {
    pub hovered: Option<ElementId>,
    pub focused: Option<ElementId>,
    last_click_at_ms: Option<u64>,
    last_click_pos: Option<(f32, f32)>,
    last_click_target: Option<ElementId>,
}

impl Default for PointerState {
    fn default() -> Self {
        Self { hovered: None, focused: None, last_click_at_ms: None, last_click_pos: None, last_click_target: None }
    }
}

impl PointerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Updates hover state for a pointer move, pushing HOVERED/UNHOVERED as needed.
    pub fn on_move(&mut self, queue: &mut EventQueue, x: f32, y: f32, hit: Option<ElementId>) {
        if hit != self.hovered {
            if let Some(prev) = self.hovered {
                queue.push(Event { kind: EventKind::Unhovered, target: Some(prev), payload: EventPayload::None });
            }
            if let Some(next) = hit {
                queue.push(Event { kind: EventKind::Hovered, target: Some(next), payload: EventPayload::None });
            }
            self.hovered = hit;
        }
        queue.push(Event { kind: EventKind::MouseMoved, target: hit, payload: EventPayload::Point { x, y } });
    }

    /// Fires CLICKED, and DOUBLE_CLICKED when within the configured time and
    /// distance of the previous click on the same target (§4.I).
    pub fn on_click(&mut self, queue: &mut EventQueue, options: &RuntimeOptions, now_ms: u64, x: f32, y: f32, hit: Option<ElementId>) {
        if hit != self.focused {
            if let Some(prev) = self.focused {
                queue.push(Event { kind: EventKind::Unfocused, target: Some(prev), payload: EventPayload::None });
            }
            if let Some(next) = hit {
                queue.push(Event { kind: EventKind::Focused, target: Some(next), payload: EventPayload::None });
            }
            self.focused = hit;
        }
        queue.push(Event { kind: EventKind::Clicked, target: hit, payload: EventPayload::Point { x, y } });

        let is_double = hit.is_some()
            && hit == self.last_click_target
            && self.last_click_at_ms.map_or(false, |t| now_ms.saturating_sub(t) <= options.double_click_ms)
            && self.last_click_pos.map_or(false, |(lx, ly)| {
                ((lx - x).powi(2) + (ly - y).powi(2)).sqrt() <= options.double_click_distance_px
            });
        if is_double {
            queue.push(Event { kind: EventKind::DoubleClicked, target: hit, payload: EventPayload::Point { x, y } });
            self.last_click_at_ms = None;
            self.last_click_pos = None;
            self.last_click_target = None;
        } else {
            self.last_click_at_ms = Some(now_ms);
            self.last_click_pos = Some((x, y));
            self.last_click_target = hit;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item_tree::{ChildSlot, Geometry};
    use kryon_krb::ElementTypeCode;

    fn rect(tree: &mut ItemTree, parent: Option<ElementId>, x: f32, y: f32, w: f32, h: f32) -> ElementId {
        let mut el = Element::new(0, ElementTypeCode::Container);
        el.geometry = Geometry { x, y, width: w, height: h, ..Default::default() };
        el.parent = parent;
        let id = tree.insert(el);
        if let Some(p) = parent {
            tree.get_mut(p).unwrap().children.push(ChildSlot::Element(id));
        }
        id
    }

    #[test]
    fn hit_test_prefers_the_deepest_topmost_child() {
        let mut tree = ItemTree::new();
        let root = rect(&mut tree, None, 0.0, 0.0, 100.0, 100.0);
        let child = rect(&mut tree, Some(root), 10.0, 10.0, 20.0, 20.0);
        assert_eq!(hit_test(&tree, root, &[], 15.0, 15.0), Some(child));
        assert_eq!(hit_test(&tree, root, &[], 50.0, 50.0), Some(root));
        assert_eq!(hit_test(&tree, root, &[], 500.0, 500.0), None);
    }

    #[test]
    fn full_queue_drops_and_flags_overflow() {
        let options = RuntimeOptions { event_queue_capacity: 1, ..RuntimeOptions::default() };
        let mut queue = EventQueue::new(&options);
        queue.push(Event { kind: EventKind::Clicked, target: None, payload: EventPayload::None });
        queue.push(Event { kind: EventKind::Clicked, target: None, payload: EventPayload::None });
        assert_eq!(queue.len(), 1);
        assert!(queue.overflowed);
    }

    #[test]
    fn second_click_within_window_is_a_double_click() {
        let options = RuntimeOptions::default();
        let mut queue = EventQueue::new(&options);
        let mut pointer = PointerState::new();
        pointer.on_click(&mut queue, &options, 1000, 10.0, 10.0, Some(0));
        pointer.on_click(&mut queue, &options, 1100, 10.0, 10.0, Some(0));
        let kinds: Vec<_> = std::iter::from_fn(|| queue.pop()).map(|e| e.kind).collect();
        assert!(kinds.contains(&EventKind::DoubleClicked));
    }
}
