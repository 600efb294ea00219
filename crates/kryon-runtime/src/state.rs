//! Reactive state tree (§3 "State node", §4.G): a tree of values keyed by
//! dotted path (`user.profile.name`), with synchronous observer dispatch on
//! mutation. Global `@variables`/`@const` bindings and per-component-instance
//! `@state` live in the same tree, the instance ones addressed by their
//! `<instance-id>.<state-name>` prefix (§4.C/§4.E).

use crate::value::RuntimeValue;
use std::collections::HashMap;

pub type ObserverId = u64;

/// `(function-pointer, user-data)` per §9 — in Rust, a boxed closure plays
/// the role of the function pointer and captures whatever user data it needs.
pub type Observer = Box<dyn FnMut(&RuntimeValue)>;

#[derive(Default)]
struct StateNode {
    value: RuntimeValue,
    revision: u64,
    observers: Vec<(ObserverId, Observer)>,
}

/// Guards against an observer mutating the observer list of the node it is
/// currently being dispatched for (§4.G). Registrations/removals requested
/// during dispatch are queued here and applied once dispatch finishes.
#[derive(Default)]
struct PendingEdits {
    add: Vec<(String, ObserverId, Observer)>,
    remove: Vec<(String, ObserverId)>,
}

pub struct StateTree {
    nodes: HashMap<String, StateNode>,
    next_observer_id: ObserverId,
    dispatching: HashMap<String, ()>,
    pending: PendingEdits,
}

impl Default for StateTree {
    fn default() -> Self {
        Self::new()
    }
}

impl StateTree {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            next_observer_id: 0,
            dispatching: HashMap::new(),
            pending: PendingEdits::default(),
        }
    }

    /// Seeds an initial value at `path` without touching observers or the
    /// revision counter — used while loading a binary, before anything could
    /// possibly be watching.
    pub fn seed(&mut self, path: impl Into<String>, value: RuntimeValue) {
        self.nodes.insert(path.into(), StateNode { value, revision: 0, observers: Vec::new() });
    }

    /// Prefix-wise descent; a missing intermediate node yields `Null`, not an error.
    pub fn get_by_path(&self, path: &str) -> RuntimeValue {
        self.nodes.get(path).map(|n| n.value.clone()).unwrap_or(RuntimeValue::Null)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.nodes.contains_key(path)
    }

    /// Writes the new value, bumps the node's revision, and synchronously
    /// notifies every observer registered on it, in registration order.
    pub fn set_value(&mut self, path: &str, value: RuntimeValue) {
        let node = self.nodes.entry(path.to_string()).or_default();
        node.value = value;
        node.revision += 1;

        self.dispatching.insert(path.to_string(), ());
        if let Some(node) = self.nodes.get_mut(path) {
            let current = node.value.clone();
            for (_, observer) in node.observers.iter_mut() {
                observer(&current);
            }
        }
        self.dispatching.remove(path);
        self.drain_pending_for(path);
    }

    pub fn revision(&self, path: &str) -> u64 {
        self.nodes.get(path).map(|n| n.revision).unwrap_or(0)
    }

    /// Registers `observer` on `path`, deferring the registration to the end
    /// of the current batch if `path` is mid-dispatch (§4.G reentrancy guard).
    pub fn observe(&mut self, path: impl Into<String>, observer: Observer) -> ObserverId {
        let path = path.into();
        let id = self.next_observer_id;
        self.next_observer_id += 1;
        if self.dispatching.contains_key(&path) {
            self.pending.add.push((path, id, observer));
        } else {
            self.nodes.entry(path).or_default().observers.push((id, observer));
        }
        id
    }

    pub fn unobserve(&mut self, path: impl Into<String>, id: ObserverId) {
        let path = path.into();
        if self.dispatching.contains_key(&path) {
            self.pending.remove.push((path, id));
        } else if let Some(node) = self.nodes.get_mut(&path) {
            node.observers.retain(|(existing, _)| *existing != id);
        }
    }

    fn drain_pending_for(&mut self, path: &str) {
        let add: Vec<_> = self.pending.add.iter().enumerate().filter(|(_, (p, ..))| p == path).map(|(i, _)| i).collect();
        for i in add.into_iter().rev() {
            let (p, id, observer) = self.pending.add.remove(i);
            self.nodes.entry(p).or_default().observers.push((id, observer));
        }
        let remove: Vec<_> = self.pending.remove.iter().enumerate().filter(|(_, (p, _))| p == path).map(|(i, _)| i).collect();
        for i in remove.into_iter().rev() {
            let (p, id) = self.pending.remove.remove(i);
            if let Some(node) = self.nodes.get_mut(&p) {
                node.observers.retain(|(existing, _)| *existing != id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn missing_path_reads_as_null() {
        let tree = StateTree::new();
        assert_eq!(tree.get_by_path("nope"), RuntimeValue::Null);
    }

    #[test]
    fn observer_fires_synchronously_in_registration_order() {
        let mut tree = StateTree::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        let log_a = log.clone();
        let log_b = log.clone();
        tree.observe("count", Box::new(move |v| log_a.borrow_mut().push(("a", v.as_f64() as i64))));
        tree.observe("count", Box::new(move |v| log_b.borrow_mut().push(("b", v.as_f64() as i64))));
        tree.set_value("count", RuntimeValue::Int(5));
        assert_eq!(*log.borrow(), vec![("a", 5), ("b", 5)]);
    }

    #[test]
    fn registration_requested_mid_dispatch_is_deferred_to_batch_end() {
        let mut tree = StateTree::new();
        // Simulate being mid-dispatch on "x" the way `set_value` marks it.
        tree.dispatching.insert("x".to_string(), ());
        let id = tree.observe("x", Box::new(|_| {}));
        assert!(tree.nodes.get("x").map_or(true, |n| n.observers.is_empty()));
        tree.dispatching.remove("x");
        tree.drain_pending_for("x");
        assert!(tree.nodes.get("x").unwrap().observers.iter().any(|(existing, _)| *existing == id));
    }
}
