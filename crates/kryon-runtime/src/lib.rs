//! Runtime crate (§2 component F/I/J/K/L, §4.F–§4.J): loads a binary
//! produced by the compiler, materializes a live element tree, and drives
//! one cooperative update/render tick at a time on the calling thread — no
//! coroutines or async are needed (§9).

pub mod directive;
pub mod error;
pub mod eval;
pub mod input;
pub mod item_tree;
pub mod layout;
pub mod options;
pub mod reader;
pub mod render;
pub mod state;
pub mod value;

pub use error::LoadError;
pub use item_tree::{Element, ElementId, ItemTree, Lifecycle};
pub use options::RuntimeOptions;
pub use reader::{load, KrbDocument};
pub use render::RenderCommand;
pub use value::RuntimeValue;

use input::{Event, EventQueue, PointerState};
use state::StateTree;

/// One loaded document plus everything it takes to drive a frame: the
/// element arena, reactive state tree, pending input, and pointer tracking.
pub struct Runtime {
    pub tree: ItemTree,
    pub state: StateTree,
    pub strings: Vec<String>,
    pub options: RuntimeOptions,
    pub events: EventQueue,
    pub pointer: PointerState,
}

impl Runtime {
    /// Parses `bytes` as a KRB binary, seeds the state tree from its
    /// variables section, and mounts every element depth-first post-order
    /// (leaves before parents, §4.F).
    pub fn load(bytes: &[u8], options: RuntimeOptions) -> Result<Self, LoadError> {
        let doc = reader::load(bytes)?;
        let strings = doc.strings;
        let mut state = StateTree::new();
        for (name, value) in doc.variables {
            state.seed(name, value);
        }

        // Mount order is leaves-first (§4.F): each element passes through
        // MOUNTING on its way to MOUNTED, but since loading is synchronous
        // and nothing observes the intermediate state, the two collapse
        // into one pass here.
        let mut tree = doc.tree;
        if let Some(root) = tree.root {
            for id in tree.post_order(root) {
                if let Some(el) = tree.get_mut(id) {
                    el.lifecycle = item_tree::Lifecycle::Mounted;
                }
            }
        }

        log::debug!("runtime mounted {} element(s)", tree.len());
        let events = EventQueue::new(&options);
        Ok(Self { tree, state, strings, options, events, pointer: PointerState::new() })
    }

    pub fn push_event(&mut self, event: Event) {
        self.events.push(event);
    }

    /// One update tick (§5): regenerates `@for`/`@if` bodies from current
    /// state, then runs layout. Call after a batch of `set_value`s lands.
    pub fn update(&mut self, viewport_width: f32, viewport_height: f32) {
        if let Some(root) = self.tree.root {
            directive::update_directives(&mut self.tree, root, &self.state, &self.strings);
            layout::layout(&mut self.tree, root, viewport_width, viewport_height);
        }
    }

    /// Emits the render-command stream for the current frame (§4.J). Never
    /// touches state or the directive engine — call `update` first.
    pub fn render(&self) -> Vec<RenderCommand> {
        match self.tree.root {
            Some(root) => render::emit(&self.tree, root),
            None => Vec::new(),
        }
    }

    pub fn hit_test(&self, x: f32, y: f32) -> Option<ElementId> {
        self.tree.root.and_then(|root| input::hit_test(&self.tree, root, &[], x, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loading_and_rendering_an_empty_document_yields_no_commands() {
        // Matches the compiler's "empty source" boundary case: a KRB with
        // zero elements still has a valid header and an empty section set.
        let empty = kryon_compiler::compile("", None, &NullResolver, &kryon_compiler::CompilerOptions::default()).unwrap();
        let runtime = Runtime::load(&empty.krb.bytes, RuntimeOptions::default()).unwrap();
        assert!(runtime.render().is_empty());
    }

    struct NullResolver;
    impl kryon_compiler::expansion::IncludeResolver for NullResolver {
        fn resolve(&self, path: &str) -> std::io::Result<String> {
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, path.to_string()))
        }
    }
}
