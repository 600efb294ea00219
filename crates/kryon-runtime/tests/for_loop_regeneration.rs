//! End-to-end: compile a `.kry` source with a runtime `@for`, load the
//! resulting binary, and verify the directive engine regenerates the loop
//! body when the backing variable changes (spec scenario: `items` grows
//! from two entries to three, the parent gains a third `Text` child).

use kryon_compiler::expansion::FsIncludeResolver;
use kryon_compiler::CompilerOptions;
use kryon_runtime::{Runtime, RuntimeOptions, RuntimeValue};

const SOURCE: &str = r#"
@variables { items = ["a", "b"]; }
Column {
    @for $item in $items {
        Text { text: $item; }
    }
}
"#;

fn load_runtime() -> Runtime {
    let output = kryon_compiler::compile(SOURCE, None, &FsIncludeResolver, &CompilerOptions::default()).unwrap();
    assert!(output.diagnostics.is_empty(), "{}", output.diagnostics);
    Runtime::load(&output.krb.bytes, RuntimeOptions::default()).unwrap()
}

#[test]
fn growing_the_backing_array_adds_a_child() {
    let mut runtime = load_runtime();
    let root = runtime.tree.root.expect("one top-level element");

    runtime.update(400.0, 400.0);
    let before = runtime.tree.get(root).unwrap().element_children().count();
    assert_eq!(before, 2);

    runtime.state.set_value("items", RuntimeValue::Array(vec![
        RuntimeValue::String("a".into()),
        RuntimeValue::String("b".into()),
        RuntimeValue::String("c".into()),
    ]));
    runtime.update(400.0, 400.0);
    let after = runtime.tree.get(root).unwrap().element_children().count();
    assert_eq!(after, 3);
}
