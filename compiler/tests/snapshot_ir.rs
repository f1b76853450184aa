// Snapshot tests: lock the IR tree display and solved bindings for the
// sample descriptors under `descriptors/`.
//
// Snapshots are managed by `insta` and stored under `compiler/tests/snapshots/`.
// Run `cargo insta review` after intentional output changes to update baselines.

use std::path::{Path, PathBuf};

use styx::ir::TreeDisplay;
use styx::pipeline::{compile, CompileResult, PipelineOptions};

fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .to_path_buf()
}

fn compile_descriptor(name: &str) -> CompileResult {
    let path = project_root().join("descriptors").join(name);
    let source = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {}", path.display(), e));
    let result = compile(&source, &PipelineOptions::default());
    assert!(
        !result.has_errors(),
        "errors in {}: {:?}",
        name,
        result.diagnostics
    );
    result
}

fn bindings_text(result: &CompileResult) -> String {
    result
        .bindings()
        .iter()
        .map(|b| format!("{} {b}", b.id))
        .collect::<Vec<_>>()
        .join("\n")
}

#[test]
fn snapshot_ir_bet() {
    let result = compile_descriptor("bet.json");
    let output = TreeDisplay::new(&result.arena, result.raw_root)
        .with_app(result.meta.as_ref())
        .to_string();
    insta::assert_snapshot!("ir_bet", output);
}

#[test]
fn snapshot_normalized_register() {
    let result = compile_descriptor("register.json");
    let output = TreeDisplay::new(&result.arena, result.root)
        .with_app(result.meta.as_ref())
        .to_string();
    insta::assert_snapshot!("normalized_register", output);
}

#[test]
fn snapshot_bindings_bet() {
    let result = compile_descriptor("bet.json");
    insta::assert_snapshot!("bindings_bet", bindings_text(&result));
}

#[test]
fn snapshot_bindings_register() {
    let result = compile_descriptor("register.json");
    insta::assert_snapshot!("bindings_register", bindings_text(&result));
}
