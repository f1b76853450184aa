// pipeline.rs — Stage orchestration: parse → normalize → solve
//
// Builds the normalization pass pipeline from `PipelineOptions` and runs
// the three stages over one descriptor, collecting every diagnostic in
// stage order and logging per-stage wall time.
//
// Preconditions: none.
// Postconditions: `CompileResult` always carries an arena, both roots and a
//   (possibly empty) binding registry. A fatal parse error stops after
//   parsing; normalization and solving are skipped.
// Failure modes: none raised; callers inspect `diagnostics`.
// Side effects: emits `tracing` debug events.

use std::time::Instant;

use serde::Serialize;
use tracing::debug;

use crate::bindings::BindingRegistry;
use crate::diag::{has_errors, Diagnostic};
use crate::frontend::parse;
use crate::id::ExprId;
use crate::ir::{AppMeta, ExprArena};
use crate::pass::{
    descriptor, instantiate, Compose, Fixpoint, Pass, PassId, PassResult, ALL_PASSES,
    DEFAULT_MAX_ITERATIONS,
};
use crate::solver::{solve, SolveOptions, SolveResult};

// ── Configuration ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Fixpoint iteration cap.
    pub max_iterations: usize,
    /// Append the canonicalize pass to the default passes.
    pub canonicalize: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            canonicalize: false,
        }
    }
}

impl PipelineOptions {
    /// Pass ids this configuration runs, in order.
    pub fn passes(&self) -> Vec<PassId> {
        ALL_PASSES
            .into_iter()
            .filter(|&id| {
                descriptor(id).default_enabled || (self.canonicalize && id == PassId::Canonicalize)
            })
            .collect()
    }
}

/// Compose `passes` in order, iterated to a fixpoint when `max_iterations`
/// is given.
pub fn create_pipeline(passes: Vec<Box<dyn Pass>>, max_iterations: Option<usize>) -> Box<dyn Pass> {
    let composed: Box<dyn Pass> = Box::new(Compose::new(passes));
    match max_iterations {
        Some(max) => Box::new(Fixpoint::new(composed, max)),
        None => composed,
    }
}

/// `fixpoint(compose(flatten, remove-empty, simplify[, canonicalize]))`.
pub fn default_pipeline(options: &PipelineOptions) -> Box<dyn Pass> {
    let passes = options.passes().into_iter().map(instantiate).collect();
    create_pipeline(passes, Some(options.max_iterations))
}

/// Run the default pipeline over one tree.
pub fn normalize(arena: &mut ExprArena, root: ExprId, options: &PipelineOptions) -> PassResult {
    default_pipeline(options).apply(arena, root)
}

// ── Provenance ───────────────────────────────────────────────────────────

/// Identifies the input and compiler behind an output, for cache keys and
/// reproducibility checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Provenance {
    #[serde(serialize_with = "serialize_hex")]
    pub source_hash: [u8; 32],
    pub compiler_version: &'static str,
}

impl Provenance {
    /// Hex string of the source hash (64 characters).
    pub fn source_hash_hex(&self) -> String {
        bytes_to_hex(&self.source_hash)
    }

    /// Pretty JSON for `--emit build-info`.
    pub fn to_json(&self) -> String {
        // Serializing a struct of a string and a version cannot fail.
        serde_json::to_string_pretty(self).unwrap_or_default() + "\n"
    }
}

fn serialize_hex<S: serde::Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&bytes_to_hex(bytes))
}

fn bytes_to_hex(bytes: &[u8; 32]) -> String {
    let mut s = String::with_capacity(64);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(s, "{:02x}", b);
    }
    s
}

pub fn compute_provenance(source: &str) -> Provenance {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();
    hasher.update(source.as_bytes());
    let result = hasher.finalize();
    let mut source_hash = [0u8; 32];
    source_hash.copy_from_slice(&result);

    Provenance {
        source_hash,
        compiler_version: env!("CARGO_PKG_VERSION"),
    }
}

// ── Compile ──────────────────────────────────────────────────────────────

pub struct CompileResult {
    pub meta: Option<AppMeta>,
    pub arena: ExprArena,
    /// Tree as produced by the frontend.
    pub raw_root: ExprId,
    /// Tree after normalization; equals `raw_root` when parsing was fatal.
    pub root: ExprId,
    pub solved: SolveResult,
    /// Parse diagnostics followed by pipeline warnings.
    pub diagnostics: Vec<Diagnostic>,
    pub provenance: Provenance,
}

impl CompileResult {
    pub fn bindings(&self) -> &BindingRegistry {
        &self.solved.bindings
    }

    pub fn has_errors(&self) -> bool {
        has_errors(&self.diagnostics)
    }
}

pub fn compile(source: &str, options: &PipelineOptions) -> CompileResult {
    compile_with(source, options, SolveOptions::default())
}

pub fn compile_with(
    source: &str,
    options: &PipelineOptions,
    solve_options: SolveOptions,
) -> CompileResult {
    let provenance = compute_provenance(source);

    let t = Instant::now();
    let parsed = parse(source);
    debug!(elapsed_ms = t.elapsed().as_secs_f64() * 1e3, "parse complete");

    let mut arena = parsed.arena;
    let raw_root = parsed.root;
    let mut diagnostics = parsed.diagnostics;

    let Some(meta) = parsed.meta else {
        let solved = SolveResult {
            bindings: BindingRegistry::new(),
            root_type: None,
        };
        return CompileResult {
            meta: None,
            arena,
            raw_root,
            root: raw_root,
            solved,
            diagnostics,
            provenance,
        };
    };

    let t = Instant::now();
    let normalized = normalize(&mut arena, raw_root, options);
    debug!(
        elapsed_ms = t.elapsed().as_secs_f64() * 1e3,
        status = ?normalized.status,
        nodes = arena.len(),
        "normalize complete"
    );
    diagnostics.extend(normalized.warnings);

    let t = Instant::now();
    let solved = solve(&arena, normalized.root, solve_options);
    debug!(
        elapsed_ms = t.elapsed().as_secs_f64() * 1e3,
        bindings = solved.bindings.len(),
        "solve complete"
    );

    CompileResult {
        meta: Some(meta),
        arena,
        raw_root,
        root: normalized.root,
        solved,
        diagnostics,
        provenance,
    }
}

// ── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::codes;
    use crate::ir::TreeDisplay;
    use crate::pass::PassStatus;

    #[test]
    fn default_passes_exclude_canonicalize() {
        let options = PipelineOptions::default();
        assert_eq!(
            options.passes(),
            vec![PassId::Flatten, PassId::RemoveEmpty, PassId::Simplify]
        );
        let with = PipelineOptions {
            canonicalize: true,
            ..options
        };
        assert_eq!(with.passes().last(), Some(&PassId::Canonicalize));
        assert_eq!(
            default_pipeline(&options).name(),
            "fixpoint(compose(flatten, remove-empty, simplify))"
        );
    }

    #[test]
    fn create_pipeline_without_fixpoint() {
        let pipeline = create_pipeline(vec![instantiate(PassId::Simplify)], None);
        assert_eq!(pipeline.name(), "compose(simplify)");
    }

    #[test]
    fn normalize_reaches_fixpoint() {
        let mut arena = ExprArena::new();
        let a = arena.literal("a");
        let b = arena.literal("b");
        let inner = arena.sequence(vec![a, b], None);
        let empty = arena.alternative(vec![]);
        let root = arena.sequence(vec![inner, empty], None);

        let options = PipelineOptions::default();
        let first = normalize(&mut arena, root, &options);
        assert_eq!(first.status, PassStatus::Changed);
        assert_eq!(TreeDisplay::new(&arena, first.root).to_string(), "literal \"ab\"");

        let again = normalize(&mut arena, first.root, &options);
        assert_eq!(again.status, PassStatus::Unchanged);
        assert_eq!(again.root, first.root);
    }

    #[test]
    fn fatal_parse_skips_later_stages() {
        let result = compile("[1, 2]", &PipelineOptions::default());
        assert!(result.meta.is_none());
        assert!(result.bindings().is_empty());
        assert!(result.has_errors());
        assert_eq!(result.diagnostics[0].code, Some(codes::E0002));
        assert_eq!(result.root, result.raw_root);
    }

    #[test]
    fn compile_solves_bindings() {
        let source = r#"{
            "name": "echo",
            "command-line": "echo [MSG]",
            "inputs": [{ "id": "msg", "value-key": "[MSG]", "type": "String" }]
        }"#;
        let result = compile(source, &PipelineOptions::default());
        assert!(!result.has_errors());
        let names: Vec<String> = result.bindings().iter().map(|b| b.to_string()).collect();
        assert_eq!(names, vec!["msg: str"]);
    }

    #[test]
    fn provenance_hash_is_stable() {
        let a = compute_provenance("{}");
        let b = compute_provenance("{}");
        assert_eq!(a, b);
        assert_eq!(
            a.source_hash_hex(),
            "44136fa355b3678a1146ad16f7e8649e94fb4fc21fe77e8310c060f61caaff8a"
        );
        let json: serde_json::Value = serde_json::from_str(&a.to_json()).unwrap();
        assert_eq!(json["source_hash"], a.source_hash_hex());
        assert_eq!(json["compiler_version"], env!("CARGO_PKG_VERSION"));
    }
}
