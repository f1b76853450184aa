// pass.rs — Rewrite pass framework: trait, combinators, pass registry
//
// A pass rewrites the tree rooted at one id into a new root without mutating
// existing nodes; unchanged subtrees keep their ids. `Compose` chains passes,
// `Fixpoint` re-applies a pass until it stops asking for a rerun or hits an
// iteration cap. The registry maps each built-in pass to static metadata and
// a constructor.
//
// Preconditions: `root` belongs to the arena handed to `apply`.
// Postconditions: the returned root belongs to the same arena; every node
//   reachable from the input root is still intact.
// Failure modes: none; non-convergence degrades to a W0300 warning.
// Side effects: `Fixpoint` logs iterations at debug level and
//   non-convergence at warn level.

use tracing::{debug, warn};

use crate::canonicalize::Canonicalize;
use crate::diag::{codes, Diagnostic};
use crate::flatten::Flatten;
use crate::id::ExprId;
use crate::ir::ExprArena;
use crate::remove_empty::RemoveEmpty;
use crate::simplify::Simplify;

/// Default iteration cap for [`Fixpoint`].
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

// ── Pass contract ──────────────────────────────────────────────────────────

/// Outcome of one pass application, ordered by how much work it reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PassStatus {
    Unchanged,
    Changed,
    /// Changed, and another round may find more to rewrite.
    ChangedNeedsRerun,
}

#[derive(Debug)]
pub struct PassResult {
    pub root: ExprId,
    pub status: PassStatus,
    pub warnings: Vec<Diagnostic>,
}

impl PassResult {
    pub fn new(root: ExprId, changed: bool) -> Self {
        Self {
            root,
            status: if changed {
                PassStatus::Changed
            } else {
                PassStatus::Unchanged
            },
            warnings: Vec::new(),
        }
    }
}

pub trait Pass {
    fn name(&self) -> String;
    fn apply(&self, arena: &mut ExprArena, root: ExprId) -> PassResult;
}

// ── Combinators ────────────────────────────────────────────────────────────

/// Runs each pass in order on the previous pass's output. Any change
/// reports `ChangedNeedsRerun`, since a later pass can expose work for an
/// earlier one.
pub struct Compose {
    passes: Vec<Box<dyn Pass>>,
}

impl Compose {
    pub fn new(passes: Vec<Box<dyn Pass>>) -> Self {
        Self { passes }
    }
}

impl Pass for Compose {
    fn name(&self) -> String {
        let names: Vec<String> = self.passes.iter().map(|p| p.name()).collect();
        format!("compose({})", names.join(", "))
    }

    fn apply(&self, arena: &mut ExprArena, root: ExprId) -> PassResult {
        let mut current = root;
        let mut status = PassStatus::Unchanged;
        let mut warnings = Vec::new();
        for pass in &self.passes {
            let result = pass.apply(arena, current);
            current = result.root;
            status = status.max(result.status);
            warnings.extend(result.warnings);
        }
        if status != PassStatus::Unchanged {
            status = PassStatus::ChangedNeedsRerun;
        }
        PassResult {
            root: current,
            status,
            warnings,
        }
    }
}

/// Re-applies `inner` while it reports `ChangedNeedsRerun`, at most
/// `max_iterations` times.
pub struct Fixpoint {
    inner: Box<dyn Pass>,
    max_iterations: usize,
}

impl Fixpoint {
    pub fn new(inner: Box<dyn Pass>, max_iterations: usize) -> Self {
        Self {
            inner,
            max_iterations,
        }
    }
}

impl Pass for Fixpoint {
    fn name(&self) -> String {
        format!("fixpoint({})", self.inner.name())
    }

    fn apply(&self, arena: &mut ExprArena, root: ExprId) -> PassResult {
        let mut current = root;
        let mut changed = false;
        let mut warnings = Vec::new();

        for iteration in 1..=self.max_iterations {
            let result = self.inner.apply(arena, current);
            current = result.root;
            changed |= result.status != PassStatus::Unchanged;
            warnings.extend(result.warnings);
            debug!(pass = %self.inner.name(), iteration, status = ?result.status, "fixpoint iteration");

            if result.status != PassStatus::ChangedNeedsRerun {
                let mut done = PassResult::new(current, changed);
                done.warnings = warnings;
                return done;
            }
        }

        warn!(
            pass = %self.inner.name(),
            max_iterations = self.max_iterations,
            "pass pipeline did not converge"
        );
        warnings.push(
            Diagnostic::warning(format!(
                "{} did not converge after {} iterations",
                self.name(),
                self.max_iterations
            ))
            .with_code(codes::W0300)
            .with_hint("the returned tree is the result of the last iteration"),
        );
        let mut partial = PassResult::new(current, changed);
        partial.warnings = warnings;
        partial
    }
}

// ── Pass registry ──────────────────────────────────────────────────────────

/// Identifies each built-in rewrite pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassId {
    Flatten,
    RemoveEmpty,
    Simplify,
    Canonicalize,
}

/// Static metadata about a rewrite pass.
pub struct PassDescriptor {
    /// Name used in diagnostics and `--verbose` output.
    pub name: &'static str,
    pub summary: &'static str,
    /// Nodes the pass never removes or merges away.
    pub guard: &'static str,
    /// Part of the default normalization pipeline.
    pub default_enabled: bool,
}

pub fn descriptor(id: PassId) -> PassDescriptor {
    match id {
        PassId::Flatten => PassDescriptor {
            name: "flatten",
            summary: "inline nested sequences with matching join and nested alternatives",
            guard: "children carrying metadata",
            default_enabled: true,
        },
        PassId::RemoveEmpty => PassDescriptor {
            name: "remove-empty",
            summary: "drop empty sequences/alternatives and optional/repeat wrappers around them",
            guard: "nodes carrying metadata",
            default_enabled: true,
        },
        PassId::Simplify => PassDescriptor {
            name: "simplify",
            summary: "unwrap nested optionals and repeats, merge adjacent literals, collapse singletons",
            guard: "metadata is merged, never dropped",
            default_enabled: true,
        },
        PassId::Canonicalize => PassDescriptor {
            name: "canonicalize",
            summary: "sort alternatives by kind, name and structure; drop structural duplicates",
            guard: "children carrying metadata are never dropped",
            default_enabled: false,
        },
    }
}

/// All built-in passes in default pipeline order.
pub const ALL_PASSES: [PassId; 4] = [
    PassId::Flatten,
    PassId::RemoveEmpty,
    PassId::Simplify,
    PassId::Canonicalize,
];

impl PassId {
    pub fn from_name(name: &str) -> Option<PassId> {
        ALL_PASSES
            .into_iter()
            .find(|&id| descriptor(id).name == name)
    }
}

/// Construct a fresh instance of a built-in pass.
pub fn instantiate(id: PassId) -> Box<dyn Pass> {
    match id {
        PassId::Flatten => Box::new(Flatten),
        PassId::RemoveEmpty => Box::new(RemoveEmpty),
        PassId::Simplify => Box::new(Simplify),
        PassId::Canonicalize => Box::new(Canonicalize),
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// Reports a change (with rerun) a fixed number of times, then settles.
    struct Countdown {
        remaining: Cell<usize>,
        status: PassStatus,
    }

    impl Pass for Countdown {
        fn name(&self) -> String {
            "countdown".into()
        }

        fn apply(&self, arena: &mut ExprArena, root: ExprId) -> PassResult {
            if self.remaining.get() == 0 {
                return PassResult::new(root, false);
            }
            self.remaining.set(self.remaining.get() - 1);
            let fresh = arena.literal("x");
            PassResult {
                root: fresh,
                status: self.status,
                warnings: Vec::new(),
            }
        }
    }

    fn countdown(n: usize, status: PassStatus) -> Box<dyn Pass> {
        Box::new(Countdown {
            remaining: Cell::new(n),
            status,
        })
    }

    #[test]
    fn status_ordering() {
        assert!(PassStatus::Unchanged < PassStatus::Changed);
        assert!(PassStatus::Changed < PassStatus::ChangedNeedsRerun);
    }

    #[test]
    fn compose_escalates_any_change() {
        let mut arena = ExprArena::new();
        let root = arena.literal("a");
        let compose = Compose::new(vec![
            countdown(0, PassStatus::Changed),
            countdown(1, PassStatus::Changed),
        ]);
        let result = compose.apply(&mut arena, root);
        assert_eq!(result.status, PassStatus::ChangedNeedsRerun);
        assert_ne!(result.root, root);

        let result = compose.apply(&mut arena, result.root);
        assert_eq!(result.status, PassStatus::Unchanged);
        assert_eq!(compose.name(), "compose(countdown, countdown)");
    }

    #[test]
    fn fixpoint_converges() {
        let mut arena = ExprArena::new();
        let root = arena.literal("a");
        let fixpoint = Fixpoint::new(countdown(3, PassStatus::ChangedNeedsRerun), 10);
        let result = fixpoint.apply(&mut arena, root);
        assert_eq!(result.status, PassStatus::Changed);
        assert!(result.warnings.is_empty());

        let again = fixpoint.apply(&mut arena, result.root);
        assert_eq!(again.status, PassStatus::Unchanged);
        assert_eq!(again.root, result.root);
    }

    #[test]
    fn fixpoint_stops_on_plain_change() {
        let mut arena = ExprArena::new();
        let root = arena.literal("a");
        let fixpoint = Fixpoint::new(countdown(5, PassStatus::Changed), 10);
        let result = fixpoint.apply(&mut arena, root);
        assert_eq!(result.status, PassStatus::Changed);
        // One application only: plain `Changed` does not ask for a rerun.
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn fixpoint_cap_warns() {
        let mut arena = ExprArena::new();
        let root = arena.literal("a");
        let fixpoint = Fixpoint::new(countdown(100, PassStatus::ChangedNeedsRerun), 3);
        let result = fixpoint.apply(&mut arena, root);
        assert_eq!(result.warnings.len(), 1);
        let warning = &result.warnings[0];
        assert_eq!(warning.code, Some(codes::W0300));
        assert_eq!(
            warning.message,
            "fixpoint(countdown) did not converge after 3 iterations"
        );
        assert_ne!(result.root, root);
    }

    #[test]
    fn registry_round_trips_names() {
        for id in ALL_PASSES {
            let d = descriptor(id);
            assert_eq!(PassId::from_name(d.name), Some(id));
            assert_eq!(instantiate(id).name(), d.name);
        }
        assert_eq!(PassId::from_name("nope"), None);
        assert!(!descriptor(PassId::Canonicalize).default_enabled);
    }
}
