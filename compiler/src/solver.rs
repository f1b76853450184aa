// solver.rs — Structural type inference over a normalized tree
//
// Walks the tree bottom-up, computing an optional `BoundType` per node and
// registering a named `Binding` for every node that carries a type (bare
// literals carry none). Alternatives of a boolean literal pair collapse to
// `bool`; mixed alternatives get an injected `@type` discriminator.
//
// Preconditions: `root` belongs to `arena`.
// Postconditions: at most one binding per node; bindings appear in
//   post-order. Given the same tree and strategy instance, names and ids
//   are identical across calls (the strategy is reset on entry).
// Failure modes: none.
// Side effects: resets and advances the naming strategy's counter.

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::debug;

use crate::bindings::{
    Binding, BindingRegistry, BoundType, BoundVariant, LiteralValue, ScalarKind,
};
use crate::id::{BindingId, ExprId, IdAllocator};
use crate::ir::{ExprArena, ExprKind};

/// Field injected into tagged union variants.
pub const DISCRIMINATOR: &str = "@type";

// ── Naming ───────────────────────────────────────────────────────────────

/// Chooses binding names and identifiers.
pub trait NamingStrategy {
    /// Name for `node`, given the structural path of names above it.
    fn name_for(&mut self, arena: &ExprArena, node: ExprId, path: &[String]) -> String;
    fn fresh_id(&mut self) -> BindingId;
    /// Called at the start of every solve.
    fn reset(&mut self) {}
}

/// Nearest explicit name: the node's own, else through optional/repeat
/// wrappers, else the first named non-literal child of a sequence.
pub fn deep_name(arena: &ExprArena, node: ExprId) -> Option<String> {
    let expr = &arena[node];
    if let Some(name) = expr.name() {
        return Some(name.to_string());
    }
    match &expr.kind {
        ExprKind::Optional { child } | ExprKind::Repeat { child, .. } => deep_name(arena, *child),
        ExprKind::Sequence { children, .. } => children
            .iter()
            .filter(|&&c| !matches!(arena[c].kind, ExprKind::Literal { .. }))
            .find_map(|&c| deep_name(arena, c)),
        _ => None,
    }
}

/// Deep name, else the last path segment, else `param_N`. Ids and
/// synthetic names share one counter.
#[derive(Debug, Default)]
pub struct DefaultNaming {
    counter: IdAllocator,
}

impl DefaultNaming {
    pub fn new() -> Self {
        Self::default()
    }
}

impl NamingStrategy for DefaultNaming {
    fn name_for(&mut self, arena: &ExprArena, node: ExprId, path: &[String]) -> String {
        deep_name(arena, node)
            .or_else(|| path.last().cloned())
            .unwrap_or_else(|| format!("param_{}", self.counter.alloc()))
    }

    fn fresh_id(&mut self) -> BindingId {
        self.counter.alloc_binding()
    }

    fn reset(&mut self) {
        self.counter.reset();
    }
}

// ── Public API ───────────────────────────────────────────────────────────

#[derive(Default)]
pub struct SolveOptions {
    /// Defaults to [`DefaultNaming`].
    pub naming: Option<Box<dyn NamingStrategy>>,
}

#[derive(Debug)]
pub struct SolveResult {
    pub bindings: BindingRegistry,
    /// Type of the root node, `None` when the tree carries no information.
    pub root_type: Option<BoundType>,
}

impl SolveResult {
    pub fn resolve(&self, node: ExprId) -> Option<&Binding> {
        self.bindings.resolve(node)
    }
}

pub fn solve(arena: &ExprArena, root: ExprId, options: SolveOptions) -> SolveResult {
    let mut naming = options
        .naming
        .unwrap_or_else(|| Box::new(DefaultNaming::new()));
    solve_with(arena, root, naming.as_mut())
}

/// Solve with a caller-owned strategy, so one instance can be reused.
pub fn solve_with(arena: &ExprArena, root: ExprId, naming: &mut dyn NamingStrategy) -> SolveResult {
    naming.reset();
    let mut solver = Solver {
        arena,
        naming,
        registry: BindingRegistry::new(),
    };
    let root_type = solver.solve_node(root, &[]);
    debug!(bindings = solver.registry.len(), "solved bindings");
    SolveResult {
        bindings: solver.registry,
        root_type,
    }
}

// ── Internal ─────────────────────────────────────────────────────────────

struct Solver<'a> {
    arena: &'a ExprArena,
    naming: &'a mut dyn NamingStrategy,
    registry: BindingRegistry,
}

fn extend(path: &[String], segment: String) -> Vec<String> {
    let mut next = path.to_vec();
    next.push(segment);
    next
}

/// Integer literal when the text is a canonical integer, else a string.
fn literal_value(text: &str) -> LiteralValue {
    match text.parse::<i64>() {
        Ok(n) if n.to_string() == text => LiteralValue::Int(n),
        _ => LiteralValue::Str(text.to_string()),
    }
}

fn is_boolean_pair(variants: &[BoundVariant]) -> bool {
    let token = |v: &BoundVariant| match &v.ty {
        BoundType::Literal(LiteralValue::Int(0)) => Some("0"),
        BoundType::Literal(LiteralValue::Int(1)) => Some("1"),
        BoundType::Literal(LiteralValue::Str(s)) => match s.as_str() {
            "0" => Some("0"),
            "1" => Some("1"),
            "false" => Some("false"),
            "true" => Some("true"),
            _ => None,
        },
        _ => None,
    };
    match variants {
        [a, b] => matches!(
            (token(a), token(b)),
            (Some("0"), Some("1"))
                | (Some("1"), Some("0"))
                | (Some("false"), Some("true"))
                | (Some("true"), Some("false"))
        ),
        _ => false,
    }
}

/// Suffix `base` with `_2`, `_3`, ... until it is unused.
fn unique_name(base: String, used: &mut HashSet<String>) -> String {
    let mut name = base.clone();
    let mut n = 2;
    while !used.insert(name.clone()) {
        name = format!("{base}_{n}");
        n += 1;
    }
    name
}

impl Solver<'_> {
    fn bind(&mut self, node: ExprId, name: String, ty: BoundType) -> BoundType {
        let id = self.naming.fresh_id();
        self.registry.insert(Binding {
            id,
            node,
            name,
            ty: ty.clone(),
        });
        ty
    }

    fn solve_node(&mut self, node: ExprId, path: &[String]) -> Option<BoundType> {
        let arena = self.arena;
        let name = self.naming.name_for(arena, node, path);

        match &arena[node].kind {
            ExprKind::Literal { .. } => None,

            ExprKind::Optional { child } => {
                let ty = match self.solve_node(*child, &extend(path, name.clone())) {
                    None => BoundType::Bool,
                    Some(inner) => BoundType::optional(inner),
                };
                Some(self.bind(node, name, ty))
            }

            ExprKind::Repeat { child, .. } => {
                let ty = match self.solve_node(*child, &extend(path, name.clone())) {
                    None => BoundType::Count,
                    Some(item) => BoundType::list(item),
                };
                Some(self.bind(node, name, ty))
            }

            ExprKind::Sequence { children, .. } => {
                let mut fields: IndexMap<String, BoundType> = IndexMap::new();
                for &child in children {
                    let child_name = self.naming.name_for(arena, child, path);
                    if let Some(ty) = self.solve_node(child, &extend(path, child_name.clone())) {
                        fields.insert(child_name, ty);
                    }
                }
                match fields.len() {
                    0 => None,
                    1 => fields.into_values().next(),
                    _ => Some(self.bind(node, name, BoundType::Struct(fields))),
                }
            }

            ExprKind::Alternative { children } => {
                let ty = self.solve_alternative(children, path);
                Some(self.bind(node, name, ty))
            }

            ExprKind::Int { .. } => Some(self.bind(node, name, BoundType::Scalar(ScalarKind::Int))),
            ExprKind::Float { .. } => {
                Some(self.bind(node, name, BoundType::Scalar(ScalarKind::Float)))
            }
            ExprKind::Str => Some(self.bind(node, name, BoundType::Scalar(ScalarKind::Str))),
            ExprKind::Path { .. } => {
                Some(self.bind(node, name, BoundType::Scalar(ScalarKind::Path)))
            }
        }
    }

    fn solve_alternative(&mut self, children: &[ExprId], path: &[String]) -> BoundType {
        let arena = self.arena;
        let mut used = HashSet::new();
        let mut variants = Vec::with_capacity(children.len());

        for (i, &alt) in children.iter().enumerate() {
            let text = arena[alt].literal_text();
            let ty = self
                .solve_node(alt, &extend(path, format!("variant_{i}")))
                .unwrap_or_else(|| match text {
                    Some(t) => BoundType::Literal(literal_value(t)),
                    None => BoundType::Bool,
                });
            let base = match text {
                Some(t) => t.trim_start_matches('-').to_string(),
                None => arena[alt]
                    .name()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("variant_{i}")),
            };
            variants.push((
                BoundVariant {
                    name: unique_name(base, &mut used),
                    ty,
                },
                alt,
            ));
        }

        let plain: Vec<BoundVariant> = variants.iter().map(|(v, _)| v.clone()).collect();
        if is_boolean_pair(&plain) {
            return BoundType::Bool;
        }
        if plain.iter().all(|v| v.ty.is_literal()) {
            return BoundType::Union(plain);
        }

        BoundType::Union(
            variants
                .into_iter()
                .map(|(variant, alt)| tag_variant(arena, variant, alt))
                .collect(),
        )
    }
}

/// Inject the `@type` discriminator as the first field of a non-literal
/// variant, wrapping non-struct types in a synthetic struct.
fn tag_variant(arena: &ExprArena, variant: BoundVariant, node: ExprId) -> BoundVariant {
    let BoundVariant { name, ty } = variant;
    let tag = BoundType::Literal(LiteralValue::Str(name.clone()));
    let mut fields = IndexMap::new();
    let ty = match ty {
        BoundType::Literal(_) => ty,
        BoundType::Struct(existing) => {
            fields.insert(DISCRIMINATOR.to_string(), tag);
            for (key, value) in existing {
                if key != DISCRIMINATOR {
                    fields.insert(key, value);
                }
            }
            BoundType::Struct(fields)
        }
        other => {
            let field = deep_name(arena, node).unwrap_or_else(|| "value".to_string());
            fields.insert(DISCRIMINATOR.to_string(), tag);
            fields.insert(field, other);
            BoundType::Struct(fields)
        }
    };
    BoundVariant { name, ty }
}

// ── Tests ────────────────────────────────────────────────────────────────
