// simplify.rs — Local algebraic simplifications
//
//   opt(opt(T))       → opt(T)
//   rep(rep(T))       → rep(T)        join: outer else inner
//                                     min: larger of both, max: smaller of both
//                                     skipped when the merged min exceeds max
//   seq(lit a, lit b) → seq(lit ab)   only under an empty or absent join
//   seq(T)            → T             metadata merged onto T
//   alt(T)            → T             only when the alternative has no metadata
//
// Metadata is merged, never dropped: when two nodes fuse, the inner node's
// name and docs win and list fields concatenate outer then inner.

use crate::id::ExprId;
use crate::ir::{Expr, ExprArena, ExprKind, NodeMeta};
use crate::pass::{descriptor, Pass, PassId, PassResult};

pub struct Simplify;

impl Pass for Simplify {
    fn name(&self) -> String {
        descriptor(PassId::Simplify).name.to_string()
    }

    fn apply(&self, arena: &mut ExprArena, root: ExprId) -> PassResult {
        let mut changed = false;
        let root = visit(arena, root, &mut changed);
        PassResult::new(root, changed)
    }
}

fn visit(arena: &mut ExprArena, id: ExprId, changed: &mut bool) -> ExprId {
    let children = arena.children(id).to_vec();
    if children.is_empty() {
        return id;
    }
    let visited: Vec<ExprId> = children
        .into_iter()
        .map(|child| visit(arena, child, changed))
        .collect();

    match arena[id].kind.clone() {
        ExprKind::Optional { .. } => {
            let inner = visited[0];
            if let ExprKind::Optional { child } = arena[inner].kind {
                *changed = true;
                let meta = NodeMeta::merge(arena[id].meta.as_ref(), arena[inner].meta.as_ref());
                return arena.alloc(Expr::new(ExprKind::Optional { child }).with_meta(meta));
            }
            arena.with_children(id, visited)
        }
        ExprKind::Repeat {
            join, min, max, ..
        } => {
            let inner = visited[0];
            if let ExprKind::Repeat {
                child,
                join: inner_join,
                min: inner_min,
                max: inner_max,
            } = arena[inner].kind.clone()
            {
                let merged_min = merge_bound(min, inner_min, std::cmp::max);
                let merged_max = merge_bound(max, inner_max, std::cmp::min);
                if !matches!((merged_min, merged_max), (Some(lo), Some(hi)) if lo > hi) {
                    *changed = true;
                    let meta =
                        NodeMeta::merge(arena[id].meta.as_ref(), arena[inner].meta.as_ref());
                    let kind = ExprKind::Repeat {
                        child,
                        join: join.or(inner_join),
                        min: merged_min,
                        max: merged_max,
                    };
                    return arena.alloc(Expr::new(kind).with_meta(meta));
                }
            }
            arena.with_children(id, visited)
        }
        ExprKind::Sequence { join, .. } => {
            let merge_literals = matches!(join.as_deref(), None | Some(""));
            let mut out: Vec<ExprId> = Vec::with_capacity(visited.len());
            for child in visited {
                if merge_literals {
                    if let Some(&prev) = out.last() {
                        if let Some(text) = adjacent_literals(arena, prev, child) {
                            *changed = true;
                            let merged = arena.literal(text);
                            if let Some(last) = out.last_mut() {
                                *last = merged;
                            }
                            continue;
                        }
                    }
                }
                out.push(child);
            }

            if let [only] = out.as_slice() {
                *changed = true;
                let only = *only;
                let meta = NodeMeta::merge(arena[id].meta.as_ref(), arena[only].meta.as_ref());
                return arena.with_meta(only, meta);
            }
            arena.with_children(id, out)
        }
        ExprKind::Alternative { .. } => {
            if visited.len() == 1 && arena[id].meta.is_none() {
                *changed = true;
                return visited[0];
            }
            arena.with_children(id, visited)
        }
        _ => id,
    }
}

/// Concatenated text when both nodes are metadata-free literals.
fn adjacent_literals(arena: &ExprArena, a: ExprId, b: ExprId) -> Option<String> {
    let (na, nb) = (&arena[a], &arena[b]);
    if na.meta.is_some() || nb.meta.is_some() {
        return None;
    }
    Some(format!("{}{}", na.literal_text()?, nb.literal_text()?))
}

/// Combine an outer and inner repeat bound; an absent bound defers to the
/// present one.
fn merge_bound(outer: Option<u64>, inner: Option<u64>, pick: fn(u64, u64) -> u64) -> Option<u64> {
    match (outer, inner) {
        (Some(a), Some(b)) => Some(pick(a, b)),
        (a, b) => a.or(b),
    }
}
