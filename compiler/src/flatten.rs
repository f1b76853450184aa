// flatten.rs — Inline nested sequences and alternatives
//
//   seq(a, seq(b, c))  → seq(a, b, c)   when both joins are equal
//   alt(a, alt(b, c))  → alt(a, b, c)
//
// A nested node carrying metadata is never inlined; its name and docs
// would be lost.

use crate::id::ExprId;
use crate::ir::{ExprArena, ExprKind};
use crate::pass::{descriptor, Pass, PassId, PassResult};

pub struct Flatten;

impl Pass for Flatten {
    fn name(&self) -> String {
        descriptor(PassId::Flatten).name.to_string()
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

    let mut out = Vec::with_capacity(visited.len());
    match &arena[id].kind {
        ExprKind::Sequence { join, .. } => {
            for child in visited {
                let node = &arena[child];
                match &node.kind {
                    ExprKind::Sequence {
                        children: inner,
                        join: inner_join,
                    } if node.meta.is_none() && inner_join == join => {
                        *changed = true;
                        out.extend_from_slice(inner);
                    }
                    _ => out.push(child),
                }
            }
        }
        ExprKind::Alternative { .. } => {
            for child in visited {
                let node = &arena[child];
                match &node.kind {
                    ExprKind::Alternative { children: inner } if node.meta.is_none() => {
                        *changed = true;
                        out.extend_from_slice(inner);
                    }
                    _ => out.push(child),
                }
            }
        }
        _ => out = visited,
    }

    arena.with_children(id, out)
}
