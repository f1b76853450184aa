// remove_empty.rs — Drop empty structural nodes
//
//   seq()         → removed
//   alt()         → removed
//   opt(seq())    → removed
//   rep(alt())    → removed
//
// Removal happens from the parent's child list, so the root itself always
// survives. Nodes carrying metadata are kept even when empty.

use crate::id::ExprId;
use crate::ir::{ExprArena, ExprKind};
use crate::pass::{descriptor, Pass, PassId, PassResult};

pub struct RemoveEmpty;

impl Pass for RemoveEmpty {
    fn name(&self) -> String {
        descriptor(PassId::RemoveEmpty).name.to_string()
    }

    fn apply(&self, arena: &mut ExprArena, root: ExprId) -> PassResult {
        let mut changed = false;
        let root = visit(arena, root, &mut changed);
        PassResult::new(root, changed)
    }
}

fn is_empty(arena: &ExprArena, id: ExprId) -> bool {
    match &arena[id].kind {
        ExprKind::Sequence { children, .. } | ExprKind::Alternative { children } => {
            children.is_empty()
        }
        _ => false,
    }
}

fn is_removable(arena: &ExprArena, id: ExprId) -> bool {
    let node = &arena[id];
    if node.meta.is_some() {
        return false;
    }
    match &node.kind {
        ExprKind::Optional { child } | ExprKind::Repeat { child, .. } => is_empty(arena, *child),
        _ => is_empty(arena, id),
    }
}

fn visit(arena: &mut ExprArena, id: ExprId, changed: &mut bool) -> ExprId {
    let children = arena.children(id).to_vec();
    if children.is_empty() {
        return id;
    }
    let mut visited: Vec<ExprId> = children
        .into_iter()
        .map(|child| visit(arena, child, changed))
        .collect();

    if matches!(
        arena[id].kind,
        ExprKind::Sequence { .. } | ExprKind::Alternative { .. }
    ) {
        let before = visited.len();
        visited.retain(|&child| !is_removable(arena, child));
        if visited.len() != before {
            *changed = true;
        }
    }

    arena.with_children(id, visited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Expr, NodeMeta, TreeDisplay};
    use crate::pass::PassStatus;

    #[test]
    fn drops_empty_children_and_wrappers() {
        let mut arena = ExprArena::new();
        let a = arena.literal("a");
        let empty_seq = arena.sequence(vec![], None);
        let empty_alt = arena.alternative(vec![]);
        let opt = arena.optional(empty_seq);
        let rep = arena.alloc(Expr::new(ExprKind::Repeat {
            child: empty_alt,
            join: None,
            min: None,
            max: None,
        }));
        let root = arena.sequence(vec![a, empty_seq, opt, rep, empty_alt], None);

        let result = RemoveEmpty.apply(&mut arena, root);
        assert_eq!(result.status, PassStatus::Changed);
        assert_eq!(arena.children(result.root), &[a]);
    }

    #[test]
    fn keeps_empty_nodes_with_metadata() {
        let mut arena = ExprArena::new();
        let named = arena.alloc(
            Expr::new(ExprKind::Sequence {
                children: vec![],
                join: None,
            })
            .with_meta(Some(NodeMeta::named("sub"))),
        );
        let root = arena.sequence(vec![named], None);

        let result = RemoveEmpty.apply(&mut arena, root);
        assert_eq!(result.status, PassStatus::Unchanged);
        assert_eq!(result.root, root);
    }

    #[test]
    fn empty_root_survives() {
        let mut arena = ExprArena::new();
        let root = arena.sequence(vec![], None);
        let result = RemoveEmpty.apply(&mut arena, root);
        assert_eq!(result.root, root);
        assert_eq!(result.status, PassStatus::Unchanged);
    }

    #[test]
    fn removal_cascades_bottom_up() {
        let mut arena = ExprArena::new();
        let empty = arena.sequence(vec![], None);
        let wrapper = arena.sequence(vec![empty], Some(String::new()));
        let a = arena.literal("a");
        let root = arena.sequence(vec![a, wrapper], None);

        let first = RemoveEmpty.apply(&mut arena, root);
        assert_eq!(
            TreeDisplay::new(&arena, first.root).to_string(),
            "sequence\n  literal \"a\""
        );
    }
}
