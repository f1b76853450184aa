// canonicalize.rs — Canonical ordering of alternatives
//
// Sorts every alternative's children by (kind, name, structural key) and
// drops children whose structure duplicates an earlier one. Two descriptors
// whose `value-choices` differ only in order normalize to the same tree.
// Not part of the default pipeline (see `PipelineOptions::canonicalize`).
//
// Children carrying metadata are never dropped as duplicates.

use std::collections::HashSet;
use std::fmt::Write;

use sha2::{Digest, Sha256};

use crate::id::ExprId;
use crate::ir::{ExprArena, ExprKind};
use crate::pass::{descriptor, Pass, PassId, PassResult};

pub struct Canonicalize;

impl Pass for Canonicalize {
    fn name(&self) -> String {
        descriptor(PassId::Canonicalize).name.to_string()
    }

    fn apply(&self, arena: &mut ExprArena, root: ExprId) -> PassResult {
        let mut changed = false;
        let root = visit(arena, root, &mut changed);
        PassResult::new(root, changed)
    }
}

/// Metadata-free structural key: kinds, attributes and children, recursively.
pub fn structural_key(arena: &ExprArena, id: ExprId) -> String {
    let mut out = String::new();
    write_key(arena, id, &mut out);
    out
}

fn write_key(arena: &ExprArena, id: ExprId, out: &mut String) {
    let opt = |v: Option<String>| v.unwrap_or_default();
    match &arena[id].kind {
        ExprKind::Literal { text } => {
            let _ = write!(out, "lit:{text}");
        }
        ExprKind::Int { min, max } => {
            let _ = write!(
                out,
                "int:{}:{}",
                opt(min.map(|v| v.to_string())),
                opt(max.map(|v| v.to_string()))
            );
        }
        ExprKind::Float { min, max } => {
            let _ = write!(
                out,
                "float:{}:{}",
                opt(min.map(|v| v.to_string())),
                opt(max.map(|v| v.to_string()))
            );
        }
        ExprKind::Str => out.push_str("str"),
        ExprKind::Path {
            resolve_parent,
            mutable,
        } => {
            let _ = write!(out, "path:{resolve_parent}:{mutable}");
        }
        ExprKind::Optional { child } => {
            out.push_str("opt:");
            write_key(arena, *child, out);
        }
        ExprKind::Repeat { child, join, .. } => {
            let _ = write!(out, "rep:{}:", join.as_deref().unwrap_or(""));
            write_key(arena, *child, out);
        }
        ExprKind::Sequence { children, join } => {
            let _ = write!(out, "seq:{}:", join.as_deref().unwrap_or(""));
            write_list(arena, children, out);
        }
        ExprKind::Alternative { children } => {
            out.push_str("alt:");
            write_list(arena, children, out);
        }
    }
}

fn write_list(arena: &ExprArena, children: &[ExprId], out: &mut String) {
    for (i, &child) in children.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        write_key(arena, child, out);
    }
}

/// SHA-256 of the structural key.
fn fingerprint(key: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&hasher.finalize());
    hash
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

    if !matches!(arena[id].kind, ExprKind::Alternative { .. }) {
        return arena.with_children(id, visited);
    }

    let mut keyed: Vec<(String, String, String, ExprId)> = visited
        .iter()
        .map(|&child| {
            let node = &arena[child];
            (
                node.kind.name().to_string(),
                node.name().unwrap_or("").to_string(),
                structural_key(arena, child),
                child,
            )
        })
        .collect();
    keyed.sort_by(|a, b| (&a.0, &a.1, &a.2).cmp(&(&b.0, &b.1, &b.2)));

    let mut seen: HashSet<[u8; 32]> = HashSet::new();
    let mut out = Vec::with_capacity(keyed.len());
    for (_, _, key, child) in keyed {
        let first = seen.insert(fingerprint(&key));
        if first || arena[child].meta.is_some() {
            out.push(child);
        }
    }

    if out != visited {
        *changed = true;
    }
    arena.with_children(id, out)
}
