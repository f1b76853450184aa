// bindings.rs — Solved parameter bindings and their types
//
// `BoundType` is the closed type grammar the solver infers from a normalized
// tree. A `Binding` names one typed node; the `BindingRegistry` indexes
// bindings by id (in creation order) and by originating node.
//
// Preconditions: none (types only).
// Postconditions: a registry holds at most one binding per node.
// Failure modes: none.
// Side effects: none.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;

use crate::id::{BindingId, ExprId};

// ── Types ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    Int,
    Float,
    Str,
    Path,
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScalarKind::Int => "int",
            ScalarKind::Float => "float",
            ScalarKind::Str => "str",
            ScalarKind::Path => "path",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LiteralValue {
    Int(i64),
    Str(String),
}

impl fmt::Display for LiteralValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LiteralValue::Int(n) => write!(f, "{n}"),
            LiteralValue::Str(s) => write!(f, "\"{s}\""),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundVariant {
    pub name: String,
    pub ty: BoundType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundType {
    Scalar(ScalarKind),
    Bool,
    /// Non-negative occurrence count.
    Count,
    Literal(LiteralValue),
    Optional(Box<BoundType>),
    List(Box<BoundType>),
    /// Fields in insertion order.
    Struct(IndexMap<String, BoundType>),
    /// Variants in declaration order.
    Union(Vec<BoundVariant>),
    Nullable(Box<BoundType>),
}

impl BoundType {
    pub fn optional(inner: BoundType) -> Self {
        BoundType::Optional(Box::new(inner))
    }

    pub fn list(item: BoundType) -> Self {
        BoundType::List(Box::new(item))
    }

    pub fn nullable(inner: BoundType) -> Self {
        BoundType::Nullable(Box::new(inner))
    }

    pub fn is_literal(&self) -> bool {
        matches!(self, BoundType::Literal(_))
    }

    /// A value of this type may be left out entirely.
    pub fn is_omittable(&self) -> bool {
        matches!(self, BoundType::Optional(_) | BoundType::Nullable(_))
    }
}

impl fmt::Display for BoundType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self, 0))
    }
}

fn render(ty: &BoundType, indent: usize) -> String {
    let pad = "  ".repeat(indent);
    let inner = |t: &BoundType| render(t, indent + 1);
    match ty {
        BoundType::Scalar(kind) => kind.to_string(),
        BoundType::Bool => "bool".into(),
        BoundType::Count => "count".into(),
        BoundType::Literal(value) => value.to_string(),
        BoundType::Optional(t) => format!("optional<{}>", inner(t)),
        BoundType::List(t) => format!("list<{}>", inner(t)),
        BoundType::Nullable(t) => format!("nullable<{}>", inner(t)),
        BoundType::Struct(fields) => {
            if fields.is_empty() {
                return "struct {}".into();
            }
            if let (1, Some((name, t))) = (fields.len(), fields.first()) {
                return format!("struct {{ {name}: {} }}", render(t, indent));
            }
            let lines: Vec<String> = fields
                .iter()
                .map(|(name, t)| format!("{pad}  {name}: {}", inner(t)))
                .collect();
            format!("struct {{\n{}\n{pad}}}", lines.join("\n"))
        }
        BoundType::Union(variants) => {
            if variants.is_empty() {
                return "union {}".into();
            }
            if variants.iter().all(|v| v.ty.is_literal()) {
                let parts: Vec<String> = variants.iter().map(|v| v.ty.to_string()).collect();
                return parts.join(" | ");
            }
            let lines: Vec<String> = variants
                .iter()
                .map(|v| format!("{pad}  | {}: {}", v.name, inner(&v.ty)))
                .collect();
            format!("union {{\n{}\n{pad}}}", lines.join("\n"))
        }
    }
}

// ── Bindings ─────────────────────────────────────────────────────────────

/// A named, typed parameter derived from one tree node.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub id: BindingId,
    /// Originating node in the solved tree's arena.
    pub node: ExprId,
    pub name: String,
    pub ty: BoundType,
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.ty)
    }
}

/// Bindings indexed by id (creation order) and by originating node.
#[derive(Debug, Clone, Default)]
pub struct BindingRegistry {
    bindings: IndexMap<BindingId, Binding>,
    by_node: HashMap<ExprId, BindingId>,
}

impl BindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a binding. A later binding for the same node replaces the
    /// node lookup entry.
    pub fn insert(&mut self, binding: Binding) {
        self.by_node.insert(binding.node, binding.id);
        self.bindings.insert(binding.id, binding);
    }

    pub fn get(&self, id: BindingId) -> Option<&Binding> {
        self.bindings.get(&id)
    }

    /// The binding solved for `node`, if the node carries a type.
    pub fn resolve(&self, node: ExprId) -> Option<&Binding> {
        self.by_node.get(&node).and_then(|id| self.bindings.get(id))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.values()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────
