// typemap.rs — BoundType → target-language type syntax
//
// Downstream generators ask a `TypeMap` for the spelling of a solved type
// and the import lines that spelling needs. Structs and tagged unions map
// to each target's dynamic value type; precise records are a generator's
// job, not the type map's.
//
// Preconditions: none.
// Postconditions: `imports` is deduplicated and in first-use order.
// Failure modes: none.
// Side effects: none.

use indexmap::IndexSet;

use crate::bindings::{BoundType, LiteralValue, ScalarKind};

pub trait TypeMap {
    /// Target language name, as used on the CLI.
    fn language(&self) -> &'static str;
    fn map(&self, ty: &BoundType) -> String;
    fn imports(&self, ty: &BoundType) -> Vec<String>;
}

/// Visit `ty` and every type nested inside it, parents first.
fn each_type(ty: &BoundType, f: &mut dyn FnMut(&BoundType)) {
    f(ty);
    match ty {
        BoundType::Optional(inner) | BoundType::List(inner) | BoundType::Nullable(inner) => {
            each_type(inner, f)
        }
        BoundType::Struct(fields) => fields.values().for_each(|t| each_type(t, f)),
        BoundType::Union(variants) => variants.iter().for_each(|v| each_type(&v.ty, f)),
        _ => {}
    }
}

fn collect_imports(ty: &BoundType, pick: impl Fn(&BoundType) -> &'static [&'static str]) -> Vec<String> {
    let mut out: IndexSet<&'static str> = IndexSet::new();
    each_type(ty, &mut |t| out.extend(pick(t).iter().copied()));
    out.into_iter().map(str::to_string).collect()
}

// ── Rust ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct RustTypeMap;

impl TypeMap for RustTypeMap {
    fn language(&self) -> &'static str {
        "rust"
    }

    fn map(&self, ty: &BoundType) -> String {
        match ty {
            BoundType::Scalar(kind) => match kind {
                ScalarKind::Int => "i64",
                ScalarKind::Float => "f64",
                ScalarKind::Str => "String",
                ScalarKind::Path => "PathBuf",
            }
            .into(),
            BoundType::Bool => "bool".into(),
            BoundType::Count => "usize".into(),
            BoundType::Literal(LiteralValue::Int(_)) => "i64".into(),
            BoundType::Literal(LiteralValue::Str(_)) => "String".into(),
            BoundType::Optional(inner) | BoundType::Nullable(inner) => {
                format!("Option<{}>", self.map(inner))
            }
            BoundType::List(item) => format!("Vec<{}>", self.map(item)),
            BoundType::Struct(_) => "HashMap<String, Value>".into(),
            BoundType::Union(_) => "Value".into(),
        }
    }

    fn imports(&self, ty: &BoundType) -> Vec<String> {
        collect_imports(ty, |t| match t {
            BoundType::Scalar(ScalarKind::Path) => &["use std::path::PathBuf;"],
            BoundType::Struct(_) => &[
                "use std::collections::HashMap;",
                "use serde_json::Value;",
            ],
            BoundType::Union(_) => &["use serde_json::Value;"],
            _ => &[],
        })
    }
}

// ── Python ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct PythonTypeMap;

impl TypeMap for PythonTypeMap {
    fn language(&self) -> &'static str {
        "python"
    }

    fn map(&self, ty: &BoundType) -> String {
        match ty {
            BoundType::Scalar(kind) => match kind {
                ScalarKind::Int => "int",
                ScalarKind::Float => "float",
                ScalarKind::Str => "str",
                ScalarKind::Path => "pathlib.Path",
            }
            .into(),
            BoundType::Bool => "bool".into(),
            BoundType::Count => "int".into(),
            BoundType::Literal(LiteralValue::Int(n)) => format!("Literal[{n}]"),
            BoundType::Literal(LiteralValue::Str(s)) => format!("Literal[{s:?}]"),
            BoundType::Optional(inner) | BoundType::Nullable(inner) => {
                format!("{} | None", self.map(inner))
            }
            BoundType::List(item) => format!("list[{}]", self.map(item)),
            BoundType::Struct(_) => "dict[str, Any]".into(),
            BoundType::Union(variants) => variants
                .iter()
                .map(|v| self.map(&v.ty))
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }

    fn imports(&self, ty: &BoundType) -> Vec<String> {
        collect_imports(ty, |t| match t {
            BoundType::Scalar(ScalarKind::Path) => &["import pathlib"],
            BoundType::Struct(_) => &["from typing import Any"],
            BoundType::Literal(_) => &["from typing import Literal"],
            _ => &[],
        })
    }
}

// ── TypeScript ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
pub struct TypeScriptTypeMap;

impl TypeMap for TypeScriptTypeMap {
    fn language(&self) -> &'static str {
        "typescript"
    }

    fn map(&self, ty: &BoundType) -> String {
        match ty {
            BoundType::Scalar(ScalarKind::Int | ScalarKind::Float) | BoundType::Count => {
                "number".into()
            }
            BoundType::Scalar(ScalarKind::Str | ScalarKind::Path) => "string".into(),
            BoundType::Bool => "boolean".into(),
            BoundType::Literal(LiteralValue::Int(n)) => n.to_string(),
            BoundType::Literal(LiteralValue::Str(s)) => format!("{s:?}"),
            BoundType::Optional(inner) => format!("{} | undefined", self.map(inner)),
            BoundType::Nullable(inner) => format!("{} | null", self.map(inner)),
            BoundType::List(item) => match item.as_ref() {
                BoundType::Optional(_) | BoundType::Nullable(_) | BoundType::Union(_) => {
                    format!("({})[]", self.map(item))
                }
                _ => format!("{}[]", self.map(item)),
            },
            BoundType::Struct(fields) => {
                if fields.is_empty() {
                    return "{}".into();
                }
                let parts: Vec<String> = fields
                    .iter()
                    .map(|(name, t)| format!("{}: {}", property_key(name), self.map(t)))
                    .collect();
                format!("{{ {} }}", parts.join("; "))
            }
            BoundType::Union(variants) => variants
                .iter()
                .map(|v| self.map(&v.ty))
                .collect::<Vec<_>>()
                .join(" | "),
        }
    }

    fn imports(&self, _ty: &BoundType) -> Vec<String> {
        Vec::new()
    }
}

/// Quote keys that are not plain identifiers (`@type`, `out-file`).
fn property_key(name: &str) -> String {
    let plain = name
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '$')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$');
    if plain {
        name.to_string()
    } else {
        format!("{name:?}")
    }
}

/// Type map for a CLI language name.
pub fn for_language(name: &str) -> Option<Box<dyn TypeMap>> {
    match name {
        "rust" => Some(Box::new(RustTypeMap)),
        "python" => Some(Box::new(PythonTypeMap)),
        "typescript" => Some(Box::new(TypeScriptTypeMap)),
        _ => None,
    }
}
