// schema.rs — BoundType → JSON Schema transcription
//
// Each solved binding becomes one property of a draft 2020-12 object
// schema. Optional and nullable bindings are left out of `required`;
// everything else is required.

use indexmap::IndexMap;
use serde_json::{json, Map, Value};

use crate::bindings::{BindingRegistry, BoundType, LiteralValue, ScalarKind};

pub const SCHEMA_DIALECT: &str = "https://json-schema.org/draft/2020-12/schema";

pub fn type_schema(ty: &BoundType) -> Value {
    match ty {
        BoundType::Scalar(ScalarKind::Int) => json!({ "type": "integer" }),
        BoundType::Scalar(ScalarKind::Float) => json!({ "type": "number" }),
        BoundType::Scalar(ScalarKind::Str) => json!({ "type": "string" }),
        BoundType::Scalar(ScalarKind::Path) => json!({ "type": "string", "format": "path" }),
        BoundType::Bool => json!({ "type": "boolean" }),
        BoundType::Count => json!({ "type": "integer", "minimum": 0 }),
        BoundType::Literal(LiteralValue::Int(n)) => json!({ "const": n }),
        BoundType::Literal(LiteralValue::Str(s)) => json!({ "const": s }),
        BoundType::Optional(inner) => type_schema(inner),
        BoundType::List(item) => json!({ "type": "array", "items": type_schema(item) }),
        BoundType::Struct(fields) => {
            let (properties, required) =
                object_shape(fields.iter().map(|(name, t)| (name.as_str(), t)));
            json!({ "type": "object", "properties": properties, "required": required })
        }
        BoundType::Union(variants) => {
            let one_of: Vec<Value> = variants.iter().map(|v| type_schema(&v.ty)).collect();
            json!({ "oneOf": one_of })
        }
        BoundType::Nullable(inner) => {
            json!({ "oneOf": [type_schema(inner), { "type": "null" }] })
        }
    }
}

fn object_shape<'a>(
    fields: impl Iterator<Item = (&'a str, &'a BoundType)>,
) -> (Map<String, Value>, Vec<String>) {
    let mut properties = Map::new();
    let mut required = Vec::new();
    for (name, ty) in fields {
        properties.insert(name.to_string(), type_schema(ty));
        if !ty.is_omittable() {
            required.push(name.to_string());
        }
    }
    (properties, required)
}

/// Root object schema with one property per binding name. Nested and
/// outer bindings may share a name; the later (outer) binding wins, at the
/// position of the first.
pub fn generate_schema(bindings: &BindingRegistry) -> Value {
    let mut by_name: IndexMap<&str, &BoundType> = IndexMap::new();
    for binding in bindings.iter() {
        by_name.insert(binding.name.as_str(), &binding.ty);
    }
    let (properties, required) = object_shape(by_name.into_iter());
    json!({
        "$schema": SCHEMA_DIALECT,
        "type": "object",
        "properties": properties,
        "required": required,
    })
}
