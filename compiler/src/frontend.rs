// frontend.rs — Descriptor document → command-structure IR
//
// Parses a JSON tool descriptor into `AppMeta` plus an expression tree rooted
// at a sequence. The command-line template is tokenized, each token is
// destructured against the inputs indexed by `value-key`, and every
// referenced input becomes a typed node wrapped as repeat → flag prefix →
// optional.
//
// Preconditions: none (any text is accepted).
// Postconditions: always returns an arena and a root sequence. On a fatal
//   error (invalid JSON, non-object, no id/name) the root is an empty
//   sequence and `meta` is `None`.
// Failure modes: per-input problems produce error diagnostics and the input
//   is dropped; parsing continues. Ignored values produce warnings.
// Side effects: none.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::{Map, Number, Value};
use tracing::debug;

use crate::destructure::{destructure, Fragment};
use crate::diag::{codes, DiagCode, Diagnostic};
use crate::id::ExprId;
use crate::ir::{
    AppMeta, Container, ContainerKind, Documentation, Expr, ExprArena, ExprKind, NodeMeta, Output,
    OutputToken, StreamOutput,
};
use crate::tokenize::tokenize_opt;

type Object = Map<String, Value>;

// ── Public types ─────────────────────────────────────────────────────────

/// Result of parsing one descriptor.
#[derive(Debug)]
pub struct ParseResult {
    pub meta: Option<AppMeta>,
    pub arena: ExprArena,
    pub root: ExprId,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult {
    pub fn errors(&self) -> Vec<&Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error()).collect()
    }

    pub fn warnings(&self) -> Vec<&Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error()).collect()
    }
}

/// Parse descriptor text into app metadata and a command-structure tree.
pub fn parse(source: &str) -> ParseResult {
    let mut ctx = ParseCtx::new();

    let document: Value = match serde_json::from_str(source) {
        Ok(value) => value,
        Err(e) => {
            ctx.error(codes::E0001, None, format!("invalid JSON: {e}"));
            return ctx.finish_empty();
        }
    };
    let Some(descriptor) = document.as_object() else {
        ctx.error(codes::E0002, Some("/".into()), "JSON source is not an object");
        return ctx.finish_empty();
    };
    let Some(meta) = build_app_meta(descriptor) else {
        ctx.error(codes::E0003, Some("/".into()), "Descriptor is missing id/name");
        return ctx.finish_empty();
    };

    let root = ctx.parse_descriptor(descriptor, "", Some(NodeMeta::named(meta.id.clone())));
    debug!(
        id = %meta.id,
        nodes = ctx.arena.len(),
        diagnostics = ctx.diagnostics.len(),
        "parsed descriptor"
    );

    ParseResult {
        meta: Some(meta),
        arena: ctx.arena,
        root,
        diagnostics: ctx.diagnostics,
    }
}

// ── Input classification ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Primitive {
    String,
    Integer,
    Float,
    File,
    Flag,
    SubCommand,
    SubCommandUnion,
}

#[derive(Debug, Clone, Copy)]
struct InputType {
    primitive: Primitive,
    is_list: bool,
    is_optional: bool,
    is_enum: bool,
}

/// An entry of the `value-key` index: the input object plus its location.
#[derive(Debug)]
struct InputRef<'a> {
    obj: &'a Object,
    location: String,
}

impl InputRef<'_> {
    fn id(&self) -> Option<&str> {
        self.obj.get("id").and_then(Value::as_str)
    }

    fn display_id(&self) -> &str {
        self.id().unwrap_or("<unnamed>")
    }

    fn str_field(&self, key: &str) -> Option<&str> {
        self.obj.get(key).and_then(Value::as_str)
    }

    fn is_true(&self, key: &str) -> bool {
        self.obj.get(key) == Some(&Value::Bool(true))
    }
}

// ── Metadata building ────────────────────────────────────────────────────

fn str_field(obj: &Object, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

fn title_doc(title: Option<String>, description: Option<String>) -> Option<Documentation> {
    if title.is_none() && description.is_none() {
        return None;
    }
    Some(Documentation {
        title,
        description,
        ..Documentation::default()
    })
}

/// `id`, falling back to `name` when `id` is absent or null.
fn descriptor_id(obj: &Object) -> Option<&str> {
    match obj.get("id") {
        None | Some(Value::Null) => obj.get("name"),
        id => id,
    }
    .and_then(Value::as_str)
}

fn build_node_meta(obj: &Object) -> Option<NodeMeta> {
    let name = str_field(obj, "id");
    let doc = title_doc(str_field(obj, "name"), str_field(obj, "description"));
    if name.is_none() && doc.is_none() {
        return None;
    }
    Some(NodeMeta {
        name,
        doc,
        outputs: Vec::new(),
    })
}

fn build_stream(value: Option<&Value>) -> Option<StreamOutput> {
    let obj = value?.as_object()?;
    Some(StreamOutput {
        name: str_field(obj, "id")?,
        doc: title_doc(str_field(obj, "name"), str_field(obj, "description")),
    })
}

fn build_container(value: Option<&Value>) -> Option<Container> {
    let obj = value?.as_object()?;
    let kind = obj.get("type").and_then(Value::as_str).map(|t| match t {
        "docker" => ContainerKind::Docker,
        "singularity" => ContainerKind::Singularity,
        _ => ContainerKind::Other,
    });
    Some(Container {
        image: str_field(obj, "image")?,
        kind,
    })
}

fn build_app_meta(desc: &Object) -> Option<AppMeta> {
    let id = descriptor_id(desc)?.to_string();
    Some(AppMeta {
        id,
        version: str_field(desc, "tool-version"),
        doc: title_doc(str_field(desc, "name"), str_field(desc, "description")),
        authors: str_field(desc, "author").into_iter().collect(),
        urls: str_field(desc, "url").into_iter().collect(),
        container: build_container(desc.get("container-image")),
        stdout: build_stream(desc.get("stdout-output")),
        stderr: build_stream(desc.get("stderr-output")),
    })
}

/// Text of a numeric enum choice: integers without a fractional part.
fn number_text(n: &Number) -> String {
    if let Some(i) = n.as_i64() {
        i.to_string()
    } else if let Some(u) = n.as_u64() {
        u.to_string()
    } else {
        n.as_f64().map(|f| f.to_string()).unwrap_or_else(|| n.to_string())
    }
}

// ── Internal context ─────────────────────────────────────────────────────

struct ParseCtx {
    arena: ExprArena,
    diagnostics: Vec<Diagnostic>,
}

impl ParseCtx {
    fn new() -> Self {
        Self {
            arena: ExprArena::new(),
            diagnostics: Vec::new(),
        }
    }

    fn error(&mut self, code: DiagCode, location: Option<String>, message: impl Into<String>) {
        let mut diag = Diagnostic::error(message).with_code(code);
        diag.location = location;
        self.diagnostics.push(diag);
    }

    fn warning(&mut self, code: DiagCode, location: Option<String>, message: impl Into<String>) {
        let mut diag = Diagnostic::warning(message).with_code(code);
        diag.location = location;
        self.diagnostics.push(diag);
    }

    fn finish_empty(mut self) -> ParseResult {
        let root = self.arena.sequence(Vec::new(), None);
        ParseResult {
            meta: None,
            arena: self.arena,
            root,
            diagnostics: self.diagnostics,
        }
    }

    // ── Descriptor ──

    /// Build the root sequence for one (possibly nested) descriptor.
    /// `location` is the pointer prefix of `desc` in the document; `meta`
    /// becomes the sequence's metadata, extended with parsed outputs.
    fn parse_descriptor(&mut self, desc: &Object, location: &str, meta: Option<NodeMeta>) -> ExprId {
        let mut lookup: IndexMap<String, InputRef<'_>> = IndexMap::new();
        if let Some(inputs) = desc.get("inputs").and_then(Value::as_array) {
            for (index, input) in inputs.iter().enumerate() {
                let Some(obj) = input.as_object() else { continue };
                if let Some(key) = obj.get("value-key").and_then(Value::as_str) {
                    let location = format!("{location}/inputs/{index}");
                    lookup.insert(key.to_string(), InputRef { obj, location });
                }
            }
        }

        let tokens = match desc.get("command-line") {
            None => {
                self.warning(
                    codes::W0200,
                    Some(pointer_or_root(location)),
                    "descriptor has no command-line",
                );
                Vec::new()
            }
            Some(template) => match tokenize_opt(template.as_str()) {
                Ok(tokens) => tokens,
                Err(e) => {
                    self.error(
                        codes::E0200,
                        Some(format!("{location}/command-line")),
                        format!("failed to parse command-line: {e}"),
                    );
                    Vec::new()
                }
            },
        };

        let mut placed: HashSet<String> = HashSet::new();
        let mut children = Vec::new();
        for token in &tokens {
            let mut parts = Vec::new();
            for fragment in destructure(token, &lookup) {
                match fragment {
                    Fragment::Literal(text) => parts.push(self.arena.literal(text)),
                    Fragment::Payload { value: input, .. } => {
                        if let Some(node) = self.build_input(input) {
                            if let Some(id) = input.id() {
                                placed.insert(id.to_string());
                            }
                            parts.push(node);
                        }
                    }
                }
            }
            match parts.len() {
                0 => {}
                1 => children.push(parts[0]),
                _ => children.push(self.arena.sequence(parts, Some(String::new()))),
            }
        }

        let outputs = self.parse_outputs(desc, location, &lookup, &placed);
        let meta = match meta {
            Some(mut meta) => {
                meta.outputs.extend(outputs);
                Some(meta)
            }
            None if outputs.is_empty() => None,
            None => Some(NodeMeta {
                outputs,
                ..NodeMeta::default()
            }),
        };

        self.arena
            .alloc(Expr::new(ExprKind::Sequence { children, join: None }).with_meta(meta))
    }

    fn parse_outputs(
        &mut self,
        desc: &Object,
        location: &str,
        lookup: &IndexMap<String, InputRef<'_>>,
        placed: &HashSet<String>,
    ) -> Vec<Output> {
        let Some(entries) = desc.get("output-files").and_then(Value::as_array) else {
            return Vec::new();
        };

        let mut outputs = Vec::new();
        for (index, entry) in entries.iter().enumerate() {
            let Some(obj) = entry.as_object() else { continue };
            let name = str_field(obj, "id");
            let mut tokens = Vec::new();

            if let Some(template) = obj.get("path-template").and_then(Value::as_str) {
                for fragment in destructure(template, lookup) {
                    match fragment {
                        Fragment::Literal(text) if text.is_empty() => {}
                        Fragment::Literal(text) => tokens.push(OutputToken::Literal(text)),
                        Fragment::Payload { key, value: input } => {
                            let id = input.id().unwrap_or(key).to_string();
                            if !placed.contains(&id) {
                                self.warning(
                                    codes::W0201,
                                    Some(format!("{location}/output-files/{index}")),
                                    format!(
                                        "output '{}' references input '{id}' which is not on the command line",
                                        name.as_deref().unwrap_or("<unnamed>")
                                    ),
                                );
                            }
                            tokens.push(OutputToken::Input { id });
                        }
                    }
                }
            }

            outputs.push(Output {
                doc: title_doc(str_field(obj, "name"), str_field(obj, "description")),
                name,
                tokens,
            });
        }
        outputs
    }

    // ── Inputs ──

    fn build_input(&mut self, input: &InputRef<'_>) -> Option<ExprId> {
        let ty = self.input_type(input)?;
        let node = self.build_terminal(input, ty)?;
        Some(self.wrap(node, input, ty))
    }

    fn input_type(&mut self, input: &InputRef<'_>) -> Option<InputType> {
        let primitive = match input.obj.get("type") {
            None | Some(Value::Null) => {
                let diag = Diagnostic::error(format!(
                    "type is missing for input: '{}'",
                    input.display_id()
                ))
                .with_code(codes::E0100)
                .at(input.location.clone())
                .with_hint("declare one of String, Number, File, Flag");
                self.diagnostics.push(diag);
                return None;
            }
            Some(Value::Object(_)) => Primitive::SubCommand,
            Some(Value::Array(_)) => Primitive::SubCommandUnion,
            Some(Value::String(name)) => match name.as_str() {
                "String" => Primitive::String,
                "File" => Primitive::File,
                "Flag" => Primitive::Flag,
                "Number" if input.is_true("integer") => Primitive::Integer,
                "Number" => Primitive::Float,
                other => {
                    self.error(
                        codes::E0101,
                        Some(input.location.clone()),
                        format!("Unknown input type: '{other}'"),
                    );
                    return None;
                }
            },
            Some(other) => {
                self.error(
                    codes::E0101,
                    Some(input.location.clone()),
                    format!("Unknown input type: '{other}'"),
                );
                return None;
            }
        };

        if primitive == Primitive::Flag {
            return Some(InputType {
                primitive,
                is_list: false,
                is_optional: true,
                is_enum: false,
            });
        }

        let is_enum = input.obj.contains_key("value-choices");
        if primitive == Primitive::File && is_enum {
            self.error(
                codes::E0102,
                Some(input.location.clone()),
                format!("File input '{}' cannot have value-choices", input.display_id()),
            );
            return None;
        }

        Some(InputType {
            primitive,
            is_list: input.is_true("list"),
            is_optional: input.is_true("optional"),
            is_enum,
        })
    }

    fn build_terminal(&mut self, input: &InputRef<'_>, ty: InputType) -> Option<ExprId> {
        let meta = build_node_meta(input.obj);

        if ty.is_enum {
            let Some(choices) = input.obj.get("value-choices").and_then(Value::as_array) else {
                self.error(
                    codes::E0103,
                    Some(format!("{}/value-choices", input.location)),
                    format!("Invalid value-choices for '{}'", input.display_id()),
                );
                return None;
            };
            return self.build_enum(input, choices, meta);
        }

        let obj = input.obj;
        let kind = match ty.primitive {
            Primitive::String => ExprKind::Str,
            Primitive::Integer => {
                let bound = |key: &str| obj.get(key).and_then(Value::as_f64).map(|v| v.floor() as i64);
                let min = bound("minimum").map(|v| {
                    if input.is_true("exclusive-minimum") {
                        v.saturating_add(1)
                    } else {
                        v
                    }
                });
                let max = bound("maximum").map(|v| {
                    if input.is_true("exclusive-maximum") {
                        v.saturating_sub(1)
                    } else {
                        v
                    }
                });
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        self.warning(
                            codes::W0103,
                            Some(input.location.clone()),
                            format!(
                                "integer range of '{}' is empty after folding bounds ({lo}..{hi})",
                                input.display_id()
                            ),
                        );
                    }
                }
                ExprKind::Int { min, max }
            }
            // Exclusive flags are accepted but not applied to float bounds.
            Primitive::Float => ExprKind::Float {
                min: obj.get("minimum").and_then(Value::as_f64),
                max: obj.get("maximum").and_then(Value::as_f64),
            },
            Primitive::File => ExprKind::Path {
                resolve_parent: input.is_true("resolve-parent"),
                mutable: input.is_true("mutable"),
            },
            Primitive::Flag => {
                let Some(flag) = input.str_field("command-line-flag") else {
                    self.error(
                        codes::E0105,
                        Some(input.location.clone()),
                        format!("Flag input '{}' missing command-line-flag", input.display_id()),
                    );
                    return None;
                };
                let literal = self.arena.literal(flag);
                ExprKind::Optional { child: literal }
            }
            Primitive::SubCommand => {
                let nested = obj.get("type").and_then(Value::as_object)?;
                let location = format!("{}/type", input.location);
                return Some(self.parse_descriptor(nested, &location, meta));
            }
            Primitive::SubCommandUnion => return self.build_union(input, meta),
        };

        Some(self.arena.alloc(Expr::new(kind).with_meta(meta)))
    }

    fn build_enum(
        &mut self,
        input: &InputRef<'_>,
        choices: &[Value],
        meta: Option<NodeMeta>,
    ) -> Option<ExprId> {
        let mut alternatives = Vec::new();
        for (index, choice) in choices.iter().enumerate() {
            match choice {
                Value::String(s) => alternatives.push(self.arena.literal(s.as_str())),
                Value::Number(n) => alternatives.push(self.arena.literal(number_text(n))),
                other => self.warning(
                    codes::W0100,
                    Some(format!("{}/value-choices/{index}", input.location)),
                    format!("Ignoring non-string/number enum choice: {other}"),
                ),
            }
        }

        if alternatives.is_empty() {
            self.error(
                codes::E0104,
                Some(format!("{}/value-choices", input.location)),
                format!("No valid value-choices for '{}'", input.display_id()),
            );
            return None;
        }

        Some(
            self.arena
                .alloc(Expr::new(ExprKind::Alternative { children: alternatives }).with_meta(meta)),
        )
    }

    fn build_union(&mut self, input: &InputRef<'_>, meta: Option<NodeMeta>) -> Option<ExprId> {
        let alternatives = input.obj.get("type").and_then(Value::as_array)?;

        let mut nested = Vec::new();
        for (index, alternative) in alternatives.iter().enumerate() {
            let location = format!("{}/type/{index}", input.location);
            match alternative.as_object() {
                Some(obj) => nested.push((obj, location)),
                None => self.warning(
                    codes::W0101,
                    Some(location),
                    "Skipping non-object subcommand alternative",
                ),
            }
        }

        match nested.as_slice() {
            [] => {
                self.error(
                    codes::E0106,
                    Some(format!("{}/type", input.location)),
                    format!("No valid alternatives for subcommand union '{}'", input.display_id()),
                );
                None
            }
            // A single alternative stands in for the union; the input's own
            // metadata takes precedence over the alternative's name.
            [(obj, location)] => {
                let own = descriptor_id(obj).map(NodeMeta::named);
                let merged = NodeMeta::merge(own.as_ref(), meta.as_ref());
                Some(self.parse_descriptor(obj, location, merged))
            }
            many => {
                let children = many
                    .iter()
                    .map(|(obj, location)| {
                        let own = descriptor_id(obj).map(NodeMeta::named);
                        self.parse_descriptor(obj, location, own)
                    })
                    .collect();
                Some(
                    self.arena
                        .alloc(Expr::new(ExprKind::Alternative { children }).with_meta(meta)),
                )
            }
        }
    }

    // ── Wrapping ──

    /// Wrap a built node: repeat (list) → flag prefix → optional.
    /// Flag inputs already encode their optionality and are returned as is.
    fn wrap(&mut self, mut node: ExprId, input: &InputRef<'_>, ty: InputType) -> ExprId {
        if ty.primitive == Primitive::Flag {
            return node;
        }

        if ty.is_list {
            let (min, max) = match (
                self.list_bound(input, "min-list-entries"),
                self.list_bound(input, "max-list-entries"),
            ) {
                (Some(min), Some(max)) if min > max => {
                    self.warning(
                        codes::W0102,
                        Some(input.location.clone()),
                        format!(
                            "min-list-entries ({min}) exceeds max-list-entries ({max}) for '{}'; bounds ignored",
                            input.display_id()
                        ),
                    );
                    (None, None)
                }
                bounds => bounds,
            };
            node = self.arena.alloc(Expr::new(ExprKind::Repeat {
                child: node,
                join: input.str_field("list-separator").map(str::to_string),
                min,
                max,
            }));
        }

        if let Some(flag) = input.str_field("command-line-flag") {
            let separator = input.str_field("command-line-flag-separator").unwrap_or("");
            let prefix = self.arena.literal(format!("{flag}{separator}"));
            node = self.arena.sequence(vec![prefix, node], None);
        }

        if ty.is_optional {
            node = self.arena.optional(node);
        }

        node
    }

    /// A list-entry bound: a non-negative integer, else ignored with a warning.
    fn list_bound(&mut self, input: &InputRef<'_>, key: &str) -> Option<u64> {
        let value = input.obj.get(key)?;
        if let Some(n) = value.as_u64() {
            return Some(n);
        }
        self.warning(
            codes::W0102,
            Some(format!("{}/{key}", input.location)),
            format!("Ignoring invalid {key} for '{}': {value}", input.display_id()),
        );
        None
    }
}

fn pointer_or_root(location: &str) -> String {
    if location.is_empty() {
        "/".to_string()
    } else {
        location.to_string()
    }
}

// ── Tests ────────────────────────────────────────────────────────────────
