// ir.rs — Command-structure intermediate representation
//
// Defines the expression tree built by the frontend, rewritten by the pass
// pipeline and consumed by the solver. All nodes produced during one
// compilation live in a single `ExprArena`; nodes refer to their children by
// `ExprId`. Rewrites never mutate a node: they allocate replacements and
// return a new root, so every intermediate tree stays valid and inspectable.
//
// Preconditions: ids passed to arena methods were allocated by that arena.
// Postconditions: allocation order gives children smaller ids than parents
//   (trees are finite and acyclic by construction).
// Failure modes: none (a foreign id panics on index, which is a caller bug).
// Side effects: none.

use std::fmt;
use std::ops::Index;

use crate::id::ExprId;

// ── Metadata ─────────────────────────────────────────────────────────────

/// Human-facing documentation attached to a node or to the app.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Documentation {
    pub title: Option<String>,
    pub description: Option<String>,
    pub authors: Vec<String>,
    pub literature: Vec<String>,
    pub urls: Vec<String>,
    pub comment: Option<String>,
}

impl Documentation {
    /// Merge two documentation blocks: scalar fields prefer `child`, list
    /// fields concatenate parent then child.
    pub fn merge(parent: &Documentation, child: &Documentation) -> Documentation {
        Documentation {
            title: child.title.clone().or_else(|| parent.title.clone()),
            description: child
                .description
                .clone()
                .or_else(|| parent.description.clone()),
            authors: concat(&parent.authors, &child.authors),
            literature: concat(&parent.literature, &child.literature),
            urls: concat(&parent.urls, &child.urls),
            comment: child.comment.clone().or_else(|| parent.comment.clone()),
        }
    }
}

fn concat<T: Clone>(a: &[T], b: &[T]) -> Vec<T> {
    a.iter().chain(b).cloned().collect()
}

/// One piece of an output path template.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputToken {
    Literal(String),
    /// Reference to the input with this id.
    Input { id: String },
}

/// A file the tool writes, described by a path template.
#[derive(Debug, Clone, PartialEq)]
pub struct Output {
    pub name: Option<String>,
    pub doc: Option<Documentation>,
    pub tokens: Vec<OutputToken>,
}

/// Metadata attached to any node. A node "carries metadata" when its
/// `meta` is `Some`, whatever the contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeMeta {
    /// Binding name hint used by the solver.
    pub name: Option<String>,
    pub doc: Option<Documentation>,
    pub outputs: Vec<Output>,
}

impl NodeMeta {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Merge parent and child metadata. The child's name, title and
    /// description win; author, literature, URL and output lists
    /// concatenate parent then child.
    pub fn merge(parent: Option<&NodeMeta>, child: Option<&NodeMeta>) -> Option<NodeMeta> {
        match (parent, child) {
            (None, None) => None,
            (Some(p), None) => Some(p.clone()),
            (None, Some(c)) => Some(c.clone()),
            (Some(p), Some(c)) => {
                let doc = match (&p.doc, &c.doc) {
                    (None, None) => None,
                    (pd, cd) => Some(Documentation::merge(
                        pd.as_ref().unwrap_or(&Documentation::default()),
                        cd.as_ref().unwrap_or(&Documentation::default()),
                    )),
                };
                Some(NodeMeta {
                    name: c.name.clone().or_else(|| p.name.clone()),
                    doc,
                    outputs: concat(&p.outputs, &c.outputs),
                })
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Docker,
    Singularity,
    Other,
}

impl fmt::Display for ContainerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerKind::Docker => write!(f, "docker"),
            ContainerKind::Singularity => write!(f, "singularity"),
            ContainerKind::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub image: String,
    pub kind: Option<ContainerKind>,
}

/// Captured standard stream of the tool.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamOutput {
    pub name: String,
    pub doc: Option<Documentation>,
}

/// Application-level metadata built from the descriptor's top-level fields.
#[derive(Debug, Clone, PartialEq)]
pub struct AppMeta {
    pub id: String,
    pub version: Option<String>,
    pub doc: Option<Documentation>,
    pub authors: Vec<String>,
    pub urls: Vec<String>,
    pub container: Option<Container>,
    pub stdout: Option<StreamOutput>,
    pub stderr: Option<StreamOutput>,
}

// ── Expressions ──────────────────────────────────────────────────────────

/// Node kinds. Structural kinds own children by id; terminal kinds are leaves.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// `join = Some("")` concatenates children into one argument; `None`
    /// keeps them as separate arguments.
    Sequence {
        children: Vec<ExprId>,
        join: Option<String>,
    },
    Optional {
        child: ExprId,
    },
    Alternative {
        children: Vec<ExprId>,
    },
    /// Inclusive count bounds.
    Repeat {
        child: ExprId,
        join: Option<String>,
        min: Option<u64>,
        max: Option<u64>,
    },
    Literal {
        text: String,
    },
    Int {
        min: Option<i64>,
        max: Option<i64>,
    },
    Float {
        min: Option<f64>,
        max: Option<f64>,
    },
    Str,
    Path {
        resolve_parent: bool,
        mutable: bool,
    },
}

impl ExprKind {
    pub fn name(&self) -> &'static str {
        match self {
            ExprKind::Sequence { .. } => "sequence",
            ExprKind::Optional { .. } => "optional",
            ExprKind::Alternative { .. } => "alternative",
            ExprKind::Repeat { .. } => "repeat",
            ExprKind::Literal { .. } => "literal",
            ExprKind::Int { .. } => "int",
            ExprKind::Float { .. } => "float",
            ExprKind::Str => "str",
            ExprKind::Path { .. } => "path",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExprKind::Literal { .. }
                | ExprKind::Int { .. }
                | ExprKind::Float { .. }
                | ExprKind::Str
                | ExprKind::Path { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub meta: Option<NodeMeta>,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self { kind, meta: None }
    }

    pub fn with_meta(mut self, meta: Option<NodeMeta>) -> Self {
        self.meta = meta;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.meta.as_ref().and_then(|m| m.name.as_deref())
    }

    pub fn literal_text(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Literal { text } => Some(text),
            _ => None,
        }
    }
}

// ── Arena ────────────────────────────────────────────────────────────────

/// Owner of every node allocated for one compilation.
#[derive(Debug, Clone, Default)]
pub struct ExprArena {
    nodes: Vec<Expr>,
}

impl ExprArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, expr: Expr) -> ExprId {
        let id = ExprId(self.nodes.len() as u32);
        self.nodes.push(expr);
        id
    }

    pub fn get(&self, id: ExprId) -> &Expr {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    // ── Convenience constructors ──

    pub fn literal(&mut self, text: impl Into<String>) -> ExprId {
        self.alloc(Expr::new(ExprKind::Literal { text: text.into() }))
    }

    pub fn sequence(&mut self, children: Vec<ExprId>, join: Option<String>) -> ExprId {
        self.alloc(Expr::new(ExprKind::Sequence { children, join }))
    }

    pub fn optional(&mut self, child: ExprId) -> ExprId {
        self.alloc(Expr::new(ExprKind::Optional { child }))
    }

    pub fn alternative(&mut self, children: Vec<ExprId>) -> ExprId {
        self.alloc(Expr::new(ExprKind::Alternative { children }))
    }

    /// Direct children of a node, in order. Terminals have none.
    pub fn children(&self, id: ExprId) -> &[ExprId] {
        match &self.get(id).kind {
            ExprKind::Sequence { children, .. } | ExprKind::Alternative { children } => children,
            ExprKind::Optional { child } | ExprKind::Repeat { child, .. } => {
                std::slice::from_ref(child)
            }
            _ => &[],
        }
    }

    /// Copy-on-write child replacement. Returns `id` itself when the child
    /// list is unchanged, otherwise a fresh node with the same attributes
    /// and metadata. For optional/repeat only the first entry is used.
    pub fn with_children(&mut self, id: ExprId, new_children: Vec<ExprId>) -> ExprId {
        if self.children(id) == new_children.as_slice() {
            return id;
        }
        let node = self.get(id);
        let kind = match &node.kind {
            ExprKind::Sequence { join, .. } => ExprKind::Sequence {
                children: new_children,
                join: join.clone(),
            },
            ExprKind::Alternative { .. } => ExprKind::Alternative {
                children: new_children,
            },
            ExprKind::Optional { .. } => match new_children.first() {
                Some(&child) => ExprKind::Optional { child },
                None => return id,
            },
            ExprKind::Repeat {
                join, min, max, ..
            } => match new_children.first() {
                Some(&child) => ExprKind::Repeat {
                    child,
                    join: join.clone(),
                    min: *min,
                    max: *max,
                },
                None => return id,
            },
            _ => return id,
        };
        let meta = node.meta.clone();
        self.alloc(Expr { kind, meta })
    }

    /// Copy of node `id` with its metadata replaced.
    pub fn with_meta(&mut self, id: ExprId, meta: Option<NodeMeta>) -> ExprId {
        if self.get(id).meta == meta {
            return id;
        }
        let kind = self.get(id).kind.clone();
        self.alloc(Expr { kind, meta })
    }

    // ── Traversal ──

    /// Pre-order traversal of the subtree rooted at `root`.
    pub fn walk(&self, root: ExprId) -> Vec<ExprId> {
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.children(id).iter().rev());
        }
        order
    }

    /// Value-carrying terminals (int, float, str, path) in pre-order.
    pub fn terminals(&self, root: ExprId) -> Vec<ExprId> {
        self.walk(root)
            .into_iter()
            .filter(|&id| {
                matches!(
                    self.get(id).kind,
                    ExprKind::Int { .. }
                        | ExprKind::Float { .. }
                        | ExprKind::Str
                        | ExprKind::Path { .. }
                )
            })
            .collect()
    }

    /// Structural equality of two subtrees: same kinds, attributes and
    /// metadata, recursively. Ids themselves are not compared.
    pub fn structurally_equal(&self, a: ExprId, b: ExprId) -> bool {
        if a == b {
            return true;
        }
        let (na, nb) = (self.get(a), self.get(b));
        if na.meta != nb.meta {
            return false;
        }
        let same_attrs = match (&na.kind, &nb.kind) {
            (ExprKind::Sequence { join: ja, .. }, ExprKind::Sequence { join: jb, .. }) => ja == jb,
            (ExprKind::Alternative { .. }, ExprKind::Alternative { .. })
            | (ExprKind::Optional { .. }, ExprKind::Optional { .. }) => true,
            (
                ExprKind::Repeat {
                    join: ja,
                    min: mina,
                    max: maxa,
                    ..
                },
                ExprKind::Repeat {
                    join: jb,
                    min: minb,
                    max: maxb,
                    ..
                },
            ) => ja == jb && mina == minb && maxa == maxb,
            (ka, kb) if ka.is_terminal() => ka == kb,
            _ => false,
        };
        if !same_attrs {
            return false;
        }
        let (ca, cb) = (self.children(a), self.children(b));
        ca.len() == cb.len()
            && ca
                .iter()
                .zip(cb)
                .all(|(&x, &y)| self.structurally_equal(x, y))
    }
}

impl Index<ExprId> for ExprArena {
    type Output = Expr;

    fn index(&self, id: ExprId) -> &Expr {
        self.get(id)
    }
}

// ── Display ──────────────────────────────────────────────────────────────

/// Indented one-node-per-line rendering of a tree, optionally preceded by
/// an app header.
pub struct TreeDisplay<'a> {
    pub arena: &'a ExprArena,
    pub root: ExprId,
    pub meta: Option<&'a AppMeta>,
}

impl<'a> TreeDisplay<'a> {
    pub fn new(arena: &'a ExprArena, root: ExprId) -> Self {
        Self {
            arena,
            root,
            meta: None,
        }
    }

    pub fn with_app(mut self, meta: Option<&'a AppMeta>) -> Self {
        self.meta = meta;
        self
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: ExprId, depth: usize) -> fmt::Result {
        let node = self.arena.get(id);
        let pad = "  ".repeat(depth);
        let name = node.name().map(|n| format!(" [{n}]")).unwrap_or_default();
        write!(f, "{pad}{}{name}", node.kind.name())?;

        match &node.kind {
            ExprKind::Literal { text } => write!(f, " \"{text}\"")?,
            ExprKind::Int { min, max } => fmt_range(f, *min, *max)?,
            ExprKind::Float { min, max } => fmt_range(f, *min, *max)?,
            ExprKind::Str => {}
            ExprKind::Path {
                resolve_parent,
                mutable,
            } => {
                let flags: Vec<&str> = [(*resolve_parent, "resolve_parent"), (*mutable, "mutable")]
                    .into_iter()
                    .filter_map(|(on, label)| on.then_some(label))
                    .collect();
                if !flags.is_empty() {
                    write!(f, " {{{}}}", flags.join(", "))?;
                }
            }
            ExprKind::Sequence { children, join } => {
                if let Some(join) = join {
                    write!(f, " join=\"{join}\"")?;
                }
                if children.is_empty() {
                    write!(f, " (empty)")?;
                }
            }
            ExprKind::Repeat { join, min, max, .. } => {
                let mut parts = Vec::new();
                if let Some(join) = join {
                    parts.push(format!("join=\"{join}\""));
                }
                if let Some(min) = min {
                    parts.push(format!("min={min}"));
                }
                if let Some(max) = max {
                    parts.push(format!("max={max}"));
                }
                if !parts.is_empty() {
                    write!(f, " {{{}}}", parts.join(", "))?;
                }
            }
            ExprKind::Optional { .. } | ExprKind::Alternative { .. } => {}
        }

        for &child in self.arena.children(id) {
            writeln!(f)?;
            self.fmt_node(f, child, depth + 1)?;
        }
        Ok(())
    }
}

fn fmt_range<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    min: Option<T>,
    max: Option<T>,
) -> fmt::Result {
    if min.is_none() && max.is_none() {
        return Ok(());
    }
    let show = |v: Option<T>| v.map(|v| v.to_string()).unwrap_or_default();
    write!(f, " ({}..{})", show(min), show(max))
}

impl fmt::Display for TreeDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(app) = self.meta {
            write!(f, "app {}", app.id)?;
            if let Some(version) = &app.version {
                write!(f, "@{version}")?;
            }
            writeln!(f)?;
            if let Some(desc) = app.doc.as_ref().and_then(|d| d.description.as_ref()) {
                writeln!(f, "  \"{desc}\"")?;
            }
            if !app.authors.is_empty() {
                writeln!(f, "  authors: {}", app.authors.join(", "))?;
            }
            if let Some(container) = &app.container {
                write!(f, "  container: {}", container.image)?;
                if let Some(kind) = container.kind {
                    write!(f, " ({kind})")?;
                }
                writeln!(f)?;
            }
            if let Some(stdout) = &app.stdout {
                writeln!(f, "  stdout: {}", stdout.name)?;
            }
            if let Some(stderr) = &app.stderr {
                writeln!(f, "  stderr: {}", stderr.name)?;
            }
            writeln!(f)?;
        }
        self.fmt_node(f, self.root, 0)
    }
}

// ── Tests ────────────────────────────────────────────────────────────────
