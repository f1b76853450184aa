// Property-based tests for compiler invariants.
//
// Four categories:
// 1. Template handling: tokenizer and destructure round-trips
// 2. Normalization: the default pipeline is idempotent once converged
// 3. Solver determinism: identical trees solve to identical bindings
// 4. Union solving: boolean pairs collapse, mixed unions are tagged
//
// Uses proptest with explicit configuration to prevent CI flakiness.

use indexmap::IndexMap;
use proptest::prelude::*;

use styx::bindings::{BoundType, LiteralValue};
use styx::destructure::{destructure, reassemble};
use styx::id::ExprId;
use styx::ir::{Expr, ExprArena, ExprKind, NodeMeta};
use styx::pass::PassStatus;
use styx::pipeline::{normalize, PipelineOptions};
use styx::solver::{solve, solve_with, DefaultNaming, SolveOptions, SolveResult, DISCRIMINATOR};
use styx::tokenize::tokenize;

// ── Tree generator ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Shape {
    Lit(String),
    Str,
    Int,
    /// `true` joins with the empty string.
    Seq(Vec<Shape>, bool),
    Alt(Vec<Shape>),
    Opt(Box<Shape>),
    Rep(Box<Shape>),
    Named(Box<Shape>, String),
}

fn arb_shape() -> impl Strategy<Value = Shape> {
    let leaf = prop_oneof![
        "[a-z0-9-]{1,4}".prop_map(Shape::Lit),
        Just(Shape::Str),
        Just(Shape::Int),
    ];
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            (prop::collection::vec(inner.clone(), 0..4), any::<bool>())
                .prop_map(|(children, joined)| Shape::Seq(children, joined)),
            prop::collection::vec(inner.clone(), 0..4).prop_map(Shape::Alt),
            inner.clone().prop_map(|s| Shape::Opt(Box::new(s))),
            inner.clone().prop_map(|s| Shape::Rep(Box::new(s))),
            (inner, "[a-z]{1,3}").prop_map(|(s, name)| Shape::Named(Box::new(s), name)),
        ]
    })
}

/// A shape that never builds to a bare literal node.
fn arb_non_literal() -> impl Strategy<Value = Shape> {
    prop_oneof![
        Just(Shape::Str),
        Just(Shape::Int),
        "[a-z]{1,3}".prop_map(|name| Shape::Named(Box::new(Shape::Str), name)),
        arb_shape().prop_map(|s| Shape::Opt(Box::new(s))),
        prop::collection::vec(arb_shape(), 0..3).prop_map(|c| Shape::Seq(c, false)),
    ]
}

fn build(arena: &mut ExprArena, shape: &Shape) -> ExprId {
    match shape {
        Shape::Lit(text) => arena.literal(text.as_str()),
        Shape::Str => arena.alloc(Expr::new(ExprKind::Str)),
        Shape::Int => arena.alloc(Expr::new(ExprKind::Int { min: None, max: None })),
        Shape::Seq(children, joined) => {
            let ids = children.iter().map(|c| build(arena, c)).collect();
            arena.sequence(ids, joined.then(String::new))
        }
        Shape::Alt(children) => {
            let ids = children.iter().map(|c| build(arena, c)).collect();
            arena.alternative(ids)
        }
        Shape::Opt(inner) => {
            let child = build(arena, inner);
            arena.optional(child)
        }
        Shape::Rep(inner) => {
            let child = build(arena, inner);
            arena.alloc(Expr::new(ExprKind::Repeat {
                child,
                join: None,
                min: None,
                max: None,
            }))
        }
        Shape::Named(inner, name) => {
            let id = build(arena, inner);
            arena.with_meta(id, Some(NodeMeta::named(name.as_str())))
        }
    }
}

fn render(result: &SolveResult) -> Vec<String> {
    result
        .bindings
        .iter()
        .map(|b| format!("{} {} {b}", b.id, b.node))
        .collect()
}

// ── Template handling ───────────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 200,
        max_shrink_iters: 200,
        .. ProptestConfig::default()
    })]

    #[test]
    fn plain_words_tokenize_to_themselves(
        words in prop::collection::vec("[a-zA-Z0-9_.=\\[\\]-]{1,8}", 0..6),
        gap in "[ \t]{1,3}",
    ) {
        let template = words.join(&gap);
        prop_assert_eq!(tokenize(&template).unwrap(), words);
    }

    #[test]
    fn destructure_reassembles_token(token in "[\\[\\]ABx.]{0,16}") {
        let mut lookup = IndexMap::new();
        lookup.insert("[AB]".to_string(), 1);
        lookup.insert("[A]".to_string(), 2);
        lookup.insert("x".to_string(), 3);
        lookup.insert(String::new(), 4);
        let fragments = destructure(&token, &lookup);
        prop_assert_eq!(reassemble(&fragments), token);
    }
}

// ── Normalization, solving ──────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 100,
        max_shrink_iters: 100,
        .. ProptestConfig::default()
    })]

    #[test]
    fn normalization_is_idempotent(shape in arb_shape()) {
        let mut arena = ExprArena::new();
        let root = build(&mut arena, &shape);
        let options = PipelineOptions::default();

        let once = normalize(&mut arena, root, &options);
        prop_assume!(once.warnings.is_empty());
        let twice = normalize(&mut arena, once.root, &options);
        prop_assert_eq!(twice.status, PassStatus::Unchanged);
        prop_assert_eq!(twice.root, once.root);
        prop_assert!(twice.warnings.is_empty());
    }

    #[test]
    fn canonical_normalization_is_idempotent(shape in arb_shape()) {
        let mut arena = ExprArena::new();
        let root = build(&mut arena, &shape);
        let options = PipelineOptions { canonicalize: true, ..PipelineOptions::default() };

        let once = normalize(&mut arena, root, &options);
        prop_assume!(once.warnings.is_empty());
        let twice = normalize(&mut arena, once.root, &options);
        prop_assert!(arena.structurally_equal(once.root, twice.root));
    }

    #[test]
    fn solving_is_deterministic(shape in arb_shape()) {
        let mut arena = ExprArena::new();
        let root = build(&mut arena, &shape);

        let fresh_a = solve(&arena, root, SolveOptions::default());
        let fresh_b = solve(&arena, root, SolveOptions::default());
        prop_assert_eq!(render(&fresh_a), render(&fresh_b));

        let mut naming = DefaultNaming::new();
        let reused_a = solve_with(&arena, root, &mut naming);
        let reused_b = solve_with(&arena, root, &mut naming);
        prop_assert_eq!(render(&reused_a), render(&fresh_a));
        prop_assert_eq!(render(&reused_a), render(&reused_b));
    }

    #[test]
    fn at_most_one_binding_per_node(shape in arb_shape()) {
        let mut arena = ExprArena::new();
        let root = build(&mut arena, &shape);
        let result = solve(&arena, root, SolveOptions::default());
        let mut nodes: Vec<ExprId> = result.bindings.iter().map(|b| b.node).collect();
        let total = nodes.len();
        nodes.sort();
        nodes.dedup();
        prop_assert_eq!(nodes.len(), total);
    }

    #[test]
    fn boolean_pairs_collapse(
        pair in prop_oneof![Just(("0", "1")), Just(("true", "false"))],
        swap in any::<bool>(),
        name in "[a-z]{1,5}",
    ) {
        let (a, b) = if swap { (pair.1, pair.0) } else { pair };
        let mut arena = ExprArena::new();
        let la = arena.literal(a);
        let lb = arena.literal(b);
        let alt = arena.alloc(
            Expr::new(ExprKind::Alternative { children: vec![la, lb] })
                .with_meta(Some(NodeMeta::named(name.as_str()))),
        );
        let result = solve(&arena, alt, SolveOptions::default());
        prop_assert_eq!(&result.root_type, &Some(BoundType::Bool));
        prop_assert_eq!(result.resolve(alt).map(|b| b.name.clone()), Some(name));
    }

    #[test]
    fn mixed_unions_are_tagged(
        literals in prop::collection::vec("-{0,2}[a-z0-9]{1,4}", 0..3),
        others in prop::collection::vec(arb_non_literal(), 1..4),
    ) {
        let mut arena = ExprArena::new();
        let mut children = Vec::new();
        for text in &literals {
            children.push(arena.literal(text.as_str()));
        }
        for shape in &others {
            children.push(build(&mut arena, shape));
        }
        let alt = arena.alternative(children.clone());

        let result = solve(&arena, alt, SolveOptions::default());
        let Some(BoundType::Union(variants)) = result.root_type else {
            panic!("expected a union");
        };
        prop_assert_eq!(variants.len(), children.len());

        let mut names: Vec<&str> = variants.iter().map(|v| v.name.as_str()).collect();
        names.sort();
        names.dedup();
        prop_assert_eq!(names.len(), variants.len());

        for (variant, &child) in variants.iter().zip(&children) {
            if arena[child].literal_text().is_some() {
                prop_assert!(variant.ty.is_literal());
                continue;
            }
            let BoundType::Struct(fields) = &variant.ty else {
                panic!("non-literal variant {} is not a struct", variant.name);
            };
            let (first, tag) = fields.first().unwrap();
            prop_assert_eq!(first.as_str(), DISCRIMINATOR);
            prop_assert_eq!(tag, &BoundType::Literal(LiteralValue::Str(variant.name.clone())));
        }
    }
}
