use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use styx::*;

// KPI-aligned benchmark scenarios over the sample descriptors.

const BET: &str = include_str!("../descriptors/bet.json");
const REGISTER: &str = include_str!("../descriptors/register.json");

fn scenarios() -> [(&'static str, &'static str); 2] {
    [("bet", BET), ("register", REGISTER)]
}

/// Descriptor scaling generator: `n_inputs` mixed inputs on one command line,
/// every third one a two-way subcommand union.
fn generate_scaling_descriptor(n_inputs: usize) -> String {
    let mut inputs = Vec::new();
    let mut command_line = String::from("tool");

    for i in 0..n_inputs {
        let key = format!("[IN_{i}]");
        command_line.push(' ');
        command_line.push_str(&key);
        let input = match i % 3 {
            0 => serde_json::json!({
                "id": format!("file_{i}"), "value-key": key, "type": "File",
                "list": true, "optional": true, "command-line-flag": "-i"
            }),
            1 => serde_json::json!({
                "id": format!("level_{i}"), "value-key": key, "type": "Number",
                "integer": true, "minimum": 0, "maximum": 9,
                "value-choices": [1, 3, 5, 3]
            }),
            _ => serde_json::json!({
                "id": format!("mode_{i}"), "value-key": key, "type": [
                    {"id": "on", "command-line": "on [V]",
                     "inputs": [{"id": "v", "value-key": "[V]", "type": "String"}]},
                    {"id": "off", "command-line": "off"}
                ]
            }),
        };
        inputs.push(input);
    }

    serde_json::json!({
        "name": "tool",
        "command-line": command_line,
        "inputs": inputs,
    })
    .to_string()
}

// KPI: frontend parse latency for representative descriptors.
fn bench_kpi_parse_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("kpi/parse_latency");

    for (name, source) in scenarios() {
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, source| {
            b.iter(|| {
                let result = frontend::parse(black_box(source));
                black_box(&result.arena);
            });
        });
    }

    group.finish();
}

// KPI: full compile latency (parse -> normalize -> solve).
fn bench_kpi_full_compile_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("kpi/full_compile_latency");
    let options = pipeline::PipelineOptions::default();

    for (name, source) in scenarios() {
        group.bench_with_input(BenchmarkId::from_parameter(name), source, |b, source| {
            b.iter(|| black_box(pipeline::compile(black_box(source), &options)));
        });
    }

    group.finish();
}

// KPI: phase-level latency on the larger sample.
fn bench_kpi_phase_latency(c: &mut Criterion) {
    let options = pipeline::PipelineOptions::default();

    {
        let mut group = c.benchmark_group("kpi/phase_latency/normalize");
        group.bench_function("register", |b| {
            b.iter_batched(
                || frontend::parse(REGISTER),
                |mut parsed| {
                    let result = pipeline::normalize(&mut parsed.arena, parsed.root, &options);
                    black_box(result.root);
                },
                BatchSize::SmallInput,
            );
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("kpi/phase_latency/solve");
        group.bench_function("register", |b| {
            b.iter_batched(
                || {
                    let mut parsed = frontend::parse(REGISTER);
                    let root = pipeline::normalize(&mut parsed.arena, parsed.root, &options).root;
                    (parsed.arena, root)
                },
                |(arena, root)| {
                    let result = solver::solve(&arena, root, solver::SolveOptions::default());
                    black_box(result.bindings.len());
                },
                BatchSize::SmallInput,
            );
        });
        group.finish();
    }
}

// KPI: full compile scaling vs number of inputs.
fn bench_kpi_compile_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("kpi/compile_scaling");
    let options = pipeline::PipelineOptions::default();

    for n_inputs in [1_usize, 10, 50, 200] {
        let source = generate_scaling_descriptor(n_inputs);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}inputs", n_inputs)),
            &source,
            |b, source| {
                b.iter(|| black_box(pipeline::compile(black_box(source.as_str()), &options)));
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_kpi_parse_latency,
    bench_kpi_full_compile_latency,
    bench_kpi_phase_latency,
    bench_kpi_compile_scaling,
);
criterion_main!(benches);
