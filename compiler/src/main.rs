use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use indexmap::IndexSet;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use styx::ir::TreeDisplay;
use styx::pipeline::{compile, CompileResult, PipelineOptions};
use styx::pass::DEFAULT_MAX_ITERATIONS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Emit {
    /// Tree as parsed, before normalization
    Ir,
    /// Tree after the pass pipeline
    Normalized,
    Bindings,
    /// JSON Schema of the solved bindings
    Schema,
    Rust,
    Python,
    Typescript,
    /// Source hash and compiler version as JSON
    BuildInfo,
}

#[derive(Parser, Debug)]
#[command(
    name = "styx",
    version,
    about = "Styx — compiles command-line tool descriptors into typed parameter bindings"
)]
struct Cli {
    /// Input descriptor (JSON)
    descriptor: PathBuf,

    /// Output stage
    #[arg(long, value_enum, default_value_t = Emit::Bindings)]
    emit: Emit,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Fixpoint iteration cap for the pass pipeline
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// Sort and deduplicate alternatives during normalization
    #[arg(long)]
    canonicalize: bool,

    /// Log compiler stages and timing to stderr
    #[arg(long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "styx=debug" } else { "styx=warn" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(&cli) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("styx: error: {e:#}");
            ExitCode::from(2)
        }
    }
}

/// Compile and emit. `Ok(false)` when error diagnostics were produced.
fn run(cli: &Cli) -> anyhow::Result<bool> {
    let source = std::fs::read_to_string(&cli.descriptor)
        .with_context(|| format!("reading {}", cli.descriptor.display()))?;

    let options = PipelineOptions {
        max_iterations: cli.max_iterations,
        canonicalize: cli.canonicalize,
    };
    let result = compile(&source, &options);

    for diag in &result.diagnostics {
        eprintln!("styx: {diag}");
    }

    let text = render(&result, cli.emit)?;
    match &cli.output {
        Some(path) => std::fs::write(path, text)
            .with_context(|| format!("writing {}", path.display()))?,
        None => print!("{text}"),
    }

    Ok(!result.has_errors())
}

fn render(result: &CompileResult, emit: Emit) -> anyhow::Result<String> {
    let text = match emit {
        Emit::Ir => TreeDisplay::new(&result.arena, result.raw_root)
            .with_app(result.meta.as_ref())
            .to_string(),
        Emit::Normalized => TreeDisplay::new(&result.arena, result.root)
            .with_app(result.meta.as_ref())
            .to_string(),
        Emit::Bindings => result
            .bindings()
            .iter()
            .map(|b| format!("{} {b}", b.id))
            .collect::<Vec<_>>()
            .join("\n"),
        Emit::Schema => serde_json::to_string_pretty(&styx::schema::generate_schema(
            result.bindings(),
        ))
        .context("serializing schema")?,
        Emit::Rust => type_listing(result, "rust"),
        Emit::Python => type_listing(result, "python"),
        Emit::Typescript => type_listing(result, "typescript"),
        Emit::BuildInfo => return Ok(result.provenance.to_json()),
    };
    Ok(text + "\n")
}

/// Import block followed by one `name: type` line per binding.
fn type_listing(result: &CompileResult, language: &str) -> String {
    let Some(map) = styx::typemap::for_language(language) else {
        return String::new();
    };
    let mut imports: IndexSet<String> = IndexSet::new();
    let mut lines = Vec::new();
    for binding in result.bindings().iter() {
        imports.extend(map.imports(&binding.ty));
        lines.push(format!("{}: {}", binding.name, map.map(&binding.ty)));
    }
    let mut out: Vec<String> = imports.into_iter().collect();
    if !out.is_empty() {
        out.push(String::new());
    }
    out.extend(lines);
    out.join("\n")
}
