//! CLI binary for pdf2vec.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `VectorizeConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use pdf2vec::{
    vectorize, vectorize_to_csv, EmptyResultPolicy, HashEmbedder, PipelineProgressCallback,
    ProgressCallback, Stage, VectorizeConfig,
};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: one live bar that is re-armed for each
/// pipeline stage, plus per-failure log lines. Designed to work correctly
/// when units complete out-of-order (threads > 1).
struct CliProgressCallback {
    /// The single progress bar anchored at the bottom of the terminal.
    bar: ProgressBar,
    /// Failures in the current stage, shown in the bar message.
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set per stage

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Listing PDFs…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }

    /// Re-arm the bar for a stage with a known unit count.
    fn activate_stage(&self, prefix: &str, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>4}/{len} {msg}  ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.errors.store(0, Ordering::SeqCst);
        self.bar.set_length(total as u64);
        self.bar.set_position(0);
        self.bar.set_style(progress_style);
        self.bar.set_prefix(prefix.to_string());
        self.bar.set_message("errors: 0");
        self.bar.reset_eta();
    }

    fn stage_prefix(stage: Stage) -> &'static str {
        match stage {
            Stage::Conversion => "Converting",
            Stage::Extraction => "Extracting",
            Stage::Vectorization => "Vectorizing",
        }
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage, total_units: usize) {
        self.activate_stage(Self::stage_prefix(stage), total_units);
    }

    fn on_unit_complete(&self, _stage: Stage, _done: usize, _total: usize, _label: &str) {
        self.bar.inc(1);
    }

    fn on_unit_error(&self, _stage: Stage, _done: usize, _total: usize, label: &str, error: &str) {
        let errors = self.errors.fetch_add(1, Ordering::SeqCst) + 1;

        // Truncate very long error messages to keep output tidy.
        let msg = if error.len() > 80 {
            format!("{}\u{2026}", &error[..79])
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} {:<28} {}",
            red("✗"),
            label,
            red(&msg),
        ));
        self.bar.set_message(format!("errors: {errors}"));
        self.bar.inc(1);
    }

    fn on_stage_complete(&self, stage: Stage, total: usize, failures: usize) {
        let prefix = Self::stage_prefix(stage).to_lowercase();
        if failures == 0 {
            self.bar
                .println(format!("{} {prefix} completed: {total} unit(s)", green("✔")));
        } else {
            self.bar.println(format!(
                "{} {prefix} completed with {} error(s) ({total} unit(s))",
                cyan("⚠"),
                red(&failures.to_string()),
            ));
        }
        // Vectorization is the last per-unit stage; release the terminal.
        if stage == Stage::Vectorization {
            self.bar.finish_and_clear();
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Vectorize a directory, table to stdout as CSV
  pdf2vec ./papers --model model.onnx --tokenizer tokenizer.json

  # Write the table to a file
  pdf2vec ./papers -o vectors.csv

  # Tolerant run with four workers and a larger token budget
  pdf2vec ./papers -o vectors.csv --ignore-errors -j 4 --num-tokens 128

  # Force re-conversion of existing HTML renditions
  pdf2vec ./papers -o vectors.csv --reconvert

  # Smoke run without a model (deterministic hash embedder)
  pdf2vec ./papers -o vectors.csv --hash-dim 64

ENVIRONMENT VARIABLES:
  PDF2VEC_MODEL       Path to the ONNX encoder model
  PDF2VEC_TOKENIZER   Path to the matching tokenizer.json
  PDFIUM_LIB_PATH     Path to an existing libpdfium

OUTPUT:
  CSV with columns document_name, paragraph_num, num_paragraphs,
  num_tokens, component_1..component_N — one row per paragraph.
"#;

/// Vectorize a directory of PDFs into a per-paragraph embedding table.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2vec",
    version,
    about = "Vectorize a directory of PDFs into a per-paragraph embedding table",
    long_about = "Walk a directory of PDF documents, extract paragraphs via HTML renditions, \
embed each paragraph with a local ONNX encoder, and assemble one CSV table with provenance \
columns (document, paragraph index, paragraph count, token count).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Directory containing the source PDFs.
    dir: PathBuf,

    /// Write the CSV table to this file instead of stdout.
    #[arg(short, long, env = "PDF2VEC_OUTPUT")]
    output: Option<PathBuf>,

    /// Path to the ONNX encoder model.
    #[arg(long, env = "PDF2VEC_MODEL")]
    model: Option<PathBuf>,

    /// Path to the tokenizer.json matching --model.
    #[arg(long, env = "PDF2VEC_TOKENIZER")]
    tokenizer: Option<PathBuf>,

    /// Use the deterministic hash embedder with this vector width
    /// (no model files needed; for smoke runs and tests).
    #[arg(long, conflicts_with_all = ["model", "tokenizer"])]
    hash_dim: Option<usize>,

    /// Maximum token budget per paragraph.
    #[arg(long, env = "PDF2VEC_NUM_TOKENS", default_value_t = 50)]
    num_tokens: usize,

    /// Worker-pool size for the conversion/extraction/vectorization stages.
    #[arg(short = 'j', long, env = "PDF2VEC_THREADS", default_value_t = 1)]
    threads: usize,

    /// Record per-unit failures and continue instead of aborting.
    #[arg(long, env = "PDF2VEC_IGNORE_ERRORS")]
    ignore_errors: bool,

    /// Regenerate HTML renditions even when they already exist.
    #[arg(long)]
    reconvert: bool,

    /// Policy for runs producing zero rows: follow, error, allow.
    #[arg(long, value_enum, default_value = "follow")]
    empty_result: EmptyResultArg,

    /// Output structured JSON (rows + failures + stats) instead of CSV.
    #[arg(long)]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "PDF2VEC_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2VEC_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2VEC_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum EmptyResultArg {
    /// Strict runs fail on an empty result; tolerant runs return an empty table.
    Follow,
    /// Always fail on an empty result.
    Error,
    /// Always return an empty table.
    Allow,
}

impl From<EmptyResultArg> for EmptyResultPolicy {
    fn from(v: EmptyResultArg) -> Self {
        match v {
            EmptyResultArg::Follow => EmptyResultPolicy::FollowErrorMode,
            EmptyResultArg::Error => EmptyResultPolicy::Error,
            EmptyResultArg::Allow => EmptyResultPolicy::AllowEmpty,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new();
        Some(cb as Arc<dyn PipelineProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;

    // ── Run ──────────────────────────────────────────────────────────────
    if let Some(ref output_path) = cli.output {
        let stats = vectorize_to_csv(&cli.dir, output_path, &config)
            .await
            .context("Vectorization failed")?;

        if !cli.quiet {
            let failures =
                stats.failed_conversions + stats.failed_extractions + stats.failed_vectorizations;
            eprintln!(
                "{}  {} rows from {} document(s)  {}ms  →  {}",
                if failures == 0 { green("✔") } else { cyan("⚠") },
                stats.vectorized_paragraphs,
                stats.total_documents,
                stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
            if failures > 0 {
                eprintln!("   {} unit(s) failed", red(&failures.to_string()));
            }
        }
    } else {
        let output = vectorize(&cli.dir, &config)
            .await
            .context("Vectorization failed")?;

        if cli.json {
            let json =
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
            println!("{json}");
        } else {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            output
                .table
                .write_csv(&mut handle)
                .context("Failed to write to stdout")?;
            handle.flush().ok();
        }

        if !cli.quiet && !cli.json {
            eprintln!(
                "   {} rows  /  {} failure(s)  —  {}ms total",
                dim(&output.table.len().to_string()),
                dim(&output.failures.len().to_string()),
                output.stats.total_duration_ms,
            );
        }
    }

    Ok(())
}

/// Map CLI args to `VectorizeConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<VectorizeConfig> {
    let mut builder = VectorizeConfig::builder()
        .num_tokens(cli.num_tokens)
        .num_threads(cli.threads)
        .ignore_errors(cli.ignore_errors)
        .ignore_if_html_file_exists(!cli.reconvert)
        .empty_result(cli.empty_result.clone().into());

    if let Some(dim) = cli.hash_dim {
        builder = builder.embedder(Arc::new(HashEmbedder::new(dim, cli.num_tokens)));
    } else {
        if let Some(ref model) = cli.model {
            builder = builder.model_path(model.clone());
        }
        if let Some(ref tokenizer) = cli.tokenizer {
            builder = builder.tokenizer_path(tokenizer.clone());
        }
    }

    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
