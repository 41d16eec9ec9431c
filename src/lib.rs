//! # pdf2vec
//!
//! Batch-vectorize a directory of PDF documents into a table of
//! per-paragraph embedding vectors.
//!
//! ## Why this crate?
//!
//! Feeding a document corpus into a vector store usually starts with the
//! same chore: walk a directory of PDFs, pull out readable paragraphs,
//! push each one through an embedding model, and keep track of where every
//! vector came from. This crate does exactly that chore and nothing else —
//! the output is one table whose rows are paragraphs and whose leading
//! columns say which document and which position each vector belongs to.
//!
//! ## Pipeline Overview
//!
//! ```text
//! directory of PDFs
//!  │
//!  ├─ 1. Discover   list the directory, keep *.pdf entries
//!  ├─ 2. Convert    write an HTML rendition per document (skipped when
//!  │                it already exists)
//!  ├─ 3. Extract    split each rendition into ordered paragraphs
//!  ├─ 4. Vectorize  embed each paragraph (ONNX encoder, bounded pool)
//!  └─ 5. Assemble   one table: provenance columns + vector components
//! ```
//!
//! Stages 2–4 fan out over a bounded worker pool (`num_threads`, default 1)
//! and share one error policy: strict mode aborts on the first failure,
//! tolerant mode (`ignore_errors`) records the failure, drops the unit, and
//! carries on.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2vec::{vectorize, VectorizeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Embedder resolved from PDF2VEC_MODEL / PDF2VEC_TOKENIZER
//!     let config = VectorizeConfig::default();
//!     let output = vectorize("./papers", &config).await?;
//!     println!("{} rows, {} columns", output.table.len(), output.table.columns().len());
//!     for failure in &output.failures {
//!         eprintln!("skipped: {failure}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2vec` binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only
//! deps:
//! ```toml
//! pdf2vec = { version = "0.3", default-features = false }
//! ```
//!
//! ## Table Contract
//!
//! The first four columns are always `document_name`, `paragraph_num`
//! (1-based), `num_paragraphs`, and `num_tokens`, followed by
//! `component_1..component_N` where `N` is the embedding width. Rows keep
//! a dense 0-based index; failed paragraphs are excluded, never
//! zero-filled.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod embed;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod run;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{EmptyResultPolicy, VectorizeConfig, VectorizeConfigBuilder};
pub use embed::{EmbedError, Embedder, Embedding, HashEmbedder, OnnxEmbedder};
pub use error::{ConversionError, ExtractionError, Pdf2VecError};
pub use output::{
    Document, FailureRecord, ParagraphRecord, ResultTable, RunOutput, RunStats, Stage, VectorRow,
};
pub use pipeline::convert::{DocumentConverter, PdfiumConverter};
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback};
pub use run::{vectorize, vectorize_sync, vectorize_to_csv};
