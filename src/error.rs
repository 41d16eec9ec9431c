//! Error types for the pdf2vec library.
//!
//! Two distinct layers reflect two distinct failure modes:
//!
//! * [`Pdf2VecError`] — **Fatal**: the run cannot proceed at all (source
//!   path is not a directory, no embedder configured, empty result under a
//!   rejecting policy), or a per-unit failure occurred while
//!   `ignore_errors = false`. Returned as `Err(Pdf2VecError)` from the
//!   top-level `vectorize*` functions.
//!
//! * Per-stage collaborator errors ([`ConversionError`], [`ExtractionError`],
//!   [`crate::embed::EmbedError`]) — **Per-unit**: one document or paragraph
//!   failed. In tolerant mode they are captured as
//!   [`crate::output::FailureRecord`]s and the unit is excluded from
//!   downstream stages; in strict mode they are wrapped with their
//!   document/paragraph context into the matching [`Pdf2VecError`] variant
//!   and abort the run.
//!
//! The separation lets callers decide their own tolerance: abort on the
//! first bad document, or collect every failure for a post-run report while
//! the surviving paragraphs still make it into the table.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2vec library.
///
/// Per-unit failures in tolerant mode use
/// [`crate::output::FailureRecord`] and are returned in
/// [`crate::output::RunOutput::failures`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Pdf2VecError {
    // ── Directory errors (always fatal, regardless of error mode) ────────
    /// Source directory was not found at the given path.
    #[error("source directory not found: '{path}'\nCheck the path exists and is readable.")]
    DirectoryNotFound { path: PathBuf },

    /// Source path exists but is not a directory.
    #[error("source path is not a directory: '{path}'")]
    NotADirectory { path: PathBuf },

    /// The directory exists but listing it failed (permissions, I/O).
    #[error("failed to list directory '{path}': {source}")]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Per-unit errors promoted to fatal in strict mode ─────────────────
    /// A document failed PDF-to-HTML conversion.
    #[error("conversion failed for '{document}': {source}")]
    Conversion {
        document: String,
        #[source]
        source: ConversionError,
    },

    /// A document's rendition could not be segmented into paragraphs.
    #[error("paragraph extraction failed for '{document}': {source}")]
    Extraction {
        document: String,
        #[source]
        source: ExtractionError,
    },

    /// A paragraph failed embedding computation.
    #[error("vectorization failed for paragraph {paragraph_num} of '{document}': {source}")]
    Vectorization {
        document: String,
        paragraph_num: usize,
        #[source]
        source: crate::embed::EmbedError,
    },

    // ── Assembly errors ──────────────────────────────────────────────────
    /// No paragraph survived to the assembly stage.
    ///
    /// Raised only when the configured
    /// [`crate::config::EmptyResultPolicy`] rejects empty output.
    #[error("run over {documents} document(s) produced no vector rows")]
    EmptyResult { documents: usize },

    /// Two rows of one run carried embedding vectors of different widths.
    ///
    /// The embedder contract fixes the vector width for the lifetime of the
    /// run, so this indicates a broken [`crate::embed::Embedder`]
    /// implementation.
    #[error("inconsistent vector width: expected {expected} components, got {got} for paragraph {paragraph_num} of '{document}'")]
    InconsistentVectorWidth {
        document: String,
        paragraph_num: usize,
        expected: usize,
        got: usize,
    },

    // ── Embedder errors ──────────────────────────────────────────────────
    /// No embedder was supplied, or the configured one could not be
    /// loaded.
    #[error("no usable embedder.\n{hint}")]
    EmbedderNotConfigured { hint: String },

    // ── I/O errors ───────────────────────────────────────────────────────
    /// Could not create or write the output table file.
    #[error("failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ────────────────────────────────────────────────────────
    /// Unexpected internal error (worker panic, poisoned state).
    #[error("internal error: {0}")]
    Internal(String),
}

/// A failure while producing a document's HTML rendition.
///
/// Returned by [`crate::pipeline::convert::DocumentConverter`]
/// implementations; the pipeline adds the document context.
#[derive(Debug, Error)]
pub enum ConversionError {
    /// The PDF could not be opened or parsed.
    #[error("failed to open PDF: {detail}")]
    Pdf { detail: String },

    /// The PDF is encrypted and cannot be read without a password.
    #[error("PDF is encrypted")]
    Encrypted,

    /// Writing the rendition to disk failed.
    #[error("failed to write rendition: {0}")]
    Io(#[from] std::io::Error),
}

/// A failure while segmenting a rendition into paragraphs.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The rendition file does not exist.
    ///
    /// Under `ignore_if_html_file_exists = true` a stale directory can hold
    /// PDFs whose conversion failed in an earlier tolerant run; those
    /// documents surface here.
    #[error("rendition not found at '{path}' (was conversion skipped or failed?)")]
    MissingRendition { path: PathBuf },

    /// Reading the rendition failed.
    #[error("failed to read rendition '{path}': {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
