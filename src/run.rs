//! Eager (full-run) vectorization entry points and stage drivers.
//!
//! [`vectorize`] walks the four stages in order — discover, convert,
//! extract, vectorize — then assembles the table. Stages two to four share
//! one driver, [`run_units`], which owns the error policy and the worker
//! pool:
//!
//! * `num_threads == 1` — plain sequential loop. In strict mode the first
//!   failure returns before the next unit is even dispatched.
//! * `num_threads > 1`  — bounded fan-out via
//!   `stream::iter(..).buffered(n)`: up to `n` units in flight, results
//!   collected in submission order so within-document paragraph ordering
//!   survives into the table. Every unit runs its blocking collaborator
//!   call (pdfium, file I/O, ONNX inference) inside `spawn_blocking` so
//!   the async workers never stall. In strict mode in-flight siblings may
//!   still complete after the triggering failure; the run then discards
//!   their results and propagates the earliest failure.
//!
//! Units never push into shared collections: each returns
//! `Result<output, failure>` and the driver partitions on the collecting
//! side, so the only cross-thread mutable state is the progress counter
//! (an atomic).

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::stream::{self, StreamExt};
use tracing::{debug, info};

use crate::config::VectorizeConfig;
use crate::embed::{EmbedError, Embedder, OnnxEmbedder};
use crate::error::{ConversionError, ExtractionError, Pdf2VecError};
use crate::output::{
    Document, FailureRecord, ParagraphRecord, RunOutput, RunStats, Stage, VectorRow,
};
use crate::pipeline::convert::{DocumentConverter, PdfiumConverter};
use crate::pipeline::{assemble, discover, extract};
use crate::progress::{NoopProgressCallback, ProgressCallback};

/// Vectorize every PDF in a directory into a per-paragraph embedding table.
///
/// This is the primary entry point for the library.
///
/// # Arguments
/// * `dir`    — directory holding the source PDFs
/// * `config` — run configuration
///
/// # Returns
/// `Ok(RunOutput)` with the table, any captured failures (tolerant mode),
/// and the run counters.
///
/// # Errors
/// Returns `Err(Pdf2VecError)` for fatal errors: invalid source directory,
/// no usable embedder, empty result under a rejecting policy — or, with
/// `ignore_errors = false`, the first per-unit failure of any stage.
pub async fn vectorize(
    dir: impl AsRef<Path>,
    config: &VectorizeConfig,
) -> Result<RunOutput, Pdf2VecError> {
    let total_start = Instant::now();
    let dir = dir.as_ref();
    info!("starting vectorization run: {}", dir.display());

    // ── Step 1: Discover documents ───────────────────────────────────────
    let documents = discover::discover_documents(dir)?;
    let total_documents = documents.len();
    info!("found {} PDF document(s)", total_documents);

    // ── Step 2: Resolve collaborators ────────────────────────────────────
    let embedder = resolve_embedder(config)?;
    let converter = resolve_converter(config);
    let progress: ProgressCallback = config
        .progress_callback
        .clone()
        .unwrap_or_else(|| Arc::new(NoopProgressCallback));
    debug!(embedder = embedder.name(), "collaborators resolved");

    let mut failures: Vec<FailureRecord> = Vec::new();

    // ── Step 3: Conversion stage ─────────────────────────────────────────
    let stage_start = Instant::now();
    let units = conversion_units(&documents, &converter, config.ignore_if_html_file_exists);
    let (converted, stage_failures) = run_units(
        Stage::Conversion,
        units,
        config.num_threads,
        config.ignore_errors,
        &progress,
    )
    .await?;
    let failed_conversions = stage_failures.len();
    failures.extend(stage_failures);
    let conversion_duration_ms = stage_start.elapsed().as_millis() as u64;
    info!(
        "converted {}/{} documents in {}ms",
        converted.len(),
        total_documents,
        conversion_duration_ms
    );

    // ── Step 4: Extraction stage ─────────────────────────────────────────
    let stage_start = Instant::now();
    let units = extraction_units(&converted);
    let (batches, stage_failures) = run_units(
        Stage::Extraction,
        units,
        config.num_threads,
        config.ignore_errors,
        &progress,
    )
    .await?;
    let failed_extractions = stage_failures.len();
    failures.extend(stage_failures);
    // Merge preserves each document's internal paragraph order because one
    // document is one unit of work.
    let records: Vec<ParagraphRecord> = batches.into_iter().flatten().collect();
    let total_paragraphs = records.len();
    let extraction_duration_ms = stage_start.elapsed().as_millis() as u64;
    info!(
        "extracted {} paragraph(s) in {}ms",
        total_paragraphs, extraction_duration_ms
    );

    // ── Step 5: Vectorization stage ──────────────────────────────────────
    let stage_start = Instant::now();
    let units = vectorization_units(records, &embedder);
    let (rows, stage_failures) = run_units(
        Stage::Vectorization,
        units,
        config.num_threads,
        config.ignore_errors,
        &progress,
    )
    .await?;
    let failed_vectorizations = stage_failures.len();
    failures.extend(stage_failures);
    let vectorization_duration_ms = stage_start.elapsed().as_millis() as u64;
    info!(
        "vectorized {}/{} paragraph(s) in {}ms",
        rows.len(),
        total_paragraphs,
        vectorization_duration_ms
    );

    // ── Step 6: Assemble the table ───────────────────────────────────────
    let vectorized_paragraphs = rows.len();
    let table = assemble::assemble_table(
        rows,
        total_documents,
        config.empty_result,
        config.ignore_errors,
    )?;

    // ── Step 7: Compute stats ────────────────────────────────────────────
    let stats = RunStats {
        total_documents,
        converted_documents: converted.len(),
        failed_conversions,
        failed_extractions,
        total_paragraphs,
        vectorized_paragraphs,
        failed_vectorizations,
        conversion_duration_ms,
        extraction_duration_ms,
        vectorization_duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "run complete: {} rows from {} document(s), {} failure(s), {}ms total",
        table.len(),
        total_documents,
        failures.len(),
        stats.total_duration_ms
    );

    Ok(RunOutput {
        table,
        failures,
        stats,
    })
}

/// Synchronous wrapper around [`vectorize`].
///
/// Creates a temporary tokio runtime internally.
pub fn vectorize_sync(
    dir: impl AsRef<Path>,
    config: &VectorizeConfig,
) -> Result<RunOutput, Pdf2VecError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Pdf2VecError::Internal(format!("failed to create tokio runtime: {e}")))?
        .block_on(vectorize(dir, config))
}

/// Vectorize a directory and write the table as CSV.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn vectorize_to_csv(
    dir: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    config: &VectorizeConfig,
) -> Result<RunStats, Pdf2VecError> {
    let output = vectorize(dir, config).await?;
    let path = output_path.as_ref();

    let mut buffer = Vec::new();
    output.table.write_csv(&mut buffer)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Pdf2VecError::OutputWriteFailed {
                    path: path.to_path_buf(),
                    source: e,
                })?;
        }
    }

    let tmp_path = path.with_extension("csv.tmp");
    tokio::fs::write(&tmp_path, &buffer)
        .await
        .map_err(|e| Pdf2VecError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Pdf2VecError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(output.stats)
}

// ── Collaborator resolution ──────────────────────────────────────────────

/// Resolve the embedder, from most-specific to least-specific.
///
/// 1. **Pre-built embedder** (`config.embedder`) — the caller constructed
///    it entirely; used as-is. This is also the test seam.
/// 2. **Config paths** (`config.model_path` + `config.tokenizer_path`) —
///    load an [`OnnxEmbedder`] with the run's token budget.
/// 3. **Environment pair** (`PDF2VEC_MODEL` + `PDF2VEC_TOKENIZER`) — both
///    set means the execution environment (Makefile, CI) chose the model.
fn resolve_embedder(config: &VectorizeConfig) -> Result<Arc<dyn Embedder>, Pdf2VecError> {
    if let Some(ref embedder) = config.embedder {
        return Ok(Arc::clone(embedder));
    }

    if let (Some(model), Some(tokenizer)) = (&config.model_path, &config.tokenizer_path) {
        return load_onnx_embedder(model, tokenizer, config.num_tokens);
    }

    if let (Ok(model), Ok(tokenizer)) = (
        std::env::var("PDF2VEC_MODEL"),
        std::env::var("PDF2VEC_TOKENIZER"),
    ) {
        if !model.is_empty() && !tokenizer.is_empty() {
            return load_onnx_embedder(
                Path::new(&model),
                Path::new(&tokenizer),
                config.num_tokens,
            );
        }
    }

    Err(Pdf2VecError::EmbedderNotConfigured {
        hint: "Supply an embedder via VectorizeConfig::builder().embedder(..), \
               set model_path + tokenizer_path, or export PDF2VEC_MODEL and \
               PDF2VEC_TOKENIZER."
            .into(),
    })
}

fn load_onnx_embedder(
    model: &Path,
    tokenizer: &Path,
    num_tokens: usize,
) -> Result<Arc<dyn Embedder>, Pdf2VecError> {
    let embedder = OnnxEmbedder::new(model, tokenizer, num_tokens).map_err(|e| {
        Pdf2VecError::EmbedderNotConfigured {
            hint: format!(
                "loading ONNX embedder from '{}' failed: {e}",
                model.display()
            ),
        }
    })?;
    Ok(Arc::new(embedder))
}

fn resolve_converter(config: &VectorizeConfig) -> Arc<dyn DocumentConverter> {
    config
        .converter
        .clone()
        .unwrap_or_else(|| Arc::new(PdfiumConverter))
}

// ── Stage driver ─────────────────────────────────────────────────────────

/// A per-unit failure carrying both renditions the driver may need: the
/// tolerant-mode record and the strict-mode fatal error.
struct StageFailure {
    record: FailureRecord,
    fatal: Pdf2VecError,
}

impl StageFailure {
    fn conversion(document: &Document, source: ConversionError) -> Self {
        let name = document.display_name();
        Self {
            record: FailureRecord {
                stage: Stage::Conversion,
                document: name.clone(),
                paragraph_num: None,
                error: source.to_string(),
            },
            fatal: Pdf2VecError::Conversion {
                document: name,
                source,
            },
        }
    }

    fn extraction(document: &Document, source: ExtractionError) -> Self {
        let name = document.display_name();
        Self {
            record: FailureRecord {
                stage: Stage::Extraction,
                document: name.clone(),
                paragraph_num: None,
                error: source.to_string(),
            },
            fatal: Pdf2VecError::Extraction {
                document: name,
                source,
            },
        }
    }

    fn vectorization(record: &ParagraphRecord, source: EmbedError) -> Self {
        let name = record.document.display_name();
        Self {
            record: FailureRecord {
                stage: Stage::Vectorization,
                document: name.clone(),
                paragraph_num: Some(record.paragraph_num),
                error: source.to_string(),
            },
            fatal: Pdf2VecError::Vectorization {
                document: name,
                paragraph_num: record.paragraph_num,
                source,
            },
        }
    }

    fn panicked(stage: Stage, label: &str, detail: String) -> Self {
        Self {
            record: FailureRecord {
                stage,
                document: label.to_string(),
                paragraph_num: None,
                error: format!("worker panicked: {detail}"),
            },
            fatal: Pdf2VecError::Internal(format!(
                "{stage} worker panicked on '{label}': {detail}"
            )),
        }
    }
}

/// One unit of stage work: a progress label and the blocking closure.
type UnitWork<U> = (String, Box<dyn FnOnce() -> Result<U, StageFailure> + Send + 'static>);

/// Run a stage's units through the worker pool, applying the error policy.
///
/// Returns the successful outputs (submission order) and the failure
/// records captured in tolerant mode. In strict mode the earliest failure
/// is returned as the fatal error instead.
async fn run_units<U: Send + 'static>(
    stage: Stage,
    units: Vec<UnitWork<U>>,
    num_threads: usize,
    ignore_errors: bool,
    progress: &ProgressCallback,
) -> Result<(Vec<U>, Vec<FailureRecord>), Pdf2VecError> {
    let total = units.len();
    progress.on_stage_start(stage, total);

    if num_threads <= 1 {
        // Sequential path: strict mode must short-circuit before the next
        // unit is dispatched.
        let mut outputs = Vec::with_capacity(total);
        let mut failures = Vec::new();
        let mut done = 0usize;
        for (label, work) in units {
            progress.on_unit_start(stage, done, total, &label);
            let result = tokio::task::spawn_blocking(work)
                .await
                .unwrap_or_else(|e| Err(StageFailure::panicked(stage, &label, e.to_string())));
            done += 1;
            match result {
                Ok(output) => {
                    progress.on_unit_complete(stage, done, total, &label);
                    outputs.push(output);
                }
                Err(failure) => {
                    progress.on_unit_error(stage, done, total, &label, &failure.record.error);
                    if ignore_errors {
                        failures.push(failure.record);
                    } else {
                        return Err(failure.fatal);
                    }
                }
            }
        }
        progress.on_stage_complete(stage, total, failures.len());
        return Ok((outputs, failures));
    }

    let done = Arc::new(AtomicUsize::new(0));
    let results: Vec<Result<U, StageFailure>> =
        stream::iter(units.into_iter().map(|(label, work)| {
            let progress = Arc::clone(progress);
            let done = Arc::clone(&done);
            async move {
                progress.on_unit_start(stage, done.load(Ordering::SeqCst), total, &label);
                let result = tokio::task::spawn_blocking(work)
                    .await
                    .unwrap_or_else(|e| {
                        Err(StageFailure::panicked(stage, &label, e.to_string()))
                    });
                let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                match &result {
                    Ok(_) => progress.on_unit_complete(stage, finished, total, &label),
                    Err(failure) => progress.on_unit_error(
                        stage,
                        finished,
                        total,
                        &label,
                        &failure.record.error,
                    ),
                }
                result
            }
        }))
        .buffered(num_threads)
        .collect()
        .await;

    let mut outputs = Vec::with_capacity(total);
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(output) => outputs.push(output),
            Err(failure) => {
                if ignore_errors {
                    failures.push(failure.record);
                } else {
                    // In-flight siblings have already drained into
                    // `results`; their outputs are discarded and only the
                    // first captured failure propagates.
                    return Err(failure.fatal);
                }
            }
        }
    }
    progress.on_stage_complete(stage, total, failures.len());
    Ok((outputs, failures))
}

// ── Unit builders ────────────────────────────────────────────────────────

fn conversion_units(
    documents: &[Document],
    converter: &Arc<dyn DocumentConverter>,
    ignore_if_exists: bool,
) -> Vec<UnitWork<Document>> {
    documents
        .iter()
        .map(|document| {
            let label = document.display_name();
            let document = document.clone();
            let converter = Arc::clone(converter);
            let work: Box<dyn FnOnce() -> Result<Document, StageFailure> + Send> =
                Box::new(move || {
                    converter
                        .convert_to_html(&document, ignore_if_exists)
                        .map_err(|e| StageFailure::conversion(&document, e))?;
                    Ok(document)
                });
            (label, work)
        })
        .collect()
}

fn extraction_units(documents: &[Document]) -> Vec<UnitWork<Vec<ParagraphRecord>>> {
    documents
        .iter()
        .map(|document| {
            let label = document.display_name();
            let document = document.clone();
            let work: Box<dyn FnOnce() -> Result<Vec<ParagraphRecord>, StageFailure> + Send> =
                Box::new(move || {
                    extract::extract_document(&document)
                        .map_err(|e| StageFailure::extraction(&document, e))
                });
            (label, work)
        })
        .collect()
}

fn vectorization_units(
    records: Vec<ParagraphRecord>,
    embedder: &Arc<dyn Embedder>,
) -> Vec<UnitWork<VectorRow>> {
    records
        .into_iter()
        .map(|record| {
            let label = format!("{} ¶{}", record.document.display_name(), record.paragraph_num);
            let embedder = Arc::clone(embedder);
            let work: Box<dyn FnOnce() -> Result<VectorRow, StageFailure> + Send> =
                Box::new(move || {
                    let embedding = embedder
                        .vectorize(&record.text)
                        .map_err(|e| StageFailure::vectorization(&record, e))?;
                    Ok(VectorRow {
                        document_name: record.document.display_name(),
                        paragraph_num: record.paragraph_num,
                        num_paragraphs: record.num_paragraphs,
                        num_tokens: embedding.num_tokens,
                        vector: embedding.vector,
                    })
                });
            (label, work)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embed::{Embedding, HashEmbedder};
    use crate::progress::NoopProgressCallback;

    fn noop() -> ProgressCallback {
        Arc::new(NoopProgressCallback)
    }

    fn failing_unit(label: &str) -> UnitWork<usize> {
        let document = Document::new(format!("{label}.pdf"));
        (
            label.to_string(),
            Box::new(move || {
                Err(StageFailure::conversion(
                    &document,
                    ConversionError::Pdf {
                        detail: "broken".into(),
                    },
                ))
            }),
        )
    }

    fn ok_unit(label: &str, value: usize) -> UnitWork<usize> {
        (label.to_string(), Box::new(move || Ok(value)))
    }

    #[tokio::test]
    async fn sequential_strict_short_circuits() {
        let units = vec![ok_unit("a", 1), failing_unit("b"), ok_unit("c", 3)];
        let err = run_units(Stage::Conversion, units, 1, false, &noop())
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2VecError::Conversion { .. }));
    }

    #[tokio::test]
    async fn sequential_tolerant_collects_failures() {
        let units = vec![ok_unit("a", 1), failing_unit("b"), ok_unit("c", 3)];
        let (outputs, failures) = run_units(Stage::Conversion, units, 1, true, &noop())
            .await
            .unwrap();
        assert_eq!(outputs, vec![1, 3]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].document, "b.pdf");
    }

    #[tokio::test]
    async fn concurrent_tolerant_yields_same_output_set() {
        let units = vec![
            ok_unit("a", 1),
            failing_unit("b"),
            ok_unit("c", 3),
            ok_unit("d", 4),
        ];
        let (mut outputs, failures) = run_units(Stage::Conversion, units, 4, true, &noop())
            .await
            .unwrap();
        outputs.sort_unstable();
        assert_eq!(outputs, vec![1, 3, 4]);
        assert_eq!(failures.len(), 1);
    }

    #[tokio::test]
    async fn concurrent_strict_propagates_a_failure() {
        let units = vec![ok_unit("a", 1), failing_unit("b")];
        let err = run_units(Stage::Conversion, units, 2, false, &noop())
            .await
            .unwrap_err();
        assert!(matches!(err, Pdf2VecError::Conversion { .. }));
    }

    #[test]
    fn explicit_embedder_wins_over_paths() {
        struct Fixed;
        impl Embedder for Fixed {
            fn name(&self) -> &str {
                "fixed"
            }
            fn vectorize(&self, _text: &str) -> Result<Embedding, EmbedError> {
                Ok(Embedding {
                    vector: vec![0.0],
                    num_tokens: 1,
                })
            }
        }

        let config = VectorizeConfig::builder()
            .embedder(Arc::new(Fixed))
            .model_path("/nonexistent/model.onnx")
            .tokenizer_path("/nonexistent/tokenizer.json")
            .build()
            .unwrap();
        let embedder = resolve_embedder(&config).unwrap();
        assert_eq!(embedder.name(), "fixed");
    }

    #[test]
    fn unconfigured_embedder_is_an_error() {
        // Scoped to a config with no embedder and no paths; env fallback is
        // not exercised here.
        let config = VectorizeConfig::default();
        if std::env::var("PDF2VEC_MODEL").is_ok() {
            return;
        }
        let err = resolve_embedder(&config).unwrap_err();
        assert!(matches!(err, Pdf2VecError::EmbedderNotConfigured { .. }));
    }

    #[test]
    fn hash_embedder_satisfies_the_seam() {
        let config = VectorizeConfig::builder()
            .embedder(Arc::new(HashEmbedder::new(8, 50)))
            .build()
            .unwrap();
        let embedder = resolve_embedder(&config).unwrap();
        let embedding = embedder.vectorize("hello world").unwrap();
        assert_eq!(embedding.vector.len(), 8);
        assert_eq!(embedding.num_tokens, 2);
    }
}
