//! End-to-end pipeline tests.
//!
//! These tests run the whole pipeline against synthetic inputs: fake PDF
//! files whose "paragraphs" are the lines of the file, a stub converter
//! that renders them to real HTML renditions, and the deterministic hash
//! embedder. No pdfium library or ONNX model is needed, so they run
//! everywhere `cargo test` does.

use pdf2vec::{
    vectorize, vectorize_to_csv, ConversionError, Document, DocumentConverter, EmbedError,
    Embedder, Embedding, EmptyResultPolicy, HashEmbedder, Pdf2VecError, Stage, VectorizeConfig,
};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Write a fake PDF whose paragraphs are the given lines.
fn write_pdf_stub(dir: &Path, name: &str, paragraphs: &[&str]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, paragraphs.join("\n")).unwrap();
    path
}

/// Converter stub: reads the fake PDF's lines and writes one `<p>` per
/// line. Tracks attempted documents and actual (non-skipped) conversions.
struct StubConverter {
    conversions: AtomicUsize,
    attempts: Mutex<Vec<String>>,
    fail: HashSet<String>,
}

impl StubConverter {
    fn new() -> Arc<Self> {
        Self::failing([])
    }

    fn failing(names: impl IntoIterator<Item = &'static str>) -> Arc<Self> {
        Arc::new(Self {
            conversions: AtomicUsize::new(0),
            attempts: Mutex::new(Vec::new()),
            fail: names.into_iter().map(String::from).collect(),
        })
    }

    fn conversions(&self) -> usize {
        self.conversions.load(Ordering::SeqCst)
    }

    fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }
}

impl DocumentConverter for StubConverter {
    fn convert_to_html(
        &self,
        document: &Document,
        ignore_if_exists: bool,
    ) -> Result<PathBuf, ConversionError> {
        self.attempts.lock().unwrap().push(document.display_name());

        if self.fail.contains(&document.display_name()) {
            return Err(ConversionError::Pdf {
                detail: "stub conversion failure".into(),
            });
        }

        let rendition = document.rendition_path();
        if ignore_if_exists && rendition.exists() {
            return Ok(rendition);
        }

        self.conversions.fetch_add(1, Ordering::SeqCst);
        let text = std::fs::read_to_string(document.path())?;
        let body: String = text
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(|l| format!("<p>{l}</p>\n"))
            .collect();
        std::fs::write(&rendition, format!("<html><body>\n{body}</body></html>\n"))?;
        Ok(rendition)
    }
}

/// Embedder that fails on paragraphs containing a marker word.
struct PoisonEmbedder {
    inner: HashEmbedder,
}

impl Embedder for PoisonEmbedder {
    fn name(&self) -> &str {
        "poison"
    }

    fn vectorize(&self, text: &str) -> Result<Embedding, EmbedError> {
        if text.contains("poison") {
            return Err(EmbedError::Model("poisoned paragraph".into()));
        }
        self.inner.vectorize(text)
    }
}

fn config_with(converter: Arc<StubConverter>) -> pdf2vec::VectorizeConfigBuilder {
    VectorizeConfig::builder()
        .embedder(Arc::new(HashEmbedder::new(8, 50)))
        .converter(converter)
}

// ── Discovery & empty results ────────────────────────────────────────────────

#[tokio::test]
async fn non_pdf_directory_tolerant_yields_empty_table() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("notes.txt"), "not a pdf").unwrap();

    let config = config_with(StubConverter::new())
        .ignore_errors(true)
        .build()
        .unwrap();
    let output = vectorize(tmp.path(), &config).await.unwrap();
    assert_eq!(output.table.len(), 0);
    assert!(output.failures.is_empty());
    // Provenance columns survive even with no rows.
    assert_eq!(output.table.columns().len(), 4);
}

#[tokio::test]
async fn non_pdf_directory_strict_is_empty_result_error() {
    let tmp = tempfile::tempdir().unwrap();
    std::fs::write(tmp.path().join("notes.txt"), "not a pdf").unwrap();

    let config = config_with(StubConverter::new()).build().unwrap();
    let err = vectorize(tmp.path(), &config).await.unwrap_err();
    assert!(matches!(err, Pdf2VecError::EmptyResult { .. }));
}

#[tokio::test]
async fn allow_empty_policy_overrides_strict_mode() {
    let tmp = tempfile::tempdir().unwrap();

    let config = config_with(StubConverter::new())
        .empty_result(EmptyResultPolicy::AllowEmpty)
        .build()
        .unwrap();
    let output = vectorize(tmp.path(), &config).await.unwrap();
    assert!(output.table.is_empty());
}

#[tokio::test]
async fn missing_directory_is_fatal_in_any_mode() {
    let config = config_with(StubConverter::new())
        .ignore_errors(true)
        .build()
        .unwrap();
    let err = vectorize("/no/such/dir", &config).await.unwrap_err();
    assert!(matches!(err, Pdf2VecError::DirectoryNotFound { .. }));
}

// ── Paragraph accounting ─────────────────────────────────────────────────────

#[tokio::test]
async fn single_document_produces_one_row_per_paragraph() {
    let tmp = tempfile::tempdir().unwrap();
    write_pdf_stub(tmp.path(), "paper.pdf", &["alpha", "beta", "gamma"]);

    let config = config_with(StubConverter::new()).build().unwrap();
    let output = vectorize(tmp.path(), &config).await.unwrap();

    assert_eq!(output.table.len(), 3);
    let mut nums: Vec<usize> = output
        .table
        .rows()
        .iter()
        .map(|r| r.paragraph_num)
        .collect();
    nums.sort_unstable();
    assert_eq!(nums, vec![1, 2, 3]);
    assert!(output.table.rows().iter().all(|r| r.num_paragraphs == 3));
    assert!(output
        .table
        .rows()
        .iter()
        .all(|r| r.document_name == "paper.pdf"));
}

#[tokio::test]
async fn row_count_sums_paragraphs_across_documents() {
    let tmp = tempfile::tempdir().unwrap();
    write_pdf_stub(tmp.path(), "a.pdf", &["one", "two"]);
    write_pdf_stub(tmp.path(), "b.pdf", &["three", "four", "five"]);

    let config = config_with(StubConverter::new()).build().unwrap();
    let output = vectorize(tmp.path(), &config).await.unwrap();
    assert_eq!(output.table.len(), 5);
    assert_eq!(output.stats.total_paragraphs, 5);
    assert_eq!(output.stats.vectorized_paragraphs, 5);
}

#[tokio::test]
async fn token_counts_stay_within_budget() {
    let tmp = tempfile::tempdir().unwrap();
    write_pdf_stub(
        tmp.path(),
        "long.pdf",
        &["one two three four five six seven eight"],
    );

    let config = VectorizeConfig::builder()
        .embedder(Arc::new(HashEmbedder::new(8, 4)))
        .converter(StubConverter::new())
        .num_tokens(4)
        .build()
        .unwrap();
    let output = vectorize(tmp.path(), &config).await.unwrap();
    assert!(output.table.rows().iter().all(|r| r.num_tokens <= 4));
}

// ── Column contract ──────────────────────────────────────────────────────────

#[tokio::test]
async fn leading_columns_are_the_provenance_contract() {
    let tmp = tempfile::tempdir().unwrap();
    write_pdf_stub(tmp.path(), "doc.pdf", &["hello world"]);

    let config = config_with(StubConverter::new()).build().unwrap();
    let output = vectorize(tmp.path(), &config).await.unwrap();

    let columns = output.table.columns();
    assert_eq!(
        &columns[..4],
        &[
            "document_name".to_string(),
            "paragraph_num".to_string(),
            "num_paragraphs".to_string(),
            "num_tokens".to_string(),
        ]
    );
    assert_eq!(columns[4], "component_1");
    assert_eq!(columns.len(), 4 + 8);
}

// ── Conversion idempotence ───────────────────────────────────────────────────

#[tokio::test]
async fn second_run_skips_existing_renditions() {
    let tmp = tempfile::tempdir().unwrap();
    write_pdf_stub(tmp.path(), "doc.pdf", &["cached paragraph"]);

    let converter = StubConverter::new();
    let config = config_with(Arc::clone(&converter)).build().unwrap();

    let first = vectorize(tmp.path(), &config).await.unwrap();
    let second = vectorize(tmp.path(), &config).await.unwrap();

    assert_eq!(converter.conversions(), 1, "rendition regenerated on re-run");
    assert_eq!(first.table.rows(), second.table.rows());
}

#[tokio::test]
async fn reconvert_regenerates_renditions() {
    let tmp = tempfile::tempdir().unwrap();
    write_pdf_stub(tmp.path(), "doc.pdf", &["fresh paragraph"]);

    let converter = StubConverter::new();
    let config = config_with(Arc::clone(&converter))
        .ignore_if_html_file_exists(false)
        .build()
        .unwrap();

    vectorize(tmp.path(), &config).await.unwrap();
    vectorize(tmp.path(), &config).await.unwrap();
    assert_eq!(converter.conversions(), 2);
}

// ── Error policy ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn strict_sequential_stops_before_the_next_document() {
    let tmp = tempfile::tempdir().unwrap();
    write_pdf_stub(tmp.path(), "a_bad.pdf", &["doomed"]);
    write_pdf_stub(tmp.path(), "b_good.pdf", &["never reached"]);

    let converter = StubConverter::failing(["a_bad.pdf"]);
    let config = config_with(Arc::clone(&converter)).build().unwrap();

    let err = vectorize(tmp.path(), &config).await.unwrap_err();
    assert!(matches!(err, Pdf2VecError::Conversion { .. }));
    // Discovery sorts by name, so the failing document ran first and the
    // run never dispatched the second.
    assert_eq!(converter.attempts(), vec!["a_bad.pdf"]);
}

#[tokio::test]
async fn strict_concurrent_never_returns_a_table() {
    let tmp = tempfile::tempdir().unwrap();
    write_pdf_stub(tmp.path(), "a_bad.pdf", &["doomed"]);
    write_pdf_stub(tmp.path(), "b_good.pdf", &["fine"]);

    let converter = StubConverter::failing(["a_bad.pdf"]);
    let config = config_with(converter).num_threads(4).build().unwrap();

    let err = vectorize(tmp.path(), &config).await.unwrap_err();
    assert!(matches!(err, Pdf2VecError::Conversion { .. }));
}

#[tokio::test]
async fn tolerant_mode_drops_failing_document_and_records_it() {
    let tmp = tempfile::tempdir().unwrap();
    write_pdf_stub(tmp.path(), "bad.pdf", &["doomed"]);
    write_pdf_stub(tmp.path(), "good.pdf", &["kept one", "kept two"]);

    let converter = StubConverter::failing(["bad.pdf"]);
    let config = config_with(converter).ignore_errors(true).build().unwrap();

    let output = vectorize(tmp.path(), &config).await.unwrap();
    assert_eq!(output.table.len(), 2);
    assert_eq!(output.failures.len(), 1);
    assert_eq!(output.failures[0].stage, Stage::Conversion);
    assert_eq!(output.failures[0].document, "bad.pdf");
    assert_eq!(output.stats.failed_conversions, 1);
}

#[tokio::test]
async fn tolerant_mode_drops_failing_paragraph_only() {
    let tmp = tempfile::tempdir().unwrap();
    write_pdf_stub(tmp.path(), "doc.pdf", &["good start", "poison here", "good end"]);

    let config = VectorizeConfig::builder()
        .embedder(Arc::new(PoisonEmbedder {
            inner: HashEmbedder::new(8, 50),
        }))
        .converter(StubConverter::new())
        .ignore_errors(true)
        .build()
        .unwrap();

    let output = vectorize(tmp.path(), &config).await.unwrap();
    assert_eq!(output.table.len(), 2);
    assert_eq!(output.failures.len(), 1);
    assert_eq!(output.failures[0].stage, Stage::Vectorization);
    assert_eq!(output.failures[0].paragraph_num, Some(2));
    assert_eq!(output.stats.failed_vectorizations, 1);
    // The failing paragraph is excluded, not zero-filled.
    let nums: HashSet<usize> = output
        .table
        .rows()
        .iter()
        .map(|r| r.paragraph_num)
        .collect();
    assert_eq!(nums, HashSet::from([1, 3]));
}

// ── Thread-count invariance ──────────────────────────────────────────────────

#[tokio::test]
async fn thread_count_does_not_change_the_row_set() {
    let tmp = tempfile::tempdir().unwrap();
    write_pdf_stub(tmp.path(), "a.pdf", &["alpha one", "alpha two"]);
    write_pdf_stub(tmp.path(), "b.pdf", &["beta one"]);
    write_pdf_stub(tmp.path(), "c.pdf", &["gamma one", "gamma two", "gamma three"]);

    let sequential = {
        let config = config_with(StubConverter::new()).num_threads(1).build().unwrap();
        vectorize(tmp.path(), &config).await.unwrap()
    };
    let concurrent = {
        let config = config_with(StubConverter::new()).num_threads(4).build().unwrap();
        vectorize(tmp.path(), &config).await.unwrap()
    };

    let key = |r: &pdf2vec::VectorRow| (r.document_name.clone(), r.paragraph_num);
    let mut a: Vec<_> = sequential.table.rows().to_vec();
    let mut b: Vec<_> = concurrent.table.rows().to_vec();
    a.sort_by_key(key);
    b.sort_by_key(key);
    assert_eq!(a, b);
}

#[tokio::test]
async fn within_document_order_is_preserved() {
    let tmp = tempfile::tempdir().unwrap();
    write_pdf_stub(tmp.path(), "a.pdf", &["p1", "p2", "p3", "p4"]);
    write_pdf_stub(tmp.path(), "b.pdf", &["q1", "q2"]);

    let config = config_with(StubConverter::new()).num_threads(4).build().unwrap();
    let output = vectorize(tmp.path(), &config).await.unwrap();

    for doc in ["a.pdf", "b.pdf"] {
        let nums: Vec<usize> = output
            .table
            .rows()
            .iter()
            .filter(|r| r.document_name == doc)
            .map(|r| r.paragraph_num)
            .collect();
        let mut sorted = nums.clone();
        sorted.sort_unstable();
        assert_eq!(nums, sorted, "paragraph order broken for {doc}");
    }
}

// ── CSV export ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn csv_export_writes_header_and_rows() {
    let tmp = tempfile::tempdir().unwrap();
    write_pdf_stub(tmp.path(), "doc.pdf", &["only paragraph"]);
    let out_path = tmp.path().join("out").join("vectors.csv");

    let config = config_with(StubConverter::new()).build().unwrap();
    let stats = vectorize_to_csv(tmp.path(), &out_path, &config)
        .await
        .unwrap();
    assert_eq!(stats.vectorized_paragraphs, 1);

    let text = std::fs::read_to_string(&out_path).unwrap();
    let mut lines = text.lines();
    let header = lines.next().unwrap();
    assert!(header.starts_with("document_name,paragraph_num,num_paragraphs,num_tokens,component_1"));
    let row = lines.next().unwrap();
    assert!(row.starts_with("doc.pdf,1,1,"));
    assert!(!out_path.with_extension("csv.tmp").exists());
}
