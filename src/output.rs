//! Output types: documents, paragraph records, vector rows, and the final
//! result table.
//!
//! Every type here is immutable once produced. Each pipeline stage consumes
//! the previous stage's output as a plain sequence and builds a new one, so
//! nothing needs interior mutability or locking even when stages fan out
//! across worker threads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::Pdf2VecError;

/// One source PDF under processing.
///
/// Created at discovery time from a directory listing and read-only
/// thereafter. The conversion stage derives the rendition path from the
/// same file path, so a document is fully identified by `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    path: PathBuf,
}

impl Document {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Full path to the source PDF.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name including extension, e.g. `report.pdf`.
    ///
    /// This is the value carried into the `document_name` table column and
    /// into progress labels.
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.to_string_lossy().into_owned())
    }

    /// Deterministic path of the derived HTML rendition: same directory,
    /// same base name, `.html` extension.
    pub fn rendition_path(&self) -> PathBuf {
        self.path.with_extension("html")
    }
}

/// One paragraph of one document, produced by the extraction stage.
///
/// `paragraph_num` is 1-based in document reading order;
/// `num_paragraphs` is the total for the owning document and is constant
/// across all records of that document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParagraphRecord {
    pub document: Document,
    pub paragraph_num: usize,
    pub text: String,
    pub num_paragraphs: usize,
}

/// One row of the final table: provenance columns plus the embedding vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorRow {
    pub document_name: String,
    pub paragraph_num: usize,
    pub num_paragraphs: usize,
    pub num_tokens: usize,
    pub vector: Vec<f32>,
}

/// The pipeline stage a unit of work belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Conversion,
    Extraction,
    Vectorization,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Conversion => f.write_str("conversion"),
            Stage::Extraction => f.write_str("extraction"),
            Stage::Vectorization => f.write_str("vectorization"),
        }
    }
}

/// A captured per-unit failure from a tolerant run.
///
/// Carries the unit kind, its identifying key (document, and paragraph
/// index for vectorization failures), and the rendered error. Failures are
/// returned separately in [`RunOutput::failures`]; they are never
/// interleaved with successful rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureRecord {
    pub stage: Stage,
    pub document: String,
    /// 1-based paragraph index; `None` for document-level failures.
    pub paragraph_num: Option<usize>,
    pub error: String,
}

impl fmt::Display for FailureRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.paragraph_num {
            Some(n) => write!(
                f,
                "{} failed for '{}' paragraph {}: {}",
                self.stage, self.document, n, self.error
            ),
            None => write!(f, "{} failed for '{}': {}", self.stage, self.document, self.error),
        }
    }
}

/// The assembled result: one row per successfully vectorized paragraph.
///
/// Column order is fixed: `document_name`, `paragraph_num`,
/// `num_paragraphs`, `num_tokens`, then `component_1..component_N` where
/// `N` is the embedding width of the run. Rows keep a dense 0-based index
/// (their position in [`ResultTable::rows`]) in the order the
/// vectorization stage produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultTable {
    columns: Vec<String>,
    rows: Vec<VectorRow>,
}

/// The four leading provenance columns, in contract order.
pub const PROVENANCE_COLUMNS: [&str; 4] =
    ["document_name", "paragraph_num", "num_paragraphs", "num_tokens"];

impl ResultTable {
    /// Build a table from rows, deriving component columns from the vector
    /// width of the first row. An empty row set yields a table with only
    /// the provenance columns.
    ///
    /// Width consistency across rows is checked by the assembly stage
    /// before this constructor runs.
    pub(crate) fn from_rows(rows: Vec<VectorRow>) -> Self {
        let width = rows.first().map_or(0, |r| r.vector.len());
        let mut columns: Vec<String> =
            PROVENANCE_COLUMNS.iter().map(|c| c.to_string()).collect();
        columns.extend((1..=width).map(|i| format!("component_{i}")));
        Self { columns, rows }
    }

    /// Column names in table order: provenance first, then components.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in production order; a row's position is its dense 0-based index.
    pub fn rows(&self) -> &[VectorRow] {
        &self.rows
    }

    /// Embedding width (number of `component_*` columns).
    pub fn vector_width(&self) -> usize {
        self.columns.len() - PROVENANCE_COLUMNS.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Write the table as CSV: one header record with
    /// [`ResultTable::columns`], then one record per row.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<(), Pdf2VecError> {
        let mut wtr = csv::Writer::from_writer(writer);
        let io_err = |e: csv::Error| Pdf2VecError::Internal(format!("csv write failed: {e}"));

        wtr.write_record(&self.columns).map_err(io_err)?;
        for row in &self.rows {
            let mut record: Vec<String> = Vec::with_capacity(self.columns.len());
            record.push(row.document_name.clone());
            record.push(row.paragraph_num.to_string());
            record.push(row.num_paragraphs.to_string());
            record.push(row.num_tokens.to_string());
            record.extend(row.vector.iter().map(|c| c.to_string()));
            wtr.write_record(&record).map_err(io_err)?;
        }
        wtr.flush()
            .map_err(|e| Pdf2VecError::Internal(format!("csv flush failed: {e}")))?;
        Ok(())
    }
}

/// Counters and timings for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    /// PDFs found by discovery.
    pub total_documents: usize,
    /// Documents with a usable rendition after the conversion stage.
    pub converted_documents: usize,
    /// Documents dropped by a conversion failure (tolerant mode only).
    pub failed_conversions: usize,
    /// Documents dropped by an extraction failure (tolerant mode only).
    pub failed_extractions: usize,
    /// Paragraph records entering the vectorization stage.
    pub total_paragraphs: usize,
    /// Paragraphs that produced a table row.
    pub vectorized_paragraphs: usize,
    /// Paragraphs dropped by a vectorization failure (tolerant mode only).
    pub failed_vectorizations: usize,
    pub conversion_duration_ms: u64,
    pub extraction_duration_ms: u64,
    pub vectorization_duration_ms: u64,
    pub total_duration_ms: u64,
}

/// Everything a run returns: the table, the captured failures (empty in
/// strict mode), and the run counters.
#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub table: ResultTable,
    pub failures: Vec<FailureRecord>,
    pub stats: RunStats,
}
