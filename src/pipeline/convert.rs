//! Conversion stage: produce an HTML rendition for each source PDF.
//!
//! The rendition is a derived artifact living next to the source file
//! (`report.pdf` → `report.html`), so re-runs can skip documents that were
//! already converted (`ignore_if_html_file_exists`). The extraction stage
//! consumes only the rendition, never the PDF, which keeps paragraph
//! segmentation independent of the PDF backend.
//!
//! ## Why a trait seam?
//!
//! Conversion is the stage most likely to be swapped: a different PDF
//! backend, a pre-rendered corpus, or a test stub. [`DocumentConverter`]
//! keeps the pipeline indifferent to the choice. The default
//! [`PdfiumConverter`] extracts page text through pdfium and segments it on
//! blank lines.
//!
//! ## Why write-then-rename?
//!
//! A crash mid-write would otherwise leave a truncated rendition that a
//! later run with `ignore_if_html_file_exists = true` happily accepts.
//! Writing to a sibling temp file and renaming keeps renditions either
//! absent or complete.

use std::path::{Path, PathBuf};

use pdfium_render::prelude::*;
use tracing::debug;

use crate::error::ConversionError;
use crate::output::Document;

/// Produces the HTML rendition for one document.
///
/// Implementations must be `Send + Sync`: the conversion stage fans
/// documents out across worker threads and shares one converter instance.
pub trait DocumentConverter: Send + Sync {
    /// Ensure `document`'s rendition exists and return its path.
    ///
    /// With `ignore_if_exists` set, an existing rendition short-circuits
    /// the call: nothing is read from the PDF and nothing is written.
    fn convert_to_html(
        &self,
        document: &Document,
        ignore_if_exists: bool,
    ) -> Result<PathBuf, ConversionError>;
}

/// Default converter: pdfium text extraction, blank-line paragraph
/// segmentation, one `<p>` element per paragraph.
pub struct PdfiumConverter;

impl DocumentConverter for PdfiumConverter {
    fn convert_to_html(
        &self,
        document: &Document,
        ignore_if_exists: bool,
    ) -> Result<PathBuf, ConversionError> {
        let rendition = document.rendition_path();
        if ignore_if_exists && rendition.exists() {
            debug!(rendition = %rendition.display(), "rendition exists, skipping conversion");
            return Ok(rendition);
        }

        let paragraphs = pdf_paragraphs(document.path())?;
        let html = render_html(&document.display_name(), &paragraphs);

        let tmp = rendition.with_extension("html.tmp");
        std::fs::write(&tmp, html)?;
        std::fs::rename(&tmp, &rendition)?;

        debug!(
            rendition = %rendition.display(),
            paragraphs = paragraphs.len(),
            "wrote rendition"
        );
        Ok(rendition)
    }
}

/// Extract paragraph texts from a PDF, in reading order.
fn pdf_paragraphs(path: &Path) -> Result<Vec<String>, ConversionError> {
    let bindings = Pdfium::bind_to_system_library().map_err(|e| ConversionError::Pdf {
        detail: format!("failed to bind pdfium library: {e:?}"),
    })?;
    let pdfium = Pdfium::new(bindings);
    let pdf = pdfium.load_pdf_from_file(path, None).map_err(|e| {
        let detail = format!("{e:?}");
        if detail.to_ascii_lowercase().contains("password") {
            ConversionError::Encrypted
        } else {
            ConversionError::Pdf { detail }
        }
    })?;

    let mut paragraphs = Vec::new();
    for page in pdf.pages().iter() {
        let text = page
            .text()
            .map_err(|e| ConversionError::Pdf {
                detail: format!("{e:?}"),
            })?
            .all();
        paragraphs.extend(segment_paragraphs(&text));
    }
    Ok(paragraphs)
}

/// Split raw page text into paragraphs.
///
/// pdfium reports one line per text run; a blank line marks a paragraph
/// boundary. Lines inside a block are re-joined with single spaces since
/// PDF line breaks are layout, not meaning.
pub(crate) fn segment_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            flush(&mut current, &mut paragraphs);
        } else {
            current.push(line);
        }
    }
    flush(&mut current, &mut paragraphs);

    paragraphs
}

fn flush(current: &mut Vec<&str>, paragraphs: &mut Vec<String>) {
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
        current.clear();
    }
}

/// Render the HTML rendition: a minimal document with one `<p>` per
/// paragraph, escaped.
pub(crate) fn render_html(title: &str, paragraphs: &[String]) -> String {
    let mut html = String::with_capacity(256 + paragraphs.iter().map(|p| p.len() + 16).sum::<usize>());
    html.push_str("<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>");
    html.push_str(&escape_html(title));
    html.push_str("</title></head>\n<body>\n");
    for paragraph in paragraphs {
        html.push_str("<p>");
        html.push_str(&escape_html(paragraph));
        html.push_str("</p>\n");
    }
    html.push_str("</body>\n</html>\n");
    html
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
