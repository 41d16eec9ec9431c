//! Extraction stage: segment an HTML rendition into paragraph records.
//!
//! The rendition format is deliberately narrow — one `<p>` element per
//! paragraph — so extraction is a handful of regex passes rather than a
//! full HTML parser: pull `<p>` bodies in document order, strip any inline
//! markup, unescape the few entities the converter emits, collapse
//! whitespace. Each pass is a pure `&str → String` function with no shared
//! state.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::ExtractionError;
use crate::output::{Document, ParagraphRecord};

static PARAGRAPH_RE: Lazy<Regex> = Lazy::new(|| {
    // (?is): match across lines, case-insensitive tag names. Non-greedy so
    // adjacent <p> elements don't merge.
    Regex::new(r"(?is)<p[^>]*>(.*?)</p>").expect("paragraph regex is valid")
});

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]+>").expect("tag regex is valid"));

/// Read `document`'s rendition and produce its ordered paragraph records.
///
/// `paragraph_num` is 1-based in rendition order; every record of the
/// document carries the same `num_paragraphs`. A rendition with no
/// paragraphs yields an empty vector — only a missing or unreadable
/// rendition is an error.
pub fn extract_document(document: &Document) -> Result<Vec<ParagraphRecord>, ExtractionError> {
    let rendition = document.rendition_path();
    if !rendition.exists() {
        return Err(ExtractionError::MissingRendition { path: rendition });
    }

    let html = std::fs::read_to_string(&rendition).map_err(|e| ExtractionError::Unreadable {
        path: rendition.clone(),
        source: e,
    })?;

    let paragraphs = paragraphs_from_html(&html);
    let num_paragraphs = paragraphs.len();
    debug!(
        document = %document.display_name(),
        paragraphs = num_paragraphs,
        "extracted paragraphs"
    );

    Ok(paragraphs
        .into_iter()
        .enumerate()
        .map(|(i, text)| ParagraphRecord {
            document: document.clone(),
            paragraph_num: i + 1,
            text,
            num_paragraphs,
        })
        .collect())
}

/// Pull paragraph texts out of rendition HTML, in document order.
///
/// Blank paragraphs (empty `<p>` elements, or ones holding only markup and
/// whitespace) are dropped; they carry nothing to embed.
pub fn paragraphs_from_html(html: &str) -> Vec<String> {
    PARAGRAPH_RE
        .captures_iter(html)
        .map(|cap| clean_fragment(&cap[1]))
        .filter(|text| !text.is_empty())
        .collect()
}

/// Strip inline tags, unescape entities, collapse runs of whitespace.
fn clean_fragment(fragment: &str) -> String {
    let text = TAG_RE.replace_all(fragment, " ");
    let text = unescape_entities(&text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reverse the escaping the converter applies, plus `&nbsp;` which other
/// HTML producers commonly emit. `&amp;` goes last so `&amp;lt;` stays a
/// literal `&lt;`.
fn unescape_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
