//! Document discovery: list a directory and keep the PDFs.
//!
//! Validation happens here, before any heavy work: a bad source path is the
//! one error that is always fatal regardless of error mode, so it is
//! reported with a typed error rather than surfacing later as a confusing
//! per-document failure.

use std::path::Path;

use tracing::debug;

use crate::error::Pdf2VecError;
use crate::output::Document;

/// List `dir` and return a [`Document`] for every regular file whose
/// extension is `pdf` (case-insensitive). Subdirectories and other files
/// are ignored.
///
/// Results are sorted by file name so a run's document order does not
/// depend on filesystem iteration order.
pub fn discover_documents(dir: &Path) -> Result<Vec<Document>, Pdf2VecError> {
    if !dir.exists() {
        return Err(Pdf2VecError::DirectoryNotFound {
            path: dir.to_path_buf(),
        });
    }
    if !dir.is_dir() {
        return Err(Pdf2VecError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| Pdf2VecError::DirectoryUnreadable {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut documents = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| Pdf2VecError::DirectoryUnreadable {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let is_pdf = path
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);
        if is_pdf {
            documents.push(Document::new(path));
        }
    }

    documents.sort_by_key(|d| d.display_name());
    debug!(count = documents.len(), dir = %dir.display(), "discovered documents");

    Ok(documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(path: &Path) {
        std::fs::write(path, b"%PDF-1.4 stub").unwrap();
    }

    #[test]
    fn missing_directory_is_fatal() {
        let err = discover_documents(Path::new("/no/such/dir")).unwrap_err();
        assert!(matches!(err, Pdf2VecError::DirectoryNotFound { .. }));
    }

    #[test]
    fn file_path_is_not_a_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("a.pdf");
        touch(&file);
        let err = discover_documents(&file).unwrap_err();
        assert!(matches!(err, Pdf2VecError::NotADirectory { .. }));
    }

    #[test]
    fn filters_to_pdfs_case_insensitively() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("b.pdf"));
        touch(&tmp.path().join("a.PDF"));
        touch(&tmp.path().join("notes.txt"));
        touch(&tmp.path().join("noext"));
        std::fs::create_dir(tmp.path().join("nested.pdf")).unwrap();

        let docs = discover_documents(tmp.path()).unwrap();
        let names: Vec<String> = docs.iter().map(|d| d.display_name()).collect();
        assert_eq!(names, vec!["a.PDF", "b.pdf"]);
    }

    #[test]
    fn empty_directory_yields_empty_sequence() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("readme.md"));
        let docs = discover_documents(tmp.path()).unwrap();
        assert!(docs.is_empty());
    }
}
