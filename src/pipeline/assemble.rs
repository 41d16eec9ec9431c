//! Assembly stage: concatenate vector rows into the final table.
//!
//! Rows arrive in production order and stay that way; the table's dense
//! 0-based row index is simply each row's position. The only checks here
//! are the ones the table contract needs: uniform vector width across the
//! run, and the empty-result policy.

use tracing::info;

use crate::config::EmptyResultPolicy;
use crate::error::Pdf2VecError;
use crate::output::{ResultTable, VectorRow};

/// Build the [`ResultTable`] from the vectorization stage's rows.
///
/// `documents` is the discovery count, used only for the empty-result
/// error message.
pub fn assemble_table(
    rows: Vec<VectorRow>,
    documents: usize,
    policy: EmptyResultPolicy,
    ignore_errors: bool,
) -> Result<ResultTable, Pdf2VecError> {
    if rows.is_empty() && policy.rejects(ignore_errors) {
        return Err(Pdf2VecError::EmptyResult { documents });
    }

    if let Some(first) = rows.first() {
        let expected = first.vector.len();
        for row in &rows[1..] {
            if row.vector.len() != expected {
                return Err(Pdf2VecError::InconsistentVectorWidth {
                    document: row.document_name.clone(),
                    paragraph_num: row.paragraph_num,
                    expected,
                    got: row.vector.len(),
                });
            }
        }
    }

    info!(rows = rows.len(), "assembled result table");
    Ok(ResultTable::from_rows(rows))
}
