//! Pipeline stages for directory vectorization.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets us swap
//! implementations (e.g. a different conversion backend) without touching
//! other stages.
//!
//! ## Data Flow
//!
//! ```text
//! discover ──▶ convert ──▶ extract ──▶ (embed) ──▶ assemble
//! (list dir)   (pdfium →    (<p> →      (Embedder)   (rows →
//!               .html)       records)                 table)
//! ```
//!
//! 1. [`discover`] — list the source directory and wrap each PDF as a
//!    [`crate::output::Document`]
//! 2. [`convert`]  — ensure each document's HTML rendition exists; runs in
//!    `spawn_blocking` because pdfium and file I/O are blocking
//! 3. [`extract`]  — segment each rendition into ordered
//!    [`crate::output::ParagraphRecord`]s
//! 4. [`assemble`] — concatenate the vector rows into one
//!    [`crate::output::ResultTable`] with the provenance columns in front
//!
//! The embedding step between extract and assemble lives behind the
//! [`crate::embed::Embedder`] seam; the driver in [`crate::run`] wires the
//! stages together and owns error policy and parallelism.

pub mod assemble;
pub mod convert;
pub mod discover;
pub mod extract;
