//! Embedding collaborators: the [`Embedder`] seam and its implementations.
//!
//! The pipeline treats embedding computation as a black box behind the
//! [`Embedder`] trait: text in, fixed-width vector plus consumed token
//! count out. Two implementations ship with the crate:
//!
//! * [`OnnxEmbedder`] — a local ONNX sentence encoder driven through `ort`
//!   with a HuggingFace `tokenizers` tokenizer. This is the production
//!   backend.
//! * [`HashEmbedder`] — a deterministic, model-free FNV-1a bucket embedder.
//!   Useful for tests and smoke runs where downloading a model is not an
//!   option.
//!
//! Implementations must be `Send + Sync`: the vectorization stage shares
//! one embedder instance across all worker threads and invokes it
//! concurrently.

mod hash;
mod onnx;

pub use hash::HashEmbedder;
pub use onnx::OnnxEmbedder;

use thiserror::Error;

/// An embedding-computation failure for a single text.
#[derive(Debug, Error)]
pub enum EmbedError {
    /// Model inference produced an unusable result (bad shape, NaN output,
    /// empty token sequence).
    #[error("model error: {0}")]
    Model(String),

    /// Tokenization failed.
    #[error("tokenizer error: {0}")]
    Tokenizer(String),

    /// Loading model or tokenizer files failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The ONNX runtime reported an error.
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
}

/// The result of embedding one text: the vector and the number of tokens
/// actually consumed (at most the configured token budget).
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub num_tokens: usize,
}

/// A text-embedding collaborator.
///
/// The vector width is fixed by the implementation's configuration and
/// identical across every call within one run. `num_tokens` in the returned
/// [`Embedding`] never exceeds the token budget the embedder was
/// constructed with.
pub trait Embedder: Send + Sync {
    /// Identifier used in logs, e.g. `onnx:all-MiniLM-L6-v2` or `fnv1a-64`.
    fn name(&self) -> &str;

    /// Embed one paragraph of text.
    fn vectorize(&self, text: &str) -> Result<Embedding, EmbedError>;
}
