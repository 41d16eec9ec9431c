//! Configuration types for directory vectorization.
//!
//! All run behaviour is controlled through [`VectorizeConfig`], built via
//! its [`VectorizeConfigBuilder`]. Keeping every knob in one struct makes
//! it trivial to share configs across worker threads and to diff two runs
//! to understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! The caller-facing surface has grown past the point where a positional
//! constructor stays readable. The builder lets callers set only what they
//! care about and rely on documented defaults for the rest.

use crate::embed::Embedder;
use crate::error::Pdf2VecError;
use crate::pipeline::convert::DocumentConverter;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// What to do when a run produces zero vector rows.
///
/// The two behaviours both exist in the wild; rather than pick one, the
/// policy is explicit configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyResultPolicy {
    /// Strict runs fail with [`Pdf2VecError::EmptyResult`]; tolerant runs
    /// return an empty table. (default)
    #[default]
    FollowErrorMode,
    /// Always fail with [`Pdf2VecError::EmptyResult`].
    Error,
    /// Always return an empty table.
    AllowEmpty,
}

impl EmptyResultPolicy {
    /// Whether zero rows should abort the run under the given error mode.
    pub(crate) fn rejects(self, ignore_errors: bool) -> bool {
        match self {
            EmptyResultPolicy::FollowErrorMode => !ignore_errors,
            EmptyResultPolicy::Error => true,
            EmptyResultPolicy::AllowEmpty => false,
        }
    }
}

/// Configuration for one vectorization run.
///
/// Built via [`VectorizeConfig::builder()`] or using
/// [`VectorizeConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2vec::VectorizeConfig;
///
/// let config = VectorizeConfig::builder()
///     .num_tokens(64)
///     .num_threads(4)
///     .ignore_errors(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct VectorizeConfig {
    /// Maximum token budget per paragraph. Default: 50.
    ///
    /// Paragraphs longer than the budget are truncated by the embedder's
    /// tokenizer; the `num_tokens` table column reports what was actually
    /// consumed, which is therefore always ≤ this value.
    pub num_tokens: usize,

    /// Skip conversion for documents whose HTML rendition already exists.
    /// Default: true.
    ///
    /// Conversion is the slowest file-bound stage, and renditions are
    /// deterministic for an unchanged source PDF, so re-runs over the same
    /// directory only pay for documents added since the last run. Set to
    /// false to force regeneration after changing the converter.
    pub ignore_if_html_file_exists: bool,

    /// Tolerant mode: capture per-unit failures and continue. Default: false.
    ///
    /// When false, the first conversion, extraction, or vectorization
    /// failure aborts the run and propagates to the caller. When true, the
    /// failing document or paragraph is excluded from later stages and the
    /// failure is returned in [`crate::output::RunOutput::failures`].
    pub ignore_errors: bool,

    /// Worker-pool size for the conversion, extraction, and vectorization
    /// stages. Default: 1 (sequential).
    ///
    /// Units are independent, so the stages fan out over a bounded pool of
    /// this many in-flight units. Results are collected in submission
    /// order, so the table is identical across thread counts; only
    /// progress events arrive out of order.
    pub num_threads: usize,

    /// Policy for runs that produce zero rows. Default:
    /// [`EmptyResultPolicy::FollowErrorMode`].
    pub empty_result: EmptyResultPolicy,

    /// Path to an ONNX encoder model, used with `tokenizer_path` to build
    /// the default [`crate::embed::OnnxEmbedder`] when no pre-built
    /// embedder is supplied.
    pub model_path: Option<PathBuf>,

    /// Path to the tokenizer definition matching `model_path`.
    pub tokenizer_path: Option<PathBuf>,

    /// Pre-constructed embedder. Takes precedence over
    /// `model_path`/`tokenizer_path`.
    pub embedder: Option<Arc<dyn Embedder>>,

    /// Document converter override. Defaults to the pdfium-backed
    /// [`crate::pipeline::convert::PdfiumConverter`].
    pub converter: Option<Arc<dyn DocumentConverter>>,

    /// Progress callback. Defaults to a no-op.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for VectorizeConfig {
    fn default() -> Self {
        Self {
            num_tokens: 50,
            ignore_if_html_file_exists: true,
            ignore_errors: false,
            num_threads: 1,
            empty_result: EmptyResultPolicy::default(),
            model_path: None,
            tokenizer_path: None,
            embedder: None,
            converter: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for VectorizeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorizeConfig")
            .field("num_tokens", &self.num_tokens)
            .field("ignore_if_html_file_exists", &self.ignore_if_html_file_exists)
            .field("ignore_errors", &self.ignore_errors)
            .field("num_threads", &self.num_threads)
            .field("empty_result", &self.empty_result)
            .field("model_path", &self.model_path)
            .field("tokenizer_path", &self.tokenizer_path)
            .field("embedder", &self.embedder.as_ref().map(|e| e.name().to_string()))
            .field("converter", &self.converter.as_ref().map(|_| "<dyn DocumentConverter>"))
            .finish()
    }
}

impl VectorizeConfig {
    /// Create a new builder for `VectorizeConfig`.
    pub fn builder() -> VectorizeConfigBuilder {
        VectorizeConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`VectorizeConfig`].
#[derive(Debug)]
pub struct VectorizeConfigBuilder {
    config: VectorizeConfig,
}

impl VectorizeConfigBuilder {
    pub fn num_tokens(mut self, n: usize) -> Self {
        self.config.num_tokens = n.max(1);
        self
    }

    pub fn ignore_if_html_file_exists(mut self, v: bool) -> Self {
        self.config.ignore_if_html_file_exists = v;
        self
    }

    pub fn ignore_errors(mut self, v: bool) -> Self {
        self.config.ignore_errors = v;
        self
    }

    pub fn num_threads(mut self, n: usize) -> Self {
        self.config.num_threads = n.max(1);
        self
    }

    pub fn empty_result(mut self, policy: EmptyResultPolicy) -> Self {
        self.config.empty_result = policy;
        self
    }

    pub fn model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.model_path = Some(path.into());
        self
    }

    pub fn tokenizer_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.tokenizer_path = Some(path.into());
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.config.embedder = Some(embedder);
        self
    }

    pub fn converter(mut self, converter: Arc<dyn DocumentConverter>) -> Self {
        self.config.converter = Some(converter);
        self
    }

    pub fn progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.config.progress_callback = Some(callback);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<VectorizeConfig, Pdf2VecError> {
        let c = &self.config;
        if c.num_tokens == 0 {
            return Err(Pdf2VecError::InvalidConfig(
                "num_tokens must be ≥ 1".into(),
            ));
        }
        if c.num_threads == 0 {
            return Err(Pdf2VecError::InvalidConfig(
                "num_threads must be ≥ 1".into(),
            ));
        }
        if c.model_path.is_some() != c.tokenizer_path.is_some() {
            return Err(Pdf2VecError::InvalidConfig(
                "model_path and tokenizer_path must be set together".into(),
            ));
        }
        Ok(self.config)
    }
}
