//! ONNX-backed sentence embedder.
//!
//! Drives a local transformer encoder exported to ONNX (e.g.
//! `all-MiniLM-L6-v2`) through `ort`, with tokenization handled by the
//! HuggingFace `tokenizers` crate. The tokenizer truncates at the
//! configured token budget, so `num_tokens` in the returned embedding is
//! always within budget.
//!
//! Pooling follows the standard sentence-transformers recipe: mean over the
//! last hidden state weighted by the attention mask, then L2
//! normalisation. Models exported with a pooled output would not need this,
//! but pooling here keeps the backend compatible with plain
//! `AutoModel`-style exports, which are the common case.
//!
//! `Session` and `Tokenizer` are both `Send + Sync`; one `OnnxEmbedder`
//! instance is shared read-only across every worker thread of a run.

use std::path::Path;

use ndarray::{Array2, Ix3};
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::debug;

use super::{EmbedError, Embedder, Embedding};

/// Output tensor name produced by HuggingFace `AutoModel` ONNX exports.
const HIDDEN_STATE_OUTPUT: &str = "last_hidden_state";

/// A local ONNX transformer encoder with mean pooling.
pub struct OnnxEmbedder {
    session: Session,
    tokenizer: Tokenizer,
    name: String,
}

impl OnnxEmbedder {
    /// Load a model and tokenizer from disk.
    ///
    /// # Arguments
    /// * `model_path`     — path to the `.onnx` model file
    /// * `tokenizer_path` — path to the matching `tokenizer.json`
    /// * `num_tokens`     — maximum token budget per paragraph; longer
    ///   paragraphs are truncated
    pub fn new(
        model_path: impl AsRef<Path>,
        tokenizer_path: impl AsRef<Path>,
        num_tokens: usize,
    ) -> Result<Self, EmbedError> {
        let model_path = model_path.as_ref();

        let mut tokenizer = Tokenizer::from_file(tokenizer_path.as_ref())
            .map_err(|e| EmbedError::Tokenizer(e.to_string()))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: num_tokens,
                ..Default::default()
            }))
            .map_err(|e| EmbedError::Tokenizer(e.to_string()))?;

        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(1)?
            .commit_from_file(model_path)?;

        let name = format!(
            "onnx:{}",
            model_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "model".to_string())
        );
        debug!(model = %model_path.display(), "loaded ONNX embedder");

        Ok(Self {
            session,
            tokenizer,
            name,
        })
    }
}

impl Embedder for OnnxEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn vectorize(&self, text: &str) -> Result<Embedding, EmbedError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbedError::Tokenizer(e.to_string()))?;

        let num_tokens = encoding.get_ids().len();
        if num_tokens == 0 {
            return Err(EmbedError::Model("tokenizer produced no tokens".into()));
        }

        let ids: Vec<i64> = encoding.get_ids().iter().map(|&v| v as i64).collect();
        let mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .map(|&v| v as i64)
            .collect();
        let type_ids: Vec<i64> = encoding.get_type_ids().iter().map(|&v| v as i64).collect();

        let to_model_err = |e: ndarray::ShapeError| EmbedError::Model(e.to_string());
        let input_ids = Array2::from_shape_vec((1, num_tokens), ids).map_err(to_model_err)?;
        let attention_mask =
            Array2::from_shape_vec((1, num_tokens), mask).map_err(to_model_err)?;
        let token_type_ids =
            Array2::from_shape_vec((1, num_tokens), type_ids).map_err(to_model_err)?;

        let outputs = self.session.run(ort::inputs![
            "input_ids" => Tensor::from_array(input_ids)?,
            "attention_mask" => Tensor::from_array(attention_mask)?,
            "token_type_ids" => Tensor::from_array(token_type_ids)?,
        ])?;

        // AutoModel exports name the tensor `last_hidden_state`; fall back
        // to the first output for models exported with a custom graph name.
        let hidden_value = outputs
            .get(HIDDEN_STATE_OUTPUT)
            .unwrap_or_else(|| &outputs[0]);
        let hidden = hidden_value
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix3>()
            .map_err(|e| EmbedError::Model(format!("unexpected hidden-state shape: {e}")))?;

        let width = hidden.shape()[2];
        let seq_len = hidden.shape()[1].min(num_tokens);

        // Masked mean pooling over the sequence axis.
        let mut vector = vec![0f32; width];
        let mut live_tokens = 0f32;
        for (pos, &m) in encoding.get_attention_mask()[..seq_len].iter().enumerate() {
            if m == 0 {
                continue;
            }
            live_tokens += 1.0;
            for (acc, &component) in vector.iter_mut().zip(hidden.slice(ndarray::s![0, pos, ..])) {
                *acc += component;
            }
        }
        if live_tokens > 0.0 {
            for component in &mut vector {
                *component /= live_tokens;
            }
        }

        // L2 normalisation, skipped for the degenerate all-zero vector.
        let norm = vector.iter().map(|c| c * c).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for component in &mut vector {
                *component /= norm;
            }
        }

        Ok(Embedding { vector, num_tokens })
    }
}
