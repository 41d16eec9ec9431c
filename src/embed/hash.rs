//! Deterministic model-free embedder.
//!
//! Buckets whitespace-separated tokens into a fixed-width vector using the
//! FNV-1a hash. The result carries no semantic signal worth searching over,
//! but it is cheap, dependency-free at run time, and fully deterministic,
//! which is exactly what pipeline tests and smoke runs need: identical
//! inputs always produce identical rows, regardless of thread count.

use super::{EmbedError, Embedder, Embedding};

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(token: &str) -> u64 {
    let mut hash = FNV_OFFSET;
    for byte in token.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// FNV-1a token-bucket embedder.
pub struct HashEmbedder {
    dimension: usize,
    num_tokens: usize,
    name: String,
}

impl HashEmbedder {
    /// # Arguments
    /// * `dimension`  — vector width; every produced vector has this length
    /// * `num_tokens` — token budget; tokens beyond it are ignored and the
    ///   reported token count is capped here
    pub fn new(dimension: usize, num_tokens: usize) -> Self {
        Self {
            dimension,
            num_tokens,
            name: format!("fnv1a-{dimension}"),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }
}

impl Embedder for HashEmbedder {
    fn name(&self) -> &str {
        &self.name
    }

    fn vectorize(&self, text: &str) -> Result<Embedding, EmbedError> {
        if self.dimension == 0 {
            return Err(EmbedError::Model("hash embedder dimension is 0".into()));
        }

        let mut vector = vec![0f32; self.dimension];
        let mut num_tokens = 0usize;
        for token in text.split_whitespace().take(self.num_tokens) {
            num_tokens += 1;
            let hash = fnv1a(&token.to_lowercase());
            let bucket = (hash % self.dimension as u64) as usize;
            // Top bit decides the sign so buckets cancel rather than only grow.
            let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|c| c * c).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for component in &mut vector {
                *component /= norm;
            }
        }

        Ok(Embedding { vector, num_tokens })
    }
}
