//! The embedding capability interface.
//!
//! The retrieval core is agnostic to which model produces vectors; it only
//! requires that index-time and query-time embeddings come from the same
//! provider so they are comparable, and that the dimension stays fixed for
//! the lifetime of one index. Concrete providers live in [`crate::local`]
//! (fastembed, in-process) and [`crate::remote`] (HTTP embeddings API) and
//! are selected once at startup by configuration; nothing in the core
//! branches on provider identity.

use crate::error::{EmbedError, Result};
use async_trait::async_trait;
use half::f16;

/// Result of embedding a batch of texts.
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    /// The generated embeddings, one per input text, in input order.
    pub embeddings: Vec<Vec<f16>>,
    /// The dimension of each embedding vector.
    pub dimension: usize,
}

impl EmbeddingResult {
    /// The dimension is inferred from the first vector; an empty batch has
    /// dimension 0.
    pub fn new(embeddings: Vec<Vec<f16>>) -> Self {
        let dimension = embeddings.first().map(|e| e.len()).unwrap_or(0);
        Self {
            embeddings,
            dimension,
        }
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }
}

/// A source of text embeddings.
///
/// `embed_batch` and `embed_one` must be backed by the same underlying
/// model; the retriever embeds documents with the former and queries with
/// the latter and compares the results directly.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, preserving order.
    async fn embed_batch(&self, texts: &[String]) -> Result<EmbeddingResult>;

    /// Embed a single text (used for queries).
    async fn embed_one(&self, text: &str) -> Result<Vec<f16>>;

    /// The fixed dimension of vectors this provider produces.
    fn dimension(&self) -> usize;

    /// Short identifier for logs and index metadata.
    fn provider_name(&self) -> &str;
}

/// Check a raw model response against the advertised shape: one vector per
/// input, every vector `dimension` wide, no NaN or infinite components.
pub(crate) fn validate_raw(
    embeddings: &[Vec<f32>],
    expected_count: usize,
    dimension: usize,
) -> Result<()> {
    if embeddings.len() != expected_count {
        return Err(EmbedError::embedding_gen(std::io::Error::other(format!(
            "provider returned {} embeddings for {} inputs",
            embeddings.len(),
            expected_count
        ))));
    }
    for embedding in embeddings {
        if embedding.len() != dimension {
            return Err(EmbedError::DimensionMismatch {
                expected: dimension,
                got: embedding.len(),
            });
        }
        if embedding.iter().any(|v| !v.is_finite()) {
            return Err(EmbedError::NonFinite);
        }
    }
    Ok(())
}

/// Convert an f32 embedding to unit-length f16, the storage format used
/// throughout the index. Normalizing here means cosine similarity reduces
/// to a dot product over stored vectors.
pub(crate) fn to_unit_f16(embedding: Vec<f32>) -> Vec<f16> {
    let norm: f32 = embedding.iter().map(|x| x * x).sum::<f32>().sqrt();
    let scale = if norm > 0.0 { 1.0 / norm } else { 1.0 };
    embedding
        .into_iter()
        .map(|x| f16::from_f32(x * scale))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_result_infers_dimension() {
        let result = EmbeddingResult::new(vec![
            vec![f16::from_f32(0.1), f16::from_f32(0.2), f16::from_f32(0.3)],
            vec![f16::from_f32(0.4), f16::from_f32(0.5), f16::from_f32(0.6)],
        ]);
        assert_eq!(result.len(), 2);
        assert_eq!(result.dimension, 3);
        assert!(!result.is_empty());

        let empty = EmbeddingResult::new(vec![]);
        assert_eq!(empty.dimension, 0);
        assert!(empty.is_empty());
    }

    #[test]
    fn validate_rejects_count_mismatch() {
        let err = validate_raw(&[vec![0.0; 4]], 2, 4).unwrap_err();
        assert!(matches!(err, EmbedError::EmbeddingGeneration { .. }));
    }

    #[test]
    fn validate_rejects_wrong_dimension() {
        let err = validate_raw(&[vec![0.0; 3]], 1, 4).unwrap_err();
        assert!(matches!(
            err,
            EmbedError::DimensionMismatch {
                expected: 4,
                got: 3
            }
        ));
    }

    #[test]
    fn validate_rejects_non_finite() {
        let err = validate_raw(&[vec![0.0, f32::NAN]], 1, 2).unwrap_err();
        assert!(matches!(err, EmbedError::NonFinite));
    }

    #[test]
    fn unit_conversion_normalizes() {
        let unit = to_unit_f16(vec![3.0, 4.0]);
        let norm: f32 = unit.iter().map(|x| x.to_f32() * x.to_f32()).sum();
        assert!((norm - 1.0).abs() < 1e-2);
    }

    #[test]
    fn unit_conversion_leaves_zero_vector() {
        let unit = to_unit_f16(vec![0.0, 0.0]);
        assert!(unit.iter().all(|x| x.to_f32() == 0.0));
    }
}
