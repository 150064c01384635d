//! The in-memory vector index and similarity search.
//!
//! A [`VectorIndex`] exclusively owns its chunks and their embedding
//! vectors; once built (or loaded) it is immutable and can be shared
//! across query handlers behind an `Arc` with no locking. Search is an
//! exhaustive cosine scan, which is exact and comfortably fast at
//! single-document scale.

use crate::error::{Result, RetrievalError};
use half::f16;
use serde::{Deserialize, Serialize};

/// Descriptive metadata persisted alongside the vectors.
///
/// The embedding provider and dimension recorded here pin down which model
/// an index was built with; a query embedded by a different model is not
/// comparable and fails the dimension check at search time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Logical index name; also the persistence key.
    pub name: String,
    /// Provider that produced the vectors (e.g. "fastembed").
    pub provider: String,
    /// Width of every vector in the index.
    pub dimension: usize,
    /// Chunking parameters used at build time.
    pub chunk_size: usize,
    pub overlap: usize,
    /// Unix timestamps.
    pub created_at: i64,
    pub updated_at: i64,
    /// quill-retriever version that wrote the index.
    pub version: String,
}

impl IndexMetadata {
    pub fn new(
        name: impl Into<String>,
        provider: impl Into<String>,
        dimension: usize,
        chunk_size: usize,
        overlap: usize,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            name: name.into(),
            provider: provider.into(),
            dimension,
            chunk_size,
            overlap,
            created_at: now,
            updated_at: now,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// A chunk as stored in the index: its text plus enough positional
/// metadata to attribute an answer back to the source document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexedChunk {
    /// Document-order position, 0-based. Also the stable tie-break key.
    pub sequence: usize,
    /// Byte offset of the chunk in the normalized document.
    pub offset: usize,
    /// 1-based source page, when known.
    pub page: Option<usize>,
    pub text: String,
}

/// One ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub text: String,
    pub score: f32,
    pub sequence: usize,
    pub offset: usize,
    pub page: Option<usize>,
}

/// An immutable chunk-to-vector index supporting top-k cosine search.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    metadata: IndexMetadata,
    chunks: Vec<IndexedChunk>,
    vectors: Vec<Vec<f16>>,
}

impl VectorIndex {
    /// Assemble an index, rejecting inconsistent inputs: the chunk and
    /// vector counts must match, every vector must have the metadata
    /// dimension, and an empty chunk list is an error (a document with no
    /// usable content cannot be indexed).
    pub fn build(
        metadata: IndexMetadata,
        chunks: Vec<IndexedChunk>,
        vectors: Vec<Vec<f16>>,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(RetrievalError::EmptyDocument);
        }
        if chunks.len() != vectors.len() {
            return Err(RetrievalError::CountMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }
        for vector in &vectors {
            if vector.len() != metadata.dimension {
                return Err(RetrievalError::DimensionMismatch {
                    expected: metadata.dimension,
                    got: vector.len(),
                });
            }
        }
        Ok(Self {
            metadata,
            chunks,
            vectors,
        })
    }

    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    pub fn dimension(&self) -> usize {
        self.metadata.dimension
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub(crate) fn chunks(&self) -> &[IndexedChunk] {
        &self.chunks
    }

    pub(crate) fn vectors(&self) -> &[Vec<f16>] {
        &self.vectors
    }

    /// Top-k chunks by cosine similarity to `query`, descending, ties
    /// broken by document order. `k` larger than the index is clamped;
    /// `k == 0` returns an empty result rather than an error.
    pub fn search(&self, query: &[f16], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.metadata.dimension {
            return Err(RetrievalError::DimensionMismatch {
                expected: self.metadata.dimension,
                got: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<SearchHit> = self
            .chunks
            .iter()
            .zip(&self.vectors)
            .map(|(chunk, vector)| SearchHit {
                text: chunk.text.clone(),
                score: cosine_similarity(query, vector),
                sequence: chunk.sequence,
                offset: chunk.offset,
                page: chunk.page,
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.sequence.cmp(&b.sequence))
        });
        hits.truncate(k.min(self.chunks.len()));
        Ok(hits)
    }
}

/// Cosine similarity between two f16 vectors, accumulated in f32.
///
/// Stored vectors are unit length, but the norms are computed anyway so
/// the metric stays correct for callers that pass unnormalized queries.
fn cosine_similarity(a: &[f16], b: &[f16]) -> f32 {
    let dot: f32 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| f32::from(*x) * f32::from(*y))
        .sum();

    let norm_a: f32 = a.iter().map(|x| f32::from(*x).powi(2)).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| f32::from(*x).powi(2)).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vector(components: &[f32]) -> Vec<f16> {
        components.iter().copied().map(f16::from_f32).collect()
    }

    fn chunk(sequence: usize, text: &str) -> IndexedChunk {
        IndexedChunk {
            sequence,
            offset: sequence * 100,
            page: Some(sequence + 1),
            text: text.to_string(),
        }
    }

    fn metadata(dimension: usize) -> IndexMetadata {
        IndexMetadata::new("test", "stub", dimension, 1000, 200)
    }

    /// Five orthogonal-ish unit vectors for ranking tests.
    fn sample_index() -> VectorIndex {
        let chunks = (0..5).map(|i| chunk(i, &format!("chunk {i}"))).collect();
        let vectors = vec![
            vector(&[1.0, 0.0, 0.0]),
            vector(&[0.0, 1.0, 0.0]),
            vector(&[0.0, 0.0, 1.0]),
            vector(&[0.707, 0.707, 0.0]),
            vector(&[0.577, 0.577, 0.577]),
        ];
        VectorIndex::build(metadata(3), chunks, vectors).unwrap()
    }

    #[test]
    fn build_rejects_empty_chunks() {
        assert!(matches!(
            VectorIndex::build(metadata(3), vec![], vec![]),
            Err(RetrievalError::EmptyDocument)
        ));
    }

    #[test]
    fn build_rejects_count_mismatch() {
        let err = VectorIndex::build(
            metadata(3),
            vec![chunk(0, "a"), chunk(1, "b")],
            vec![vector(&[1.0, 0.0, 0.0])],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::CountMismatch {
                chunks: 2,
                vectors: 1
            }
        ));
    }

    #[test]
    fn build_rejects_wrong_width_vector() {
        let err = VectorIndex::build(
            metadata(3),
            vec![chunk(0, "a")],
            vec![vector(&[1.0, 0.0])],
        )
        .unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::DimensionMismatch {
                expected: 3,
                got: 2
            }
        ));
    }

    #[test]
    fn exact_match_ranks_first_with_unit_score() {
        let index = sample_index();
        let hits = index.search(&vector(&[0.0, 1.0, 0.0]), 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].sequence, 1);
        assert_eq!(hits[0].text, "chunk 1");
        assert!((hits[0].score - 1.0).abs() < 1e-3);
    }

    #[test]
    fn results_are_ordered_by_descending_score() {
        let index = sample_index();
        let hits = index.search(&vector(&[1.0, 0.0, 0.0]), 5).unwrap();
        for pair in hits.windows(2) {
            assert!(pair[0].score >= pair[1].score);
        }
        assert_eq!(hits[0].sequence, 0);
    }

    #[test]
    fn k_is_clamped_to_index_size() {
        let index = sample_index();
        let hits = index.search(&vector(&[1.0, 0.0, 0.0]), 10).unwrap();
        assert_eq!(hits.len(), 5);
    }

    #[test]
    fn zero_k_returns_empty() {
        let index = sample_index();
        assert!(index.search(&vector(&[1.0, 0.0, 0.0]), 0).unwrap().is_empty());
    }

    #[test]
    fn ties_break_by_document_order() {
        let chunks = (0..3).map(|i| chunk(i, &format!("chunk {i}"))).collect();
        // Two identical vectors at sequences 1 and 2.
        let vectors = vec![
            vector(&[0.0, 1.0]),
            vector(&[1.0, 0.0]),
            vector(&[1.0, 0.0]),
        ];
        let index = VectorIndex::build(metadata(2), chunks, vectors).unwrap();
        let hits = index.search(&vector(&[1.0, 0.0]), 3).unwrap();
        assert_eq!(hits[0].sequence, 1);
        assert_eq!(hits[1].sequence, 2);
        assert_eq!(hits[2].sequence, 0);
    }

    #[test]
    fn query_dimension_must_match() {
        let index = sample_index();
        assert!(matches!(
            index.search(&vector(&[1.0, 0.0]), 1),
            Err(RetrievalError::DimensionMismatch { expected: 3, got: 2 })
        ));
    }

    #[test]
    fn search_is_deterministic() {
        let index = sample_index();
        let query = vector(&[0.3, 0.2, 0.9]);
        let first = index.search(&query, 5).unwrap();
        for _ in 0..10 {
            assert_eq!(index.search(&query, 5).unwrap(), first);
        }
    }
}
