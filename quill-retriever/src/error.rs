//! Error taxonomy for the retrieval core.
//!
//! Every failure is a typed value; nothing in this crate logs-and-continues
//! or collapses an error into an empty result. The one deliberate
//! exception lives upstream: an empty *document* yields an empty chunk
//! list at the splitter, which only becomes [`RetrievalError::EmptyDocument`]
//! when an index build is attempted with it.

use crate::document::LoadError;
use quill_context::ContextError;
use quill_embed::EmbedError;

pub type Result<T> = std::result::Result<T, RetrievalError>;

#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    /// The source document could not be read.
    #[error("document load failed: {source}")]
    DocumentLoad {
        #[from]
        source: LoadError,
    },

    /// The embedding provider failed or returned malformed output.
    #[error("embedding failed: {source}")]
    Embedding {
        #[from]
        source: EmbedError,
    },

    /// Chunking configuration was invalid.
    #[error("chunking configuration invalid: {source}")]
    Context {
        #[from]
        source: ContextError,
    },

    /// No persisted index exists under the requested name. The lifecycle
    /// engine treats this as "build one"; every other load failure is
    /// surfaced.
    #[error("index not found: {name}")]
    IndexNotFound { name: String },

    /// A persisted index exists but cannot be trusted.
    #[error("index {name} is corrupt: {detail}")]
    IndexCorrupt { name: String, detail: String },

    /// Chunk and vector counts disagree at build time.
    #[error("chunk/vector count mismatch: {chunks} chunks, {vectors} vectors")]
    CountMismatch { chunks: usize, vectors: usize },

    /// A vector's width disagrees with the index dimension.
    #[error("vector dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// The document contained no usable content after normalization.
    #[error("document has no indexable content")]
    EmptyDocument,

    /// The persistence layer failed outside of load (e.g. while saving).
    #[error("index store error: {source}")]
    Store {
        #[from]
        source: sqlx::Error,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl RetrievalError {
    pub(crate) fn corrupt(name: &str, detail: impl Into<String>) -> Self {
        Self::IndexCorrupt {
            name: name.to_string(),
            detail: detail.into(),
        }
    }
}
