//! Error types for the embedding layer.

/// Result type for embedding operations.
pub type Result<T> = std::result::Result<T, EmbedError>;

/// Errors produced while configuring providers or generating embeddings.
///
/// Any variant aborts the operation that encountered it: an index build or
/// a query never proceeds with partial or malformed vectors.
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    /// The provider configuration is invalid (unknown model, missing key).
    #[error("invalid embedding configuration: {message}")]
    InvalidConfig { message: String },

    /// The underlying model failed to load.
    #[error("embedding model initialization failed: {source}")]
    ModelInitialization {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The provider failed while generating embeddings.
    #[error("embedding generation failed: {source}")]
    EmbeddingGeneration {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The provider returned a vector of the wrong width.
    #[error("embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    /// The provider returned NaN or infinite components.
    #[error("embedding contains non-finite values")]
    NonFinite,

    /// A remote embedding service was unreachable or rejected the request.
    #[error("embedding service request failed: {source}")]
    Http {
        #[from]
        source: reqwest::Error,
    },

    /// Async task join errors.
    #[error("async task failed: {source}")]
    AsyncTask {
        #[from]
        source: tokio::task::JoinError,
    },

    /// Generic errors from other libraries.
    #[error("external error: {source}")]
    External {
        #[from]
        source: anyhow::Error,
    },
}

impl EmbedError {
    pub fn invalid_config<S: Into<String>>(message: S) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    pub fn model_init<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::ModelInitialization {
            source: Box::new(source),
        }
    }

    pub fn embedding_gen<E>(source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::EmbeddingGeneration {
            source: Box::new(source),
        }
    }
}
