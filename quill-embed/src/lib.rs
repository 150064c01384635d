//! # quill-embed
//!
//! Text embedding for the quill retrieval pipeline, behind a small
//! capability interface so the retrieval core never knows which model
//! produces its vectors.
//!
//! Two concrete providers:
//!
//! - [`FastEmbedProvider`]: local ONNX models via fastembed; no network
//!   calls at query time, `all-MiniLM-L6-v2` by default.
//! - [`HttpEmbeddingProvider`]: a remote embeddings API speaking the common
//!   `POST /embeddings` JSON shape.
//!
//! Both produce unit-length f16 vectors and validate model output (count,
//! dimension, finiteness) before anything downstream sees it. Which one a
//! deployment uses is decided once at startup; see `quill-server`.
//!
//! ```no_run
//! use quill_embed::{EmbedConfig, EmbeddingProvider, FastEmbedProvider};
//!
//! # async fn example() -> quill_embed::Result<()> {
//! let provider = FastEmbedProvider::create(EmbedConfig::default()).await?;
//! let texts = vec!["Hello world".to_string()];
//! let result = provider.embed_batch(&texts).await?;
//! assert_eq!(result.dimension, provider.dimension());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod local;
pub mod provider;
pub mod remote;

pub use config::{EmbedConfig, RemoteEmbedConfig};
pub use error::{EmbedError, Result};
pub use local::FastEmbedProvider;
pub use provider::{EmbeddingProvider, EmbeddingResult};
pub use remote::HttpEmbeddingProvider;
