//! quill-retriever: the retrieval core of the quill question-answering
//! pipeline.
//!
//! Turns one document into a persisted index of embedded chunks and
//! answers queries with the top-k chunks by cosine similarity. The two
//! operations everything else consumes are [`engine::RetrievalEngine::ensure_index`]
//! and [`engine::RetrievalEngine::query`]; the document loader and the
//! embedding provider are pluggable collaborators.
//!
//! ## Key modules
//!
//! - **[`document`]**: the loader seam and bundled text-file loader
//! - **[`index`]**: the in-memory vector index and cosine search
//! - **[`store`]**: SQLite persistence, one database per named index
//! - **[`engine`]**: lazy single-flight build-or-load lifecycle
//! - **[`error`]**: the typed failure taxonomy
//!
//! ## Architecture
//!
//! ```text
//! Document → Normalizer → TextSplitter → EmbeddingProvider → VectorIndex
//!                                                                ↓ ↑
//! Query    → EmbeddingProvider → cosine top-k  ←  IndexStore (SQLite)
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use quill_retriever::document::PlainTextLoader;
//! use quill_retriever::engine::{RetrievalConfig, RetrievalEngine};
//! use quill_embed::{EmbedConfig, FastEmbedProvider};
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let provider = Arc::new(FastEmbedProvider::create(EmbedConfig::default()).await?);
//! let loader = Arc::new(PlainTextLoader::new("paper.txt"));
//! let engine = RetrievalEngine::new(
//!     RetrievalConfig::new("paper", "indexes"),
//!     loader,
//!     provider,
//! )?;
//!
//! // First query loads or builds the index; later queries reuse it.
//! let hits = engine.query("What does the Transformer rely on?", 3).await?;
//! # Ok(())
//! # }
//! ```

pub mod document;
pub mod engine;
pub mod error;
pub mod index;
pub mod store;

pub use document::{DocumentLoader, DocumentSegment, InMemoryLoader, LoadError, PlainTextLoader};
pub use engine::{IndexStats, RetrievalConfig, RetrievalEngine};
pub use error::{Result, RetrievalError};
pub use index::{IndexMetadata, IndexedChunk, SearchHit, VectorIndex};
pub use store::IndexStore;
