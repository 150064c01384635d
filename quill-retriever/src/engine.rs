//! The retrieval engine: lazy, memoized index lifecycle plus query-time
//! search.
//!
//! The engine is constructed once at process startup and handed to request
//! handlers by reference; there is no import-time or global state. The
//! index itself is built at most once per process, on first use, behind a
//! `tokio::sync::OnceCell`: concurrent first callers serialize behind a
//! single load-or-build and all receive the same `Arc`. A persisted index
//! that is merely *absent* is rebuilt from the source document; one that
//! exists but fails to load surfaces [`RetrievalError::IndexCorrupt`] to
//! the caller instead of leaving the retriever silently unusable.

use crate::document::DocumentLoader;
use crate::error::{Result, RetrievalError};
use crate::index::{IndexMetadata, IndexedChunk, SearchHit, VectorIndex};
use crate::store::IndexStore;
use quill_context::{ChunkConfig, NormalizeMode, Normalizer, TextSplitter};
use quill_embed::EmbeddingProvider;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::info;

/// Configuration for a [`RetrievalEngine`].
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    /// Logical index name; the persistence key within the index directory.
    pub index_name: String,
    /// Directory holding persisted indexes.
    pub index_dir: PathBuf,
    /// Chunking parameters applied at build time.
    pub chunking: ChunkConfig,
    /// Normalization variant applied to the whole document before chunking.
    pub normalize_mode: NormalizeMode,
    /// Result count used when the caller does not specify one.
    pub default_k: usize,
}

impl RetrievalConfig {
    pub fn new(index_name: impl Into<String>, index_dir: impl Into<PathBuf>) -> Self {
        Self {
            index_name: index_name.into(),
            index_dir: index_dir.into(),
            chunking: ChunkConfig::default(),
            normalize_mode: NormalizeMode::default(),
            default_k: 3,
        }
    }

    pub fn with_chunking(mut self, chunking: ChunkConfig) -> Self {
        self.chunking = chunking;
        self
    }

    pub fn with_normalize_mode(mut self, mode: NormalizeMode) -> Self {
        self.normalize_mode = mode;
        self
    }

    pub fn with_default_k(mut self, k: usize) -> Self {
        self.default_k = k;
        self
    }
}

/// Summary of a built index, for health and status reporting.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IndexStats {
    pub name: String,
    pub chunks: usize,
    pub dimension: usize,
}

/// Ties together loader, normalizer, splitter, embedding provider, and
/// index store behind the two operations the rest of the system uses:
/// build-or-load the index, and query it.
pub struct RetrievalEngine {
    config: RetrievalConfig,
    normalizer: Normalizer,
    splitter: TextSplitter,
    loader: Arc<dyn DocumentLoader>,
    provider: Arc<dyn EmbeddingProvider>,
    store: IndexStore,
    index: OnceCell<Arc<VectorIndex>>,
}

impl RetrievalEngine {
    /// Validates the chunking configuration; everything else is wired up
    /// lazily on first use.
    pub fn new(
        config: RetrievalConfig,
        loader: Arc<dyn DocumentLoader>,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let splitter = TextSplitter::new(config.chunking)?;
        let normalizer = Normalizer::new(config.normalize_mode);
        let store = IndexStore::new(&config.index_dir);
        Ok(Self {
            config,
            normalizer,
            splitter,
            loader,
            provider,
            store,
            index: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    pub fn default_k(&self) -> usize {
        self.config.default_k
    }

    /// Return the index, loading or building it on first call. At most one
    /// load-or-build runs per process; concurrent callers await its result.
    pub async fn ensure_index(&self) -> Result<Arc<VectorIndex>> {
        let index = self
            .index
            .get_or_try_init(|| async {
                match self.store.load(&self.config.index_name).await {
                    Ok(index) => {
                        info!(
                            "loaded index {} ({} chunks)",
                            self.config.index_name,
                            index.len()
                        );
                        Ok(Arc::new(index))
                    }
                    Err(RetrievalError::IndexNotFound { name }) => {
                        info!("index {name} not found, building from source");
                        Ok(Arc::new(self.build_index().await?))
                    }
                    Err(err) => Err(err),
                }
            })
            .await?;
        Ok(Arc::clone(index))
    }

    /// Eagerly run the lazy build path, for deployments that prefer paying
    /// the cost at startup.
    pub async fn prebuild(&self) -> Result<()> {
        self.ensure_index().await.map(|_| ())
    }

    /// Embed the question and return the top-k chunks by similarity.
    pub async fn query(&self, question: &str, k: usize) -> Result<Vec<SearchHit>> {
        let index = self.ensure_index().await?;
        let query_vector = self.provider.embed_one(question).await?;
        index.search(&query_vector, k)
    }

    /// Stats for the in-memory index, if one has been established yet.
    pub fn index_stats(&self) -> Option<IndexStats> {
        self.index.get().map(|index| IndexStats {
            name: index.metadata().name.clone(),
            chunks: index.len(),
            dimension: index.dimension(),
        })
    }

    async fn build_index(&self) -> Result<VectorIndex> {
        let segments = self.loader.load().await?;
        info!(
            "building index {} from {} ({} segments)",
            self.config.index_name,
            self.loader.source(),
            segments.len()
        );

        // Normalize every segment with the same rules before any chunking
        // happens, recording where each segment lands so chunks can be
        // attributed to pages afterwards.
        let mut normalized = String::new();
        let mut page_table: Vec<(usize, Option<usize>)> = Vec::new();
        for segment in &segments {
            let clean = self.normalizer.normalize(&segment.text);
            if clean.trim().is_empty() {
                continue;
            }
            if !normalized.is_empty() {
                normalized.push('\n');
            }
            page_table.push((normalized.len(), segment.page));
            normalized.push_str(&clean);
        }

        let chunks = self.splitter.split(&normalized);
        if chunks.is_empty() {
            return Err(RetrievalError::EmptyDocument);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embedded = self.provider.embed_batch(&texts).await?;

        let metadata = IndexMetadata::new(
            &self.config.index_name,
            self.provider.provider_name(),
            self.provider.dimension(),
            self.splitter.chunk_size(),
            self.splitter.overlap(),
        );
        let indexed = chunks
            .into_iter()
            .map(|chunk| IndexedChunk {
                sequence: chunk.sequence,
                page: page_for_offset(&page_table, chunk.offset),
                offset: chunk.offset,
                text: chunk.text,
            })
            .collect();

        let index = VectorIndex::build(metadata, indexed, embedded.embeddings)?;
        self.store.save(&index).await?;
        info!(
            "index {} ready ({} chunks, dimension {})",
            self.config.index_name,
            index.len(),
            index.dimension()
        );
        Ok(index)
    }
}

/// The page whose segment contains `offset`: the last table entry starting
/// at or before it.
fn page_for_offset(table: &[(usize, Option<usize>)], offset: usize) -> Option<usize> {
    let idx = table.partition_point(|(start, _)| *start <= offset);
    if idx == 0 { None } else { table[idx - 1].1 }
}
