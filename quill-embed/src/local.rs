//! In-process embedding via fastembed ONNX models.

use crate::config::EmbedConfig;
use crate::error::{EmbedError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingResult, to_unit_f16, validate_raw};
use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use half::f16;
use std::sync::{Arc, Mutex};

/// Embedding provider backed by a local fastembed model.
///
/// The model runs on the blocking thread pool; the `Mutex` serializes
/// access to the (non-`Sync`) ONNX session. The dimension is probed with a
/// test embedding at load time rather than hardcoded per model.
#[derive(Clone)]
pub struct FastEmbedProvider {
    config: EmbedConfig,
    model: Arc<Mutex<TextEmbedding>>,
    dimension: usize,
}

impl std::fmt::Debug for FastEmbedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FastEmbedProvider")
            .field("config", &self.config)
            .field("dimension", &self.dimension)
            .finish()
    }
}

fn resolve_model(name: &str) -> Result<EmbeddingModel> {
    match name {
        "all-MiniLM-L6-v2" => Ok(EmbeddingModel::AllMiniLML6V2),
        "bge-small-en-v1.5" => Ok(EmbeddingModel::BGESmallENV15),
        other => Err(EmbedError::invalid_config(format!(
            "unknown embedding model: {other}"
        ))),
    }
}

impl FastEmbedProvider {
    /// Load the configured model and probe its dimension.
    pub async fn create(config: EmbedConfig) -> Result<Self> {
        let model_kind = resolve_model(&config.model_name)?;
        tracing::info!("loading embedding model: {}", config.model_name);

        let (model, dimension) =
            tokio::task::spawn_blocking(move || -> Result<(TextEmbedding, usize)> {
                let init_options =
                    InitOptions::new(model_kind).with_show_download_progress(false);
                let mut model = TextEmbedding::try_new(init_options)
                    .map_err(|e| EmbedError::External { source: e })?;

                let probe = model
                    .embed(vec!["dimension probe".to_string()], None)
                    .map_err(|e| EmbedError::External { source: e })?;
                let dimension = probe.first().map(|emb| emb.len()).ok_or_else(|| {
                    EmbedError::invalid_config("model produced no probe embedding")
                })?;
                validate_raw(&probe, 1, dimension)?;
                Ok((model, dimension))
            })
            .await??;

        tracing::info!(
            "embedding model ready: {} (dimension {})",
            config.model_name,
            dimension
        );
        Ok(Self {
            config,
            model: Arc::new(Mutex::new(model)),
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        tracing::debug!("embedding {} texts", texts.len());
        let mut all_embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.config.batch_size) {
            let batch = batch.to_vec();
            let batch_len = batch.len();
            let model = Arc::clone(&self.model);

            let raw = tokio::task::spawn_blocking(move || -> Result<Vec<Vec<f32>>> {
                let mut guard = model.lock().expect("embedding model lock poisoned");
                guard
                    .embed(batch, None)
                    .map_err(|e| EmbedError::External { source: e })
            })
            .await??;

            validate_raw(&raw, batch_len, self.dimension)?;
            all_embeddings.extend(raw.into_iter().map(to_unit_f16));
        }

        Ok(EmbeddingResult::new(all_embeddings))
    }

    async fn embed_one(&self, text: &str) -> Result<Vec<f16>> {
        let texts = vec![text.to_string()];
        let result = self.embed_batch(&texts).await?;
        result
            .embeddings
            .into_iter()
            .next()
            .ok_or_else(|| EmbedError::embedding_gen(std::io::Error::other("empty batch result")))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn provider_name(&self) -> &str {
        "fastembed"
    }
}
