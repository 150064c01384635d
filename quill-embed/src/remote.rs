//! Embedding via a remote embeddings API.
//!
//! Speaks the widely-implemented `POST {base}/embeddings` JSON shape, so it
//! works against hosted embedding endpoints as well as local inference
//! servers that mimic them. The service is rate-limited and billable
//! territory; failures surface as [`EmbedError`] and abort the calling
//! operation rather than degrade it.

use crate::config::RemoteEmbedConfig;
use crate::error::{EmbedError, Result};
use crate::provider::{EmbeddingProvider, EmbeddingResult, to_unit_f16, validate_raw};
use async_trait::async_trait;
use half::f16;
use serde::{Deserialize, Serialize};

#[derive(Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingObject>,
}

#[derive(Deserialize)]
struct EmbeddingObject {
    index: usize,
    embedding: Vec<f32>,
}

/// Embedding provider backed by a remote embeddings service.
#[derive(Debug, Clone)]
pub struct HttpEmbeddingProvider {
    config: RemoteEmbedConfig,
    client: reqwest::Client,
    endpoint: String,
    dimension: usize,
}

impl HttpEmbeddingProvider {
    /// Build the client and probe the service once to learn the model's
    /// dimension. Fails fast if the service is unreachable, so a
    /// misconfigured deployment dies at startup instead of mid-query.
    pub async fn connect(config: RemoteEmbedConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        let endpoint = format!("{}/embeddings", config.base_url.trim_end_matches('/'));

        let mut provider = Self {
            config,
            client,
            endpoint,
            dimension: 0,
        };

        let probe = provider
            .request(&["dimension probe".to_string()])
            .await?;
        let dimension = probe.first().map(|e| e.len()).ok_or_else(|| {
            EmbedError::invalid_config("embedding service returned no probe embedding")
        })?;
        validate_raw(&probe, 1, dimension)?;
        provider.dimension = dimension;

        tracing::info!(
            "embedding service ready: {} model {} (dimension {})",
            provider.endpoint,
            provider.config.model,
            dimension
        );
        Ok(provider)
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut request = self.client.post(&self.endpoint).json(&EmbeddingsRequest {
            model: &self.config.model,
            input: texts,
        });
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response: EmbeddingsResponse = request
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Services are allowed to reorder; the index field is authoritative.
        let mut data = response.data;
        data.sort_by_key(|obj| obj.index);
        Ok(data.into_iter().map(|obj| obj.embedding).collect())
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<EmbeddingResult> {
        if texts.is_empty() {
            return Ok(EmbeddingResult::new(vec![]));
        }

        let mut all_embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.config.batch_size) {
            tracing::debug!("requesting {} embeddings", batch.len());
            let raw = self.request(batch).await?;
            validate_raw(&raw, batch.len(), self.dimension)?;
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
        "remote"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_parsing_respects_index_order() {
        let body = r#"{
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        }"#;
        let parsed: EmbeddingsResponse = serde_json::from_str(body).unwrap();
        let mut data = parsed.data;
        data.sort_by_key(|obj| obj.index);
        assert_eq!(data[0].embedding, vec![1.0, 0.0]);
        assert_eq!(data[1].embedding, vec![0.0, 1.0]);
    }
}
