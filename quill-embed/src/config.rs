//! Provider configuration.

use std::time::Duration;

/// Configuration for the in-process fastembed provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedConfig {
    /// Name of the embedding model to load (e.g. "all-MiniLM-L6-v2").
    pub model_name: String,
    /// Maximum batch size passed to the model per call.
    pub batch_size: usize,
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            model_name: "all-MiniLM-L6-v2".to_string(),
            batch_size: 16,
        }
    }
}

impl EmbedConfig {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}

/// Configuration for a remote embeddings API.
///
/// The service is expected to speak the common
/// `POST {base_url}/embeddings {"model": .., "input": [..]}` JSON shape.
#[derive(Debug, Clone)]
pub struct RemoteEmbedConfig {
    /// Base URL of the service, without the `/embeddings` suffix.
    pub base_url: String,
    /// Model identifier sent with each request.
    pub model: String,
    /// Optional bearer token.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Maximum texts per request.
    pub batch_size: usize,
}

impl RemoteEmbedConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            timeout: Duration::from_secs(30),
            batch_size: 32,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }
}
