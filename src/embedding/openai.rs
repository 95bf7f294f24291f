//! Embeddings through an OpenAI-compatible endpoint (Cohere's compatibility API by default).

use super::Embedder;
use crate::config::EmbeddingSettings;
use crate::error::{Result, ScoutError};
use crate::openai::{create_client, map_api_error};
use crate::retry::RetryPolicy;
use async_openai::types::{CreateEmbeddingRequestArgs, EmbeddingInput};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, instrument};

/// Embedder for any provider speaking the OpenAI embeddings protocol.
pub struct OpenAIEmbedder {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: Option<u32>,
    retry: RetryPolicy,
}

impl OpenAIEmbedder {
    /// Create an embedder from settings and an API key.
    pub fn new(settings: &EmbeddingSettings, api_key: &str) -> Result<Self> {
        Ok(Self {
            client: create_client(
                &settings.api_base,
                api_key,
                Duration::from_secs(settings.timeout_secs),
            )?,
            model: settings.model.clone(),
            dimensions: settings.dimensions,
            retry: RetryPolicy::default(),
        })
    }

    /// Set the retry policy for embedding requests.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    async fn embed_once(&self, text: &str) -> Result<Vec<f32>> {
        let mut args = CreateEmbeddingRequestArgs::default();
        args.model(&self.model)
            .input(EmbeddingInput::String(text.to_string()));
        if let Some(dimensions) = self.dimensions {
            args.dimensions(dimensions);
        }
        let request = args
            .build()
            .map_err(|e| ScoutError::Embedding(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(|e| map_api_error("Embedding API error", e, ScoutError::Embedding))?;

        response
            .data
            .into_iter()
            .min_by_key(|e| e.index)
            .map(|e| e.embedding)
            .ok_or_else(|| ScoutError::Embedding("Empty embedding response".to_string()))
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    #[instrument(skip(self, text), fields(model = %self.model))]
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = self.retry.run("embedding", || self.embed_once(text)).await?;
        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }

    fn model(&self) -> &str {
        &self.model
    }
}
