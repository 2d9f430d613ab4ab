
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::retry::RetryPolicy;
use super::{Embedding, EmbeddingGateway, EmbeddingServiceError, check_vectors};
use crate::config::EmbeddingConfig;

/// Client for a local Ollama server's batch `/api/embed` endpoint
#[derive(Debug, Clone)]
pub struct OllamaClient {
    base_url: Url,
    model: String,
    batch_size: usize,
    agent: ureq::Agent,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    model: &'a str,
    #[serde(rename = "input")]
    inputs: &'a [String],
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<Embedding>,
}

impl OllamaClient {
    #[inline]
    pub fn new(config: &EmbeddingConfig) -> Result<Self, EmbeddingServiceError> {
        let base_url = config.endpoint_url()?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_seconds)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.model.clone(),
            batch_size: config.batch_size.max(1) as usize,
            agent,
            retry: RetryPolicy {
                attempts: config.retry_attempts,
                ..RetryPolicy::default()
            },
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry.attempts = attempts;
        self
    }

    #[inline]
    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.retry.backoff = backoff;
        self
    }

    /// Generate embeddings for multiple text inputs using batch processing
    #[inline]
    pub fn embed_blocking(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingServiceError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut results = Vec::with_capacity(texts.len());

        // Process in batches to avoid overwhelming the server
        for chunk in texts.chunks(self.batch_size) {
            results.extend(self.embed_single_batch(chunk)?);
        }

        debug!("Generated {} embeddings total", results.len());
        Ok(results)
    }

    fn embed_single_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingServiceError> {
        let request = BatchEmbedRequest {
            model: &self.model,
            inputs: texts,
        };

        let url = self.base_url.join("api/embed").map_err(|e| {
            EmbeddingServiceError::Request(format!("Failed to build batch embedding URL: {}", e))
        })?;

        let request_json = serde_json::to_string(&request).map_err(|e| {
            EmbeddingServiceError::Request(format!(
                "Failed to serialize batch embedding request: {}",
                e
            ))
        })?;

        let response_text = self.retry.run(self.base_url.as_str(), || {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let batch_response: BatchEmbedResponse = serde_json::from_str(&response_text)
            .map_err(|e| EmbeddingServiceError::MalformedResponse(e.to_string()))?;

        check_vectors(texts.len(), &batch_response.embeddings)?;

        Ok(batch_response.embeddings)
    }
}

#[async_trait]
impl EmbeddingGateway for OllamaClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingServiceError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let client = self.clone();
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || client.embed_blocking(&texts))
            .await
            .map_err(|e| EmbeddingServiceError::Request(format!("Embedding task failed: {}", e)))?
    }

    fn model(&self) -> &str {
        &self.model
    }
}
