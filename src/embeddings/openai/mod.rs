
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use super::retry::RetryPolicy;
use super::{Embedding, EmbeddingGateway, EmbeddingServiceError, check_vectors};
use crate::config::EmbeddingConfig;

/// Client for endpoints implementing the OpenAI `/embeddings` protocol
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    endpoint: Url,
    model: String,
    authorization: String,
    batch_size: usize,
    agent: ureq::Agent,
    retry: RetryPolicy,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Embedding,
    #[serde(default)]
    index: usize,
}

fn build_agent(timeout: Duration) -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build()
        .into()
}

impl OpenAiClient {
    #[inline]
    pub fn new(config: &EmbeddingConfig, api_key: String) -> Result<Self, EmbeddingServiceError> {
        let endpoint = config.endpoint_url()?.join("embeddings").map_err(|e| {
            EmbeddingServiceError::Request(format!("Failed to build embedding URL: {}", e))
        })?;

        Ok(Self {
            endpoint,
            model: config.model.clone(),
            authorization: format!("Bearer {}", api_key),
            batch_size: config.batch_size.max(1) as usize,
            agent: build_agent(Duration::from_secs(config.timeout_seconds)),
            retry: RetryPolicy {
                attempts: config.retry_attempts,
                ..RetryPolicy::default()
            },
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = build_agent(timeout);
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

    #[inline]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Embed `texts` on the calling thread, splitting into `batch_size` requests
    #[inline]
    pub fn embed_blocking(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingServiceError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut vectors = Vec::with_capacity(texts.len());
        for chunk in texts.chunks(self.batch_size) {
            vectors.extend(self.embed_single_batch(chunk)?);
        }

        debug!("Generated {} embeddings total", vectors.len());
        Ok(vectors)
    }

    fn embed_single_batch(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingServiceError> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };
        let request_json = serde_json::to_string(&request).map_err(|e| {
            EmbeddingServiceError::Request(format!("Failed to serialize embedding request: {}", e))
        })?;

        let response_text = self.retry.run(self.endpoint.as_str(), || {
            self.agent
                .post(self.endpoint.as_str())
                .header("Content-Type", "application/json")
                .header("Authorization", self.authorization.as_str())
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })?;

        let mut response: EmbeddingResponse = serde_json::from_str(&response_text)
            .map_err(|e| EmbeddingServiceError::MalformedResponse(e.to_string()))?;

        // Providers may return items out of order; `index` is authoritative
        response.data.sort_by_key(|item| item.index);

        let vectors: Vec<Embedding> = response.data.into_iter().map(|d| d.embedding).collect();
        check_vectors(texts.len(), &vectors)?;

        Ok(vectors)
    }
}

#[async_trait]
impl EmbeddingGateway for OpenAiClient {
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
