// Embeddings module
// Gateway trait over the external embedding service and its HTTP providers

pub mod ollama;
pub mod openai;
mod retry;

#[cfg(test)]
pub(crate) mod testing;

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::{ConfigError, EmbeddingConfig, EmbeddingProvider};

pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

/// A dense vector produced by the embedding model
pub type Embedding = Vec<f32>;

#[derive(Debug, Error)]
pub enum EmbeddingServiceError {
    #[error("Embedding request failed: {0}")]
    Request(String),

    #[error("Embedding service returned HTTP {status}")]
    Status { status: u16 },

    #[error("Malformed embedding response: {0}")]
    MalformedResponse(String),

    #[error("Mismatch between request and response counts: {expected} vs {actual}")]
    CountMismatch { expected: usize, actual: usize },

    #[error("Embedding request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Embedding service misconfigured")]
    Configuration(#[from] ConfigError),
}

/// Converts text into fixed-length vectors.
///
/// `embed` preserves order and arity: the vector at position `i` belongs to
/// `texts[i]`. An empty input yields an empty output without contacting the
/// service.
#[async_trait]
pub trait EmbeddingGateway: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Embedding>, EmbeddingServiceError>;

    /// Identifier of the model producing the vectors, recorded on stored documents
    fn model(&self) -> &str;
}

/// Build the configured gateway. Called once by the composition root; the
/// returned handle is shared by ingestion and retrieval.
#[inline]
pub fn build_gateway(
    config: &EmbeddingConfig,
) -> Result<Arc<dyn EmbeddingGateway>, EmbeddingServiceError> {
    debug!(
        "Building {} embedding gateway for model {}",
        config.provider, config.model
    );

    let gateway: Arc<dyn EmbeddingGateway> = match config.provider {
        EmbeddingProvider::OpenAi => {
            let api_key = config.api_key()?;
            Arc::new(OpenAiClient::new(config, api_key)?)
        }
        EmbeddingProvider::Ollama => Arc::new(OllamaClient::new(config)?),
    };

    Ok(gateway)
}

/// Reject responses that are not one non-empty vector per input
pub(crate) fn check_vectors(
    expected: usize,
    vectors: &[Embedding],
) -> Result<(), EmbeddingServiceError> {
    if vectors.len() != expected {
        return Err(EmbeddingServiceError::CountMismatch {
            expected,
            actual: vectors.len(),
        });
    }

    if let Some(position) = vectors.iter().position(Vec::is_empty) {
        return Err(EmbeddingServiceError::MalformedResponse(format!(
            "empty embedding at position {}",
            position
        )));
    }

    Ok(())
}
