//! Nearest-neighbour lookup over the document store.
//!
//! Every query scans the whole store: the corpus is a few thousand food
//! records, where a linear pass is cheaper than maintaining an index.


use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::Result;
use crate::embeddings::{EmbeddingGateway, EmbeddingServiceError};
use crate::store::{Document, DocumentStore, Metadata, foreign_models};

const DEFAULT_EMBED_TIMEOUT: Duration = Duration::from_secs(30);

/// A stored document as returned to callers, without its embedding
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub id: String,
    pub text: String,
    pub metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f32>,
}

/// Cosine similarity of `a` and `b`.
///
/// When either vector has zero norm the raw dot product is returned instead
/// of dividing by zero. Vectors of different length are compared over their
/// common prefix.
#[inline]
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (dot, norm_a, norm_b) = a.iter().zip(b).fold(
        (0.0_f64, 0.0_f64, 0.0_f64),
        |(dot, norm_a, norm_b), (&x, &y)| {
            let (x, y) = (f64::from(x), f64::from(y));
            (x.mul_add(y, dot), x.mul_add(x, norm_a), y.mul_add(y, norm_b))
        },
    );

    let denominator = norm_a.sqrt() * norm_b.sqrt();
    let similarity = if denominator == 0.0 {
        dot
    } else {
        dot / denominator
    };

    similarity as f32
}

/// Score every document against `query` and return the best `top_k`, best
/// first. Equal scores keep store order.
#[inline]
pub fn rank(query: &[f32], documents: &[Document], top_k: usize) -> Vec<RetrievedChunk> {
    let mut scored: Vec<(usize, f32)> = documents
        .iter()
        .enumerate()
        .map(|(index, document)| (index, cosine_similarity(query, &document.embedding)))
        .collect();

    // NaN sorts last so the comparison stays a total order
    scored.sort_by(|(_, a), (_, b)| match (a.is_nan(), b.is_nan()) {
        (false, false) => b.partial_cmp(a).unwrap_or(Ordering::Equal),
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (true, true) => Ordering::Equal,
    });

    scored
        .into_iter()
        .take(top_k)
        .filter_map(|(index, score)| {
            documents.get(index).map(|document| RetrievedChunk {
                id: document.id.clone(),
                text: document.text.clone(),
                metadata: document.metadata.clone(),
                score: Some(score),
            })
        })
        .collect()
}

/// Answers "which stored foods are closest to this question"
pub struct Retriever {
    store: Arc<dyn DocumentStore>,
    gateway: Arc<dyn EmbeddingGateway>,
    timeout: Duration,
}

impl Retriever {
    #[inline]
    pub fn new(store: Arc<dyn DocumentStore>, gateway: Arc<dyn EmbeddingGateway>) -> Self {
        Self {
            store,
            gateway,
            timeout: DEFAULT_EMBED_TIMEOUT,
        }
    }

    /// Upper bound on the query embedding call
    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Retrieve the `top_k` most similar documents, surfacing embedding failures.
    ///
    /// An empty store returns immediately without calling the gateway.
    #[inline]
    pub async fn try_retrieve(&self, query: &str, top_k: usize) -> Result<Vec<RetrievedChunk>> {
        if top_k == 0 {
            return Ok(Vec::new());
        }

        let documents = self.store.load().await;
        if documents.is_empty() {
            debug!("Store is empty, skipping query embedding");
            return Ok(Vec::new());
        }

        let foreign = foreign_models(&documents, self.gateway.model());
        if !foreign.is_empty() {
            warn!(
                "Query embedded with {} but the store holds vectors from {:?}; re-ingest to get meaningful scores",
                self.gateway.model(),
                foreign
            );
        }

        let query_vector = self.embed_query(query).await?;
        let chunks = rank(&query_vector, &documents, top_k);

        debug!(
            "Retrieved {} of {} documents for query (length {})",
            chunks.len(),
            documents.len(),
            query.len()
        );
        Ok(chunks)
    }

    /// Retrieve for a chat request. Failures never reach the caller: they are
    /// logged and produce an empty result, so the conversation continues
    /// without grounding context.
    #[inline]
    pub async fn retrieve(&self, query: &str, top_k: usize) -> Vec<RetrievedChunk> {
        match self.try_retrieve(query, top_k).await {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!("Retrieval unavailable, continuing without context: {}", e);
                Vec::new()
            }
        }
    }

    async fn embed_query(&self, query: &str) -> std::result::Result<Vec<f32>, EmbeddingServiceError> {
        let texts = [query.to_string()];
        let vectors = tokio::time::timeout(self.timeout, self.gateway.embed(&texts))
            .await
            .map_err(|_| EmbeddingServiceError::Timeout(self.timeout))??;

        vectors.into_iter().next().ok_or_else(|| {
            EmbeddingServiceError::MalformedResponse("no vector returned for query".to_string())
        })
    }
}
