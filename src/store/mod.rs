//! Document persistence for the retrieval layer.
//!
//! A store holds [`Document`]s keyed by `id`. It only ever grows: merging a
//! document whose id is already present keeps the stored copy, including its
//! embedding, so re-ingesting a dataset never re-embeds or duplicates rows.
//! Changes to a source record therefore do not propagate unless the stored
//! document is removed first.

pub mod json;


use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::Result;
use crate::embeddings::{Embedding, EmbeddingGateway, EmbeddingServiceError};

pub use json::JsonFileStore;

/// Open key/value metadata kept alongside each document
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Metadata key recording which model produced a document's embedding
pub const EMBEDDING_MODEL_KEY: &str = "embedding_model";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub embedding: Embedding,
}

/// A document that has not been embedded yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewDocument {
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Outcome of a merge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeReport {
    /// Documents embedded and inserted by this merge
    pub added: usize,
    /// Incoming documents whose id was already stored or repeated in the batch
    pub skipped: usize,
    /// Documents in the store after the merge
    pub total: usize,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to write store file {}: {source}", .path.display())]
    Write {
        path: std::path::PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize documents: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(
        "Embedding dimension mismatch: store holds {expected}-dimensional vectors but the model returned {actual}"
    )]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Distinct `embedding_model` tags in `documents` that differ from `model`.
/// Documents without a tag are not counted.
#[inline]
pub fn foreign_models<'a>(documents: &'a [Document], model: &str) -> BTreeSet<&'a str> {
    documents
        .iter()
        .filter_map(|d| d.metadata.get(EMBEDDING_MODEL_KEY))
        .filter_map(|v| v.as_str())
        .filter(|tag| *tag != model)
        .collect()
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All stored documents. A missing or unreadable store is empty; this never fails.
    async fn load(&self) -> Vec<Document>;

    /// Replace the persisted collection with `documents`
    async fn save(&self, documents: &[Document]) -> Result<()>;

    /// Insert the documents whose ids are not yet stored, embedding them with
    /// a single gateway call, then persist the merged collection.
    ///
    /// Merging the same batch twice has no further effect and makes no second
    /// embedding call. An embedding failure aborts the merge before anything
    /// is written.
    async fn merge(
        &self,
        gateway: &dyn EmbeddingGateway,
        new_documents: Vec<NewDocument>,
    ) -> Result<MergeReport> {
        let mut documents = self.load().await;
        let mut known: HashSet<String> = documents.iter().map(|d| d.id.clone()).collect();

        let mut pending = Vec::new();
        let mut skipped = 0;
        for document in new_documents {
            if known.insert(document.id.clone()) {
                pending.push(document);
            } else {
                skipped += 1;
            }
        }

        debug!(
            "Merge: {} stored, {} new, {} skipped",
            documents.len(),
            pending.len(),
            skipped
        );

        let added = pending.len();
        if !pending.is_empty() {
            let foreign = foreign_models(&documents, gateway.model());
            if !foreign.is_empty() {
                warn!(
                    "Store holds vectors from {:?} but new documents are embedded with {}; similarity across models is meaningless",
                    foreign,
                    gateway.model()
                );
            }

            let texts: Vec<String> = pending.iter().map(|d| d.text.clone()).collect();
            let vectors = gateway.embed(&texts).await?;

            if vectors.len() != pending.len() {
                return Err(EmbeddingServiceError::CountMismatch {
                    expected: pending.len(),
                    actual: vectors.len(),
                }
                .into());
            }

            let expected_dimension = documents
                .first()
                .map(|d| d.embedding.len())
                .or_else(|| vectors.first().map(Vec::len))
                .unwrap_or_default();
            if let Some(bad) = vectors.iter().find(|v| v.len() != expected_dimension) {
                return Err(StoreError::DimensionMismatch {
                    expected: expected_dimension,
                    actual: bad.len(),
                }
                .into());
            }

            let model = gateway.model();
            documents.extend(pending.into_iter().zip(vectors).map(|(document, embedding)| {
                let mut metadata = document.metadata;
                metadata
                    .entry(EMBEDDING_MODEL_KEY)
                    .or_insert_with(|| model.into());
                Document {
                    id: document.id,
                    text: document.text,
                    metadata,
                    embedding,
                }
            }));
        }

        self.save(&documents).await?;

        let report = MergeReport {
            added,
            skipped,
            total: documents.len(),
        };
        info!(
            "Merged {} new documents ({} already present), store now holds {}",
            report.added, report.skipped, report.total
        );

        Ok(report)
    }
}
