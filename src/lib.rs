use thiserror::Error;

pub type Result<T> = std::result::Result<T, RagError>;

#[derive(Error, Debug)]
pub enum RagError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Store(#[from] store::StoreError),

    #[error(transparent)]
    Embedding(#[from] embeddings::EmbeddingServiceError),

    #[error("Ingestion error: {0}")]
    Ingest(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub mod commands;
pub mod config;
pub mod context;
pub mod embeddings;
pub mod ingest;
pub mod nutrients;
pub mod retrieval;
pub mod store;
