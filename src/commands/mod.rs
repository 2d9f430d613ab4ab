
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::context::format_context;
use crate::embeddings::{EmbeddingGateway, build_gateway};
use crate::ingest::Ingestor;
use crate::retrieval::Retriever;
use crate::store::{DocumentStore, EMBEDDING_MODEL_KEY, JsonFileStore};

/// Overrides the dataset location when `ingest` is run without paths
pub const DATA_DIR_ENV: &str = "RAG_DATA_DIR";
const DEFAULT_DATA_DIR: &str = "data";

/// Dataset paths used when none are given on the command line
#[inline]
pub fn default_data_paths() -> Vec<PathBuf> {
    let dir = std::env::var_os(DATA_DIR_ENV)
        .filter(|v| !v.is_empty())
        .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from);
    vec![dir]
}

fn open_store(config: &Config) -> Arc<JsonFileStore> {
    let path = config.store_path();
    debug!("Using document store at {}", path.display());
    Arc::new(JsonFileStore::new(path))
}

fn open_gateway(config: &Config) -> Result<Arc<dyn EmbeddingGateway>> {
    build_gateway(&config.embedding).context("Failed to set up the embedding provider")
}

fn retriever_with(config: &Config, gateway: Arc<dyn EmbeddingGateway>) -> Retriever {
    let timeout = Duration::from_secs(config.embedding.timeout_seconds);
    Retriever::new(open_store(config), gateway).with_timeout(timeout)
}

/// Grounding block for `text`. Any failure, including an embedding provider
/// that cannot be set up, yields an empty block.
#[inline]
pub async fn context_block(config: &Config, text: &str, top_k: usize) -> String {
    let gateway = match open_gateway(config) {
        Ok(gateway) => gateway,
        Err(e) => {
            warn!("Embedding provider unavailable, continuing without context: {:#}", e);
            return String::new();
        }
    };

    let chunks = retriever_with(config, gateway).retrieve(text, top_k).await;
    format_context(&chunks)
}

/// Ingest CSV datasets into the configured store
#[inline]
pub async fn ingest(paths: Vec<PathBuf>) -> Result<()> {
    let config = Config::load()?;
    let paths = if paths.is_empty() {
        default_data_paths()
    } else {
        paths
    };

    let store = open_store(&config);
    let ingestor = Ingestor::new(Arc::clone(&store) as Arc<dyn DocumentStore>, open_gateway(&config)?);

    let spinner = if console::user_attended_stderr() {
        let bar = ProgressBar::new_spinner().with_style(
            ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
                .expect("style template is valid"),
        );
        bar.set_message(format!("Embedding with {}", config.embedding.model));
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    } else {
        ProgressBar::hidden()
    };

    let result = ingestor.ingest_paths(&paths).await;
    spinner.finish_and_clear();
    let report = result.context("Ingestion failed")?;

    info!(
        "Ingested {} rows from {} files into {}",
        report.rows,
        report.files,
        store.path().display()
    );

    println!("{}", style("✓ Ingestion complete").green().bold());
    println!("  Files read: {}", report.files);
    println!("  Rows read: {}", report.rows);
    println!("  Documents added: {}", report.merge.added);
    println!("  Already present: {}", report.merge.skipped);
    println!("  Store size: {}", report.merge.total);
    println!("  Store: {}", store.path().display());

    Ok(())
}

/// Print the documents closest to `text`, with their similarity scores
#[inline]
pub async fn query(text: String, top_k: Option<usize>) -> Result<()> {
    let config = Config::load()?;
    let top_k = config.retrieval.resolve_top_k(top_k)?;

    let chunks = retriever_with(&config, open_gateway(&config)?)
        .try_retrieve(&text, top_k)
        .await
        .context("Retrieval failed")?;

    if chunks.is_empty() {
        println!("No matching food facts. Run 'nutriveda-rag ingest' to populate the store.");
        return Ok(());
    }

    println!("Top {} results for: {}", chunks.len(), style(&text).bold());
    println!();
    for (rank, chunk) in chunks.iter().enumerate() {
        let score = chunk
            .score
            .map_or_else(|| "-".to_string(), |s| format!("{:.4}", s));
        println!(
            "{}. {} {}",
            rank + 1,
            style(&chunk.id).cyan(),
            style(format!("(score {})", score)).dim()
        );
        println!("   {}", chunk.text);
    }

    Ok(())
}

/// Print the grounding block a chat request for `text` would receive
#[inline]
pub async fn context(text: String, top_k: Option<usize>) -> Result<()> {
    let config = Config::load()?;
    let top_k = config.retrieval.resolve_top_k(top_k)?;

    let block = context_block(&config, &text, top_k).await;

    if block.is_empty() {
        eprintln!("{}", style("No context available for this question.").yellow());
    } else {
        println!("{}", block);
    }

    Ok(())
}

/// Show a summary of the store and the embedding configuration
#[inline]
pub async fn show_status() -> Result<()> {
    let config = Config::load().unwrap_or_default();
    let store = open_store(&config);

    println!("📊 NutriVeda RAG Status Report");
    println!("{}", "=".repeat(50));
    println!();

    println!("🗄️  Document Store:");
    println!("   📁 Path: {}", store.path().display());
    match tokio::fs::metadata(store.path()).await {
        Ok(metadata) => {
            if let Ok(modified) = metadata.modified() {
                let modified: DateTime<Local> = modified.into();
                println!(
                    "   🕒 Last Modified: {}",
                    modified.format("%Y-%m-%d %H:%M:%S")
                );
            }
            println!("   💾 Size: {:.2} KB", metadata.len() as f64 / 1024.0);
        }
        Err(_) => {
            println!("   ⚠️  Store file does not exist yet");
        }
    }

    let documents = store.load().await;
    println!("   📊 Documents: {}", documents.len());

    if let Some(first) = documents.first() {
        println!("   🔢 Dimensions: {}", first.embedding.len());

        let models: BTreeSet<&str> = documents
            .iter()
            .filter_map(|d| d.metadata.get(EMBEDDING_MODEL_KEY))
            .filter_map(|v| v.as_str())
            .collect();
        if !models.is_empty() {
            println!(
                "   🤖 Embedded With: {}",
                models.into_iter().collect::<Vec<_>>().join(", ")
            );
        }

        let sources: BTreeSet<&str> = documents
            .iter()
            .filter_map(|d| d.metadata.get("source"))
            .filter_map(|v| v.as_str())
            .collect();
        if !sources.is_empty() {
            println!(
                "   🏷️  Sources: {}",
                sources.into_iter().collect::<Vec<_>>().join(", ")
            );
        }
    }

    println!();
    println!("🧮 Embedding Provider:");
    println!("   🔌 Provider: {}", config.embedding.provider);
    println!("   🌐 Endpoint: {}", config.embedding.base_url);
    println!("   📋 Model: {}", config.embedding.model);
    println!("   📦 Batch Size: {}", config.embedding.batch_size);
    match open_gateway(&config) {
        Ok(_) => println!("   ✅ Ready"),
        Err(e) => println!("   ❌ Not ready - {:#}", e),
    }

    println!();
    println!("🔍 Retrieval:");
    println!("   🎯 Top K: {}", config.retrieval.top_k);
    println!("   ⏱️  Timeout: {}s", config.embedding.timeout_seconds);

    Ok(())
}
