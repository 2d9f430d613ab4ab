//! Tabular food datasets into store documents.
//!
//! Source files use different column names for the same fact, so every
//! field is looked up through a list of aliases. Rows never fail: a row
//! without any recognised column still becomes a document named `Unknown`.
//! Failing to read a file, on the other hand, aborts the whole run.

#[cfg(test)]
mod tests;

use fancy_regex::Regex;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tracing::{debug, info};

use crate::embeddings::EmbeddingGateway;
use crate::nutrients::NUTRIENTS;
use crate::store::{DocumentStore, MergeReport, Metadata, NewDocument};
use crate::{RagError, Result};

/// A source row: column header to trimmed cell value
pub type Row = HashMap<String, String>;

pub const UNKNOWN_NAME: &str = "Unknown";
pub const SOURCE_TAG: &str = "foods_csv";
pub const NAME_ALIASES: &[&str] = &["food", "name"];
const TEXT_DELIMITER: &str = " | ";

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-z0-9]+").expect("valid regex"));

/// Derive a document id from a food name.
///
/// Lowercases, collapses each run of characters outside `a-z0-9` into one
/// `-` and trims separators from both ends, so `"Mung Dal!"` and `"mung-dal"`
/// deliberately map to the same id.
#[inline]
pub fn slugify(name: &str) -> String {
    let lowered = name.to_lowercase();
    let collapsed = NON_ALPHANUMERIC.replace_all(&lowered, "-");
    let slug = collapsed.trim_matches('-');

    if slug.is_empty() {
        UNKNOWN_NAME.to_lowercase()
    } else {
        slug.to_string()
    }
}

/// First non-empty value among `aliases`, in priority order
fn pick<'a>(row: &'a Row, aliases: &[&str]) -> Option<&'a str> {
    aliases
        .iter()
        .filter_map(|alias| row.get(*alias))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
}

/// Map one source row to an unembedded document
#[inline]
pub fn row_to_document(row: &Row) -> NewDocument {
    let name = pick(row, NAME_ALIASES).unwrap_or(UNKNOWN_NAME);

    let mut metadata = Metadata::new();
    metadata.insert("name".to_string(), Value::from(name));

    let mut parts = vec![format!("Food: {}", name)];
    for nutrient in &NUTRIENTS {
        let value = pick(row, nutrient.aliases).unwrap_or_default();
        if !value.is_empty() {
            parts.push(nutrient.describe(value));
        }
        metadata.insert(nutrient.key.to_string(), Value::from(value));
    }
    metadata.insert("source".to_string(), Value::from(SOURCE_TAG));

    NewDocument {
        id: slugify(name),
        text: parts.join(TEXT_DELIMITER),
        metadata,
    }
}

/// Expand input paths into the CSV files to ingest. Directories contribute
/// their `.csv` files in name order.
#[inline]
pub fn discover_sources(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut sources = Vec::new();

    for path in paths {
        if path.is_dir() {
            let entries = std::fs::read_dir(path).map_err(|e| {
                RagError::Ingest(format!(
                    "Failed to read dataset directory {}: {}",
                    path.display(),
                    e
                ))
            })?;

            let mut found: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_csv(p))
                .collect();
            found.sort();
            debug!("Found {} CSV files in {}", found.len(), path.display());
            sources.extend(found);
        } else if path.is_file() {
            sources.push(path.clone());
        } else {
            return Err(RagError::Ingest(format!(
                "Dataset path not found: {}",
                path.display()
            )));
        }
    }

    if sources.is_empty() {
        return Err(RagError::Ingest(
            "No CSV files found in the given paths".to_string(),
        ));
    }

    Ok(sources)
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// Read every record of a CSV file with a header row. Cells are trimmed and
/// short records simply lack the missing columns.
#[inline]
pub fn read_csv_file(path: &Path) -> Result<Vec<Row>> {
    let read_error =
        |e: csv::Error| RagError::Ingest(format!("Failed to read {}: {}", path.display(), e));

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(read_error)?;

    let headers = reader.headers().map_err(read_error)?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(read_error)?;
        let row: Row = headers
            .iter()
            .zip(record.iter())
            .map(|(header, value)| (header.to_string(), value.to_string()))
            .collect();
        rows.push(row);
    }

    Ok(rows)
}

/// Summary of an ingestion run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub files: usize,
    pub rows: usize,
    pub merge: MergeReport,
}

/// Maps source rows to documents and merges them into a store in one batch
pub struct Ingestor {
    store: Arc<dyn DocumentStore>,
    gateway: Arc<dyn EmbeddingGateway>,
}

impl Ingestor {
    #[inline]
    pub fn new(store: Arc<dyn DocumentStore>, gateway: Arc<dyn EmbeddingGateway>) -> Self {
        Self { store, gateway }
    }

    /// Ingest every CSV reachable from `paths`. All files are read before the
    /// single merge, so an unreadable file leaves the store untouched.
    #[inline]
    pub async fn ingest_paths(&self, paths: &[PathBuf]) -> Result<IngestReport> {
        let files = discover_sources(paths)?;
        info!("Found {} CSV files. Reading...", files.len());

        let mut rows = Vec::new();
        for file in &files {
            let file_rows = read_csv_file(file)?;
            info!(
                "Loaded {} rows from {}",
                file_rows.len(),
                file.file_name().unwrap_or_default().to_string_lossy()
            );
            rows.extend(file_rows);
        }

        let merge = self.ingest_rows(&rows).await?;

        Ok(IngestReport {
            files: files.len(),
            rows: rows.len(),
            merge,
        })
    }

    /// Map `rows` and merge them as one batch
    #[inline]
    pub async fn ingest_rows(&self, rows: &[Row]) -> Result<MergeReport> {
        let documents: Vec<NewDocument> = rows.iter().map(row_to_document).collect();
        info!("Preparing {} documents...", documents.len());

        self.store.merge(self.gateway.as_ref(), documents).await
    }
}
