#[cfg(test)]
mod tests;

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tokio::fs;
use tracing::{debug, warn};

use super::{Document, DocumentStore, StoreError};
use crate::Result;

/// Flat-file store: the whole collection is one JSON array, rewritten on
/// every save. Concurrent writers are not coordinated; the last save wins.
///
/// Loads are cached and reused while the file's modification time and
/// length are unchanged.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    cache: Mutex<Option<Snapshot>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
}

#[derive(Debug)]
struct Snapshot {
    stamp: FileStamp,
    documents: Arc<Vec<Document>>,
}

impl FileStamp {
    fn of(metadata: &std::fs::Metadata) -> Option<Self> {
        metadata.modified().ok().map(|modified| Self {
            modified,
            len: metadata.len(),
        })
    }
}

impl JsonFileStore {
    #[inline]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn cached(&self, stamp: FileStamp) -> Option<Vec<Document>> {
        let guard = self.cache.lock().ok()?;
        guard
            .as_ref()
            .filter(|snapshot| snapshot.stamp == stamp)
            .map(|snapshot| snapshot.documents.as_ref().clone())
    }

    fn remember(&self, stamp: Option<FileStamp>, documents: Vec<Document>) {
        if let Ok(mut guard) = self.cache.lock() {
            *guard = stamp.map(|stamp| Snapshot {
                stamp,
                documents: Arc::new(documents),
            });
        }
    }

    fn write_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn load(&self) -> Vec<Document> {
        let metadata = match fs::metadata(&self.path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No store file at {}, starting empty", self.path.display());
                return Vec::new();
            }
            Err(e) => {
                warn!(
                    "Cannot stat store file {}, treating as empty: {}",
                    self.path.display(),
                    e
                );
                return Vec::new();
            }
        };

        let stamp = FileStamp::of(&metadata);
        if let Some(documents) = stamp.and_then(|stamp| self.cached(stamp)) {
            debug!("Store cache hit for {}", self.path.display());
            return documents;
        }

        let raw = match fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(
                    "Cannot read store file {}, treating as empty: {}",
                    self.path.display(),
                    e
                );
                return Vec::new();
            }
        };

        match serde_json::from_str::<Vec<Document>>(&raw) {
            Ok(documents) => {
                debug!(
                    "Loaded {} documents from {}",
                    documents.len(),
                    self.path.display()
                );
                self.remember(stamp, documents.clone());
                documents
            }
            Err(e) => {
                warn!(
                    "Store file {} is not a valid document array, treating as empty: {}",
                    self.path.display(),
                    e
                );
                Vec::new()
            }
        }
    }

    async fn save(&self, documents: &[Document]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| self.write_error(e))?;
        }

        let payload = serde_json::to_vec(documents).map_err(StoreError::from)?;

        // Write beside the target and rename so readers never see a partial file
        let mut tmp_name = self.path.as_os_str().to_owned();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, &payload)
            .await
            .map_err(|e| self.write_error(e))?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| self.write_error(e))?;

        let stamp = fs::metadata(&self.path)
            .await
            .ok()
            .and_then(|metadata| FileStamp::of(&metadata));
        self.remember(stamp, documents.to_vec());

        debug!(
            "Saved {} documents to {}",
            documents.len(),
            self.path.display()
        );
        Ok(())
    }
}
