use crate::error::AppError;
use crate::models::history_types::HistoryEntry;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

pub const DEFAULT_HISTORY_LIMIT: usize = 200;

/// Bounded prediction log kept as a single JSON array on disk.
///
/// Writes are best-effort: a failed save is logged and otherwise ignored, and
/// an unreadable file is treated as an empty history. Mutations are serialized
/// through `write_lock` so concurrent appends cannot overwrite each other.
pub struct HistoryStore {
    path: PathBuf,
    limit: usize,
    write_lock: Mutex<()>,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>, limit: usize) -> Self {
        Self {
            path: path.into(),
            limit,
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// All stored entries, oldest first.
    pub async fn read_all(&self) -> Vec<HistoryEntry> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read history {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };

        let records = match serde_json::from_slice::<Vec<serde_json::Value>>(&bytes) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable history {}: {}",
                    self.path.display(),
                    e
                );
                return Vec::new();
            }
        };

        // A single malformed record is skipped rather than costing the rest.
        records
            .into_iter()
            .filter_map(|record| match serde_json::from_value::<HistoryEntry>(record) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping history record in {}: {}", self.path.display(), e);
                    None
                }
            })
            .collect()
    }

    /// Adds `entry` at the end, dropping the oldest entries beyond the limit.
    pub async fn append(&self, entry: HistoryEntry) {
        let _guard = self.write_lock.lock().await;

        let mut items = self.read_all().await;
        items.push(entry);
        if items.len() > self.limit {
            let excess = items.len() - self.limit;
            items.drain(..excess);
        }

        if let Err(e) = self.persist(&items).await {
            tracing::error!("Failed to save history {}: {}", self.path.display(), e);
        }
    }

    /// Removes the history file. A missing file counts as success.
    pub async fn clear(&self) -> Result<(), AppError> {
        let _guard = self.write_lock.lock().await;

        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::info!("Cleared history {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::persistence(e.to_string())),
        }
    }

    async fn persist(&self, items: &[HistoryEntry]) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::persistence(e.to_string()))?;
        }

        let json = serde_json::to_vec(items)
            .map_err(|e| AppError::persistence(format!("Failed to serialize history: {}", e)))?;

        let mut tmp_name = self.path.file_name().unwrap_or_default().to_os_string();
        tmp_name.push(".tmp");
        let tmp = self.path.with_file_name(tmp_name);

        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| AppError::persistence(e.to_string()))?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(AppError::persistence(e.to_string()));
        }
        Ok(())
    }
}
