use crate::error::AppError;
use std::path::Path;

/// Class names indexed by model output position. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct LabelTable {
    names: Vec<String>,
}

impl LabelTable {
    pub fn from_names(names: Vec<String>) -> Self {
        Self { names }
    }

    /// Parses newline-delimited text, one class per line, trimming each line.
    pub fn parse(text: &str) -> Self {
        Self::from_names(text.lines().map(|line| line.trim().to_string()).collect())
    }

    pub async fn load(path: &Path) -> Result<Self, AppError> {
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            AppError::from(format!(
                "Failed to read labels file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(Self::parse(&text))
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.names.get(idx).map(String::as_str)
    }

    /// Label for `idx`, or `class_<idx>` when the table has no entry for it.
    pub fn name(&self, idx: usize) -> String {
        self.get(idx)
            .map(str::to_string)
            .unwrap_or_else(|| format!("class_{}", idx))
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

/// Makes sure a label file exists at `path`, fetching it from `url` once.
/// Falls back to an empty table if neither the file nor the download is
/// available; classes are then reported by index.
pub async fn ensure_labels(path: &Path, url: &str) -> LabelTable {
    if !path.exists() {
        tracing::info!("Labels not found at {}, downloading {}", path.display(), url);
        if let Err(e) = crate::services::download::download_file(url, path).await {
            tracing::warn!("Failed to download labels: {}", e);
        }
    }

    match LabelTable::load(path).await {
        Ok(labels) => {
            tracing::info!("Loaded {} labels from {}", labels.len(), path.display());
            labels
        }
        Err(e) => {
            tracing::warn!("{}; classes will be reported by index", e);
            LabelTable::default()
        }
    }
}
