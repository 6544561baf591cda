use crate::error::AppError;
use futures::StreamExt;
use std::path::{Path, PathBuf};

/// Streams `url` into `dest`. The body lands in a `.part` sibling first and is
/// renamed into place once complete, so an interrupted download never leaves
/// a truncated file at `dest`.
pub async fn download_file(url: &str, dest: &Path) -> Result<(), AppError> {
    let client = reqwest::Client::new();
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(format!("Failed to download {}: HTTP {}", url, response.status()).into());
    }

    if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            AppError::from(format!(
                "Failed to create directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let part = partial_path(dest);
    let result = match write_body(url, response, &part).await {
        Ok(downloaded) => tokio::fs::rename(&part, dest)
            .await
            .map(|_| downloaded)
            .map_err(|e| {
                AppError::from(format!(
                    "Failed to move {} into place: {}",
                    part.display(),
                    e
                ))
            }),
        Err(e) => Err(e),
    };

    match result {
        Ok(downloaded) => {
            tracing::info!("Downloaded {} ({} bytes) to {}", url, downloaded, dest.display());
            Ok(())
        }
        Err(e) => {
            let _ = tokio::fs::remove_file(&part).await;
            Err(e)
        }
    }
}

/// Writes the response body to `part` and returns the number of bytes written.
async fn write_body(
    url: &str,
    response: reqwest::Response,
    part: &Path,
) -> Result<u64, AppError> {
    let total_size = response.content_length().unwrap_or(0);
    let mut downloaded: u64 = 0;

    let mut file = tokio::fs::File::create(part).await.map_err(|e| {
        AppError::from(format!("Failed to create file {}: {}", part.display(), e))
    })?;

    let mut stream = response.bytes_stream();
    let mut last_logged = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        downloaded += chunk.len() as u64;
        tokio::io::AsyncWriteExt::write_all(&mut file, &chunk)
            .await
            .map_err(|e| AppError::from(format!("Failed to write to file: {}", e)))?;

        if total_size > 0 {
            let progress = (downloaded * 100) / total_size;
            // Log every 10% to keep the output readable
            if progress >= last_logged + 10 {
                tracing::info!("Downloading {}: {}%", url, progress);
                last_logged = progress;
            }
        }
    }
    tokio::io::AsyncWriteExt::flush(&mut file)
        .await
        .map_err(|e| AppError::from(format!("Failed to flush file: {}", e)))?;

    Ok(downloaded)
}

fn partial_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}
