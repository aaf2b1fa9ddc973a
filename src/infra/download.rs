//! HTTP download functionality
//!
//! Handles downloading large datasets with progress reporting, retry with
//! exponential backoff, and archive extraction.

use futures::StreamExt;
use sha2::{Digest, Sha256};
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;

use crate::config::defaults;
use crate::error::DownloadError;

/// Longest pause between attempts
const MAX_BACKOFF_MS: u64 = 30_000;

/// Progress callback: bytes received, advertised total
pub type ProgressCallback = Box<dyn Fn(u64, u64) + Send + Sync>;

/// Download result containing file path and metadata
#[derive(Debug)]
pub struct DownloadResult {
    /// Path to the downloaded file
    pub path: PathBuf,
    /// Size in bytes
    pub size: u64,
    /// SHA256 checksum of the downloaded content
    pub checksum: String,
}

/// Download manager for fetching files with retry
#[derive(Debug, Clone)]
pub struct DownloadManager {
    /// HTTP client
    client: reqwest::Client,
    /// Maximum retry attempts
    max_retries: u32,
    /// Base delay for exponential backoff (in milliseconds)
    base_delay_ms: u64,
}

impl DownloadManager {
    /// Create a new download manager
    pub fn new() -> Self {
        Self::with_config(defaults::MAX_DOWNLOAD_RETRIES, 1000)
    }

    /// Create a download manager with custom settings
    pub fn with_config(max_retries: u32, base_delay_ms: u64) -> Self {
        Self {
            client: reqwest::Client::builder()
                .user_agent(defaults::USER_AGENT)
                .timeout(Duration::from_secs(600))
                .connect_timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
            max_retries,
            base_delay_ms,
        }
    }

    /// Get max retries
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Fetch a dataset archive into `dest`
    ///
    /// The body streams into a `.part` file next to `dest` and is renamed into
    /// place only when complete, so `dest` never holds a truncated archive.
    /// Failed attempts are retried after a delay that doubles each time, up to
    /// [`MAX_BACKOFF_MS`]. `progress` receives the bytes received so far and
    /// the advertised length, or 0 when the server sends none.
    pub async fn download(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<ProgressCallback>,
    ) -> Result<DownloadResult, DownloadError> {
        let staging = staging_path(dest);
        let mut delay_ms = self.base_delay_ms;
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self.download_once(url, &staging, progress.as_ref()).await {
                Ok(result) => {
                    tokio::fs::rename(&staging, dest)
                        .await
                        .map_err(|e| DownloadError::IoError {
                            path: dest.to_path_buf(),
                            error: e.to_string(),
                        })?;
                    return Ok(DownloadResult {
                        path: dest.to_path_buf(),
                        ..result
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        "Fetching {url} failed (attempt {attempt} of {}): {e}",
                        self.max_retries
                    );
                    last_error = Some(e);
                    if attempt < self.max_retries {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms = (delay_ms * 2).min(MAX_BACKOFF_MS);
                    }
                }
            }
        }

        let _ = tokio::fs::remove_file(&staging).await;

        Err(last_error.unwrap_or_else(|| DownloadError::MaxRetriesExceeded {
            url: url.to_string(),
            retries: self.max_retries,
        }))
    }

    /// One streaming GET into `dest`
    async fn download_once(
        &self,
        url: &str,
        dest: &Path,
        progress: Option<&ProgressCallback>,
    ) -> Result<DownloadResult, DownloadError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DownloadError::NetworkError {
                url: url.to_string(),
                error: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(DownloadError::NetworkError {
                url: url.to_string(),
                error: format!("HTTP {}", response.status()),
            });
        }

        let total_size = response.content_length().unwrap_or(0);

        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DownloadError::IoError {
                    path: parent.to_path_buf(),
                    error: e.to_string(),
                })?;
        }

        let mut file = File::create(dest)
            .await
            .map_err(|e| DownloadError::IoError {
                path: dest.to_path_buf(),
                error: e.to_string(),
            })?;

        let mut hasher = Sha256::new();
        let mut downloaded: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk_result) = stream.next().await {
            let chunk = chunk_result.map_err(|e| DownloadError::NetworkError {
                url: url.to_string(),
                error: e.to_string(),
            })?;

            file.write_all(&chunk)
                .await
                .map_err(|e| DownloadError::IoError {
                    path: dest.to_path_buf(),
                    error: e.to_string(),
                })?;

            hasher.update(&chunk);
            downloaded += chunk.len() as u64;

            if let Some(cb) = progress {
                cb(downloaded, total_size);
            }
        }

        file.flush().await.map_err(|e| DownloadError::IoError {
            path: dest.to_path_buf(),
            error: e.to_string(),
        })?;

        let checksum = hex::encode(hasher.finalize());
        tracing::debug!("Downloaded {url} ({downloaded} bytes, sha256 {checksum})");

        Ok(DownloadResult {
            path: dest.to_path_buf(),
            size: downloaded,
            checksum,
        })
    }
}

impl Default for DownloadManager {
    fn default() -> Self {
        Self::new()
    }
}

/// `<dest>.part`, where an in-flight download is written
fn staging_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    dest.with_file_name(name)
}

/// Compute SHA256 checksum of data
pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Extract a zip archive into `dest_dir`, dropping the archive's top-level folder
///
/// `water-polygons-split-4326/water_polygons.shp` lands at
/// `dest_dir/water_polygons.shp`. Entries that would escape `dest_dir` are
/// skipped. Returns the paths of the extracted files.
pub fn extract_zip_flat(archive: &Path, dest_dir: &Path) -> Result<Vec<PathBuf>, DownloadError> {
    let archive_err = |e: &dyn std::fmt::Display| DownloadError::Archive {
        path: archive.to_path_buf(),
        error: e.to_string(),
    };

    let file = std::fs::File::open(archive).map_err(|e| archive_err(&e))?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| archive_err(&e))?;

    std::fs::create_dir_all(dest_dir).map_err(|e| DownloadError::IoError {
        path: dest_dir.to_path_buf(),
        error: e.to_string(),
    })?;

    let mut extracted = Vec::new();
    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| archive_err(&e))?;
        if entry.is_dir() {
            continue;
        }

        let Some(relative) = entry.enclosed_name().and_then(|p| strip_first_component(&p)) else {
            tracing::warn!("Skipping archive entry '{}'", entry.name());
            continue;
        };

        let target = dest_dir.join(&relative);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DownloadError::IoError {
                path: parent.to_path_buf(),
                error: e.to_string(),
            })?;
        }

        let mut out = std::fs::File::create(&target).map_err(|e| DownloadError::IoError {
            path: target.clone(),
            error: e.to_string(),
        })?;
        std::io::copy(&mut entry, &mut out).map_err(|e| DownloadError::IoError {
            path: target.clone(),
            error: e.to_string(),
        })?;

        extracted.push(target);
    }

    Ok(extracted)
}

/// Drop the first normal path component; single-component paths are kept
fn strip_first_component(path: &Path) -> Option<PathBuf> {
    let parts: Vec<_> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();

    match parts.len() {
        0 => None,
        1 => Some(PathBuf::from(parts[0])),
        _ => Some(parts[1..].iter().collect()),
    }
}
