use api_client::ApiClientError;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DownloadError {
    #[error(transparent)]
    Api(#[from] ApiClientError),
    #[error("io error: {0}")]
    Io(String),
}

impl DownloadError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, DownloadError::Api(e) if e.is_unauthorized())
    }
}

pub const SELECTED_ARCHIVE_NAME: &str = "selected_photos.zip";

pub fn album_archive_name(album_id: i64) -> String {
    format!("album_{}.zip", album_id)
}

/// Write a downloaded archive to `dir/name`, creating `dir` if needed.
pub async fn save_archive(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, DownloadError> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| DownloadError::Io(e.to_string()))?;
    let path = dir.join(name);
    let mut file = File::create(&path)
        .await
        .map_err(|e| DownloadError::Io(e.to_string()))?;
    file.write_all(bytes)
        .await
        .map_err(|e| DownloadError::Io(e.to_string()))?;
    file.flush().await.map_err(|e| DownloadError::Io(e.to_string()))?;
    tracing::info!("Saved {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}
