use async_trait::async_trait;
use std::path::PathBuf;
use tokio::process::Command;
use tracing::debug;

use crate::error::{AppError, Result};
use crate::metadata::{MetadataExtractor, VideoMetadata};

/// Extracts metadata by shelling out to `yt-dlp --dump-json`.
pub struct YtDlpExtractor {
    binary: PathBuf,
}

impl YtDlpExtractor {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn parse_metadata(url: &str, json: &str) -> Result<VideoMetadata> {
        serde_json::from_str(json).map_err(|e| AppError::Metadata {
            url: url.to_string(),
            reason: format!("Failed to parse yt-dlp JSON: {}", e),
        })
    }
}

#[async_trait]
impl MetadataExtractor for YtDlpExtractor {
    async fn extract(&self, url: &str) -> Result<VideoMetadata> {
        debug!("Running {} for {}", self.binary.display(), url);

        let output = Command::new(&self.binary)
            .arg("--dump-json")
            .arg("--no-playlist")
            .arg("--skip-download")
            .arg("--no-warnings")
            .arg(url)
            .output()
            .await
            .map_err(|e| {
                // A binary that cannot be started fails every item, not just this one.
                AppError::Config(format!(
                    "Failed to execute {} (set YTDLP_PATH): {}",
                    self.binary.display(),
                    e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::Metadata {
                url: url.to_string(),
                reason: stderr.trim().to_string(),
            });
        }

        let json = String::from_utf8_lossy(&output.stdout);
        Self::parse_metadata(url, &json)
    }
}
