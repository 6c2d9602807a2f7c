pub mod ytdlp;

pub use ytdlp::YtDlpExtractor;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Result;

/// Song metadata inferred for a single video. Either field may be unknown.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct VideoMetadata {
    #[serde(default)]
    pub track: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
}

impl VideoMetadata {
    /// Track and artist, when both are known and non-blank.
    pub fn song(&self) -> Option<(String, String)> {
        let non_blank = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Some((non_blank(&self.track)?, non_blank(&self.artist)?))
    }
}

#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Looks up metadata for a watch URL without downloading the media.
    async fn extract(&self, url: &str) -> Result<VideoMetadata>;
}
