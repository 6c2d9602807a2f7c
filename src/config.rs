use std::path::PathBuf;

use crate::error::{AppError, Result};

pub const DEFAULT_CLIENT_SECRET_FILE: &str = "client_secret.json";
pub const DEFAULT_YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";
pub const DEFAULT_SPOTIFY_API_BASE: &str = "https://api.spotify.com/v1";
pub const DEFAULT_YTDLP_PATH: &str = "yt-dlp";

#[derive(Debug, Clone)]
pub struct Config {
    /// Google OAuth client secret downloaded from the Cloud console.
    pub youtube_client_secret_file: PathBuf,
    /// Overrides the first redirect URI listed in the client secret.
    pub youtube_redirect_uri: Option<String>,
    pub youtube_api_base: String,
    pub spotify_token: String,
    pub spotify_user_id: String,
    pub spotify_api_base: String,
    pub ytdlp_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self::from_vars(|key| std::env::var(key).ok());

        let missing = config.get_missing_config();
        if !missing.is_empty() {
            return Err(AppError::Config(format!("{} not set", missing.join(", "))));
        }

        Ok(config)
    }

    /// Builds a config from an arbitrary variable lookup. Blank values count as unset.
    pub fn from_vars<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| get(key).filter(|v| !v.trim().is_empty());

        Self {
            youtube_client_secret_file: var("YOUTUBE_CLIENT_SECRET_FILE")
                .unwrap_or_else(|| DEFAULT_CLIENT_SECRET_FILE.to_string())
                .into(),
            youtube_redirect_uri: var("YOUTUBE_REDIRECT_URI"),
            youtube_api_base: var("YOUTUBE_API_BASE")
                .unwrap_or_else(|| DEFAULT_YOUTUBE_API_BASE.to_string()),
            spotify_token: var("SPOTIFY_TOKEN").unwrap_or_default(),
            spotify_user_id: var("SPOTIFY_USER_ID").unwrap_or_default(),
            spotify_api_base: var("SPOTIFY_API_BASE")
                .unwrap_or_else(|| DEFAULT_SPOTIFY_API_BASE.to_string()),
            ytdlp_path: var("YTDLP_PATH")
                .unwrap_or_else(|| DEFAULT_YTDLP_PATH.to_string())
                .into(),
        }
    }

    pub fn get_missing_config(&self) -> Vec<String> {
        let mut missing = Vec::new();

        if self.spotify_token.is_empty() {
            missing.push("SPOTIFY_TOKEN".to_string());
        }
        if self.spotify_user_id.is_empty() {
            missing.push("SPOTIFY_USER_ID".to_string());
        }

        missing
    }
}

/// What a call site does when an external call fails for a single item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum FailurePolicy {
    /// Stop the whole run with the error.
    Abort,
    /// Record the failure in the report and continue with the next item.
    #[default]
    Skip,
}

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub dry_run: bool,
    /// Items resolved at once. 1 processes the playlist strictly one item at a time.
    pub concurrency: usize,
    pub on_metadata_error: FailurePolicy,
    pub on_search_error: FailurePolicy,
    pub show_progress: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            concurrency: 4,
            on_metadata_error: FailurePolicy::Skip,
            on_search_error: FailurePolicy::Skip,
            show_progress: true,
        }
    }
}
