use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};
use url::Url;

use crate::config::Config;
use crate::error::{AppError, Result, Service};
use crate::importer::PlaylistSource;
use crate::youtube::auth;
use crate::youtube::models::{PlaylistItem, PlaylistItemsPage};

/// Provider cap on `maxResults` for `playlistItems.list`.
const MAX_RESULTS_PER_PAGE: &str = "50";

#[derive(Debug, Deserialize)]
struct PlaylistItemListResponse {
    #[serde(default)]
    items: Vec<ApiPlaylistItem>,
    #[serde(rename = "nextPageToken")]
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiPlaylistItem {
    snippet: Option<ApiSnippet>,
    #[serde(rename = "contentDetails")]
    content_details: Option<ApiContentDetails>,
}

#[derive(Debug, Deserialize)]
struct ApiSnippet {
    #[serde(default)]
    title: String,
}

#[derive(Debug, Deserialize)]
struct ApiContentDetails {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

pub struct YouTubeClient {
    http_client: Client,
    api_base: String,
    access_token: String,
}

impl YouTubeClient {
    /// Runs the interactive OAuth flow and returns a client bound to the session token.
    pub async fn authenticate(config: &Config) -> Result<Self> {
        let http_client = Client::new();
        let token = auth::authenticate_source(&http_client, config).await?;

        Ok(Self {
            http_client,
            api_base: config.youtube_api_base.trim_end_matches('/').to_string(),
            access_token: token.access_token,
        })
    }

    pub fn with_token(api_base: &str, access_token: &str) -> Self {
        Self {
            http_client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
        }
    }

    /// Parse a playlist reference and extract the playlist ID.
    /// Supports formats:
    /// - PLFgquLnL59alCl_2TQvOiD5Vgm1hCaGSI
    /// - https://www.youtube.com/playlist?list=PLFgquLnL59alCl_2TQvOiD5Vgm1hCaGSI
    /// - https://www.youtube.com/watch?v=kJQP7kiw5Fk&list=PLFgquLnL59alCl_2TQvOiD5Vgm1hCaGSI
    pub fn parse_playlist_id(input: &str) -> Result<String> {
        let input = input.trim();

        if !input.contains("://") {
            if input.is_empty() {
                return Err(AppError::Config("Playlist ID is empty".into()));
            }
            return Ok(input.to_string());
        }

        let url = Url::parse(input).map_err(|e| AppError::Config(format!("Invalid URL: {}", e)))?;

        url.query_pairs()
            .find(|(key, _)| key == "list")
            .map(|(_, value)| value.into_owned())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                AppError::Config("URL does not appear to be a YouTube playlist URL".into())
            })
    }

    pub async fn list_playlist_items(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsPage> {
        let url = format!("{}/playlistItems", self.api_base);

        let mut query = vec![
            ("part", "snippet,contentDetails"),
            ("playlistId", playlist_id),
            ("maxResults", MAX_RESULTS_PER_PAGE),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&query)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::from_response(Service::YouTube, response).await);
        }

        let body = response.text().await?;
        let page: PlaylistItemListResponse =
            serde_json::from_str(&body).map_err(|e| AppError::malformed(Service::YouTube, e))?;

        // Item keys are assigned after this filter, so offsets count playable items only.
        let mut items = Vec::with_capacity(page.items.len());
        for item in page.items {
            let title = item.snippet.map(|s| s.title).unwrap_or_default();
            match item.content_details.and_then(|c| c.video_id) {
                Some(video_id) => items.push(PlaylistItem { title, video_id }),
                None => debug!("Skipping playlist item without a video ID: {}", title),
            }
        }

        info!(
            "Fetched {} items from playlist {} (more pages: {})",
            items.len(),
            playlist_id,
            page.next_page_token.is_some()
        );

        Ok(PlaylistItemsPage {
            items,
            next_page_token: page.next_page_token,
        })
    }
}

#[async_trait]
impl PlaylistSource for YouTubeClient {
    async fn list_items_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsPage> {
        self.list_playlist_items(playlist_id, page_token).await
    }
}
