use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, Result, Service};
use crate::importer::TrackCatalog;
use crate::spotify::models::{
    CreatePlaylistRequest, CreatedPlaylist, PLAYLIST_DESCRIPTION, SearchResponse, track_query,
};

const SEARCH_LIMIT: &str = "20";

/// Most URIs the service accepts in one add-tracks request.
pub const MAX_TRACKS_PER_REQUEST: usize = 100;

pub struct SpotifyClient {
    http_client: Client,
    api_base: String,
    access_token: String,
    user_id: String,
}

impl SpotifyClient {
    pub fn new(config: &Config) -> Self {
        Self::with_base_url(
            &config.spotify_api_base,
            &config.spotify_token,
            &config.spotify_user_id,
        )
    }

    pub fn with_base_url(api_base: &str, access_token: &str, user_id: &str) -> Self {
        Self {
            http_client: Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            access_token: access_token.to_string(),
            user_id: user_id.to_string(),
        }
    }

    /// Returns the URI of the first search hit; later results are never considered.
    pub async fn search_track(&self, track: &str, artist: &str) -> Result<Option<String>> {
        let url = format!("{}/search", self.api_base);
        let query = track_query(track, artist);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[
                // The Web API documents `q`; older scripts sent `query`.
                ("q", query.as_str()),
                ("type", "track"),
                ("offset", "0"),
                ("limit", SEARCH_LIMIT),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::from_response(Service::Spotify, response).await);
        }

        let body = response.text().await?;
        let search: SearchResponse =
            serde_json::from_str(&body).map_err(|e| AppError::malformed(Service::Spotify, e))?;

        let uri = search.tracks.items.into_iter().next().map(|t| t.uri);
        match &uri {
            Some(uri) => debug!("Matched '{}' by {} to {}", track, artist, uri),
            None => debug!("No Spotify result for '{}' by {}", track, artist),
        }

        Ok(uri)
    }

    pub async fn create_playlist(&self, name: &str) -> Result<String> {
        let url = format!(
            "{}/users/{}/playlists",
            self.api_base,
            urlencoding::encode(&self.user_id)
        );

        let request = CreatePlaylistRequest {
            name,
            description: PLAYLIST_DESCRIPTION,
            public: true,
        };

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AppError::from_response(Service::Spotify, response).await);
        }

        let body = response.text().await?;
        let playlist: CreatedPlaylist =
            serde_json::from_str(&body).map_err(|e| AppError::malformed(Service::Spotify, e))?;

        info!("Created Spotify playlist: {} ({})", name, playlist.id);

        Ok(playlist.id)
    }

    /// Adds URIs in order. Every request must be answered with 201 Created.
    pub async fn add_tracks_to_playlist(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<()> {
        if uris.is_empty() {
            return Ok(());
        }

        let url = format!(
            "{}/playlists/{}/tracks",
            self.api_base,
            urlencoding::encode(playlist_id)
        );

        let mut added = 0;
        for chunk in uris.chunks(MAX_TRACKS_PER_REQUEST) {
            let response = self
                .http_client
                .post(&url)
                .bearer_auth(&self.access_token)
                .json(chunk)
                .send()
                .await?;

            let status = response.status();
            if status != StatusCode::CREATED {
                let error_text = response.text().await.unwrap_or_default();
                debug!("Add tracks response ({}): {}", status, error_text);
                if added > 0 {
                    warn!(
                        "Playlist {} left partially filled: {} of {} tracks added",
                        playlist_id,
                        added,
                        uris.len()
                    );
                }
                return Err(AppError::BulkInsert {
                    status: status.as_u16(),
                });
            }
            added += chunk.len();
        }

        info!("Added {} tracks to playlist", uris.len());
        Ok(())
    }
}

#[async_trait]
impl TrackCatalog for SpotifyClient {
    async fn search_track(&self, track: &str, artist: &str) -> Result<Option<String>> {
        SpotifyClient::search_track(self, track, artist).await
    }

    async fn create_playlist(&self, title: &str) -> Result<String> {
        SpotifyClient::create_playlist(self, title).await
    }

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<()> {
        self.add_tracks_to_playlist(playlist_id, uris).await
    }
}
