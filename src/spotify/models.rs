use serde::{Deserialize, Serialize};

pub const PLAYLIST_DESCRIPTION: &str = "Generated from YouTube playlist";

#[derive(Debug, Serialize)]
pub(crate) struct CreatePlaylistRequest<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub public: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CreatedPlaylist {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    pub tracks: SearchTracks,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchTracks {
    pub items: Vec<SpotifyTrack>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpotifyTrack {
    pub uri: String,
}

/// Search expression using the service's field filters.
pub fn track_query(track: &str, artist: &str) -> String {
    format!("track:{} artist:{}", track.trim(), artist.trim())
}
