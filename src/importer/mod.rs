pub mod models;
pub mod orchestrator;
pub mod report;

pub use models::{ItemKey, PlaylistReference, SongInfo};
pub use orchestrator::PlaylistImporter;
pub use report::{FailedItem, ImportReport, Stage};

use async_trait::async_trait;

use crate::error::Result;
use crate::youtube::PlaylistItemsPage;

/// Read side: where the playlist items come from.
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    async fn list_items_page(
        &self,
        playlist_id: &str,
        page_token: Option<&str>,
    ) -> Result<PlaylistItemsPage>;
}

/// Write side: the service the new playlist is created on.
#[async_trait]
pub trait TrackCatalog: Send + Sync {
    async fn search_track(&self, track: &str, artist: &str) -> Result<Option<String>>;

    async fn create_playlist(&self, title: &str) -> Result<String>;

    async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<()>;
}
