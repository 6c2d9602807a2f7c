pub const WATCH_URL_BASE: &str = "https://www.youtube.com/watch";

#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistItem {
    pub title: String,
    pub video_id: String,
}

impl PlaylistItem {
    /// Canonical watch URL used as the metadata lookup key.
    pub fn watch_url(&self) -> String {
        format!(
            "{}?v={}",
            WATCH_URL_BASE,
            urlencoding::encode(&self.video_id)
        )
    }
}

/// One page of `playlistItems.list`, in playlist order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaylistItemsPage {
    pub items: Vec<PlaylistItem>,
    pub next_page_token: Option<String>,
}

#[cfg(test)]
impl PlaylistItem {
    pub fn mock(title: &str, video_id: &str) -> Self {
        Self {
            title: title.to_string(),
            video_id: video_id.to_string(),
        }
    }
}
