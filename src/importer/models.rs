use std::collections::BTreeMap;
use std::fmt;

use crate::error::{AppError, Result};

/// Source playlist to read and title of the playlist to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistReference {
    source_playlist_id: String,
    target_title: String,
}

impl PlaylistReference {
    pub fn new(
        source_playlist_id: impl Into<String>,
        target_title: impl Into<String>,
    ) -> Result<Self> {
        let source_playlist_id = source_playlist_id.into().trim().to_string();
        let target_title = target_title.into().trim().to_string();

        if source_playlist_id.is_empty() {
            return Err(AppError::Config("Source playlist ID is empty".into()));
        }
        if target_title.is_empty() {
            return Err(AppError::Config("Target playlist title is empty".into()));
        }

        Ok(Self {
            source_playlist_id,
            target_title,
        })
    }

    pub fn source_playlist_id(&self) -> &str {
        &self.source_playlist_id
    }

    pub fn target_title(&self) -> &str {
        &self.target_title
    }
}

/// Position of an item in the source playlist: page index, then index among the
/// playable items of that page. Entries without a video ID are dropped by the
/// source before keys are assigned, so they take no offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemKey {
    pub page: usize,
    pub offset: usize,
}

impl ItemKey {
    pub fn new(page: usize, offset: usize) -> Self {
        Self { page, offset }
    }
}

impl fmt::Display for ItemKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.page, self.offset)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SongInfo {
    pub key: ItemKey,
    pub video_title: String,
    pub source_url: String,
    pub track_name: String,
    pub artist_name: String,
    pub target_uri: Option<String>,
}

/// Resolved URIs in source order. Songs without a match are left out.
pub fn collect_uris(working_set: &BTreeMap<ItemKey, SongInfo>) -> Vec<String> {
    working_set
        .values()
        .filter_map(|song| song.target_uri.clone())
        .collect()
}

#[cfg(test)]
impl SongInfo {
    pub fn mock(key: ItemKey, title: &str, target_uri: Option<&str>) -> Self {
        Self {
            key,
            video_title: title.to_string(),
            source_url: format!("https://www.youtube.com/watch?v={}", key),
            track_name: title.to_string(),
            artist_name: "Mock Artist".to_string(),
            target_uri: target_uri.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_requires_both_fields() {
        let reference = PlaylistReference::new(" PL123 ", "Road trip").unwrap();
        assert_eq!(reference.source_playlist_id(), "PL123");
        assert_eq!(reference.target_title(), "Road trip");

        assert!(PlaylistReference::new("", "Road trip").is_err());
        assert!(PlaylistReference::new("PL123", "  ").is_err());
    }

    #[test]
    fn test_item_keys_order_by_page_then_offset() {
        let mut keys = vec![ItemKey::new(1, 0), ItemKey::new(0, 49), ItemKey::new(0, 2)];
        keys.sort();
        assert_eq!(
            keys,
            vec![ItemKey::new(0, 2), ItemKey::new(0, 49), ItemKey::new(1, 0)]
        );
    }

    #[test]
    fn test_collect_uris_skips_unmatched_and_keeps_duplicate_titles() {
        let mut working_set = BTreeMap::new();
        for song in [
            SongInfo::mock(ItemKey::new(1, 0), "Intro", Some("spotify:track:c")),
            SongInfo::mock(ItemKey::new(0, 0), "Intro", Some("spotify:track:a")),
            SongInfo::mock(ItemKey::new(0, 1), "Unreleased demo", None),
        ] {
            working_set.insert(song.key, song);
        }

        assert_eq!(
            collect_uris(&working_set),
            vec!["spotify:track:a".to_string(), "spotify:track:c".to_string()]
        );
    }
}
