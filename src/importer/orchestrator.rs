use futures::{StreamExt, TryStreamExt, stream};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::config::{Config, FailurePolicy, ImportOptions};
use crate::error::{AppError, Result};
use crate::importer::models::{ItemKey, PlaylistReference, SongInfo, collect_uris};
use crate::importer::report::{FailedItem, ImportReport, Stage};
use crate::importer::{PlaylistSource, TrackCatalog};
use crate::metadata::{MetadataExtractor, YtDlpExtractor};
use crate::spotify::SpotifyClient;
use crate::youtube::{PlaylistItem, YouTubeClient};

/// What happened to one playlist item after metadata lookup and search.
#[derive(Debug)]
enum ItemOutcome {
    Resolved(SongInfo),
    Unresolved,
    Failed(FailedItem),
}

pub struct PlaylistImporter<S, M, C> {
    source: S,
    extractor: M,
    catalog: C,
    options: ImportOptions,
}

impl PlaylistImporter<YouTubeClient, YtDlpExtractor, SpotifyClient> {
    /// Authenticates against YouTube and wires up the production clients.
    pub async fn connect(config: &Config, options: ImportOptions) -> Result<Self> {
        let source = Self::authenticate_source(config).await?;
        let extractor = YtDlpExtractor::new(config.ytdlp_path.clone());
        let catalog = SpotifyClient::new(config);

        Ok(Self::new(source, extractor, catalog, options))
    }

    pub async fn authenticate_source(config: &Config) -> Result<YouTubeClient> {
        YouTubeClient::authenticate(config).await
    }
}

impl<S, M, C> PlaylistImporter<S, M, C>
where
    S: PlaylistSource,
    M: MetadataExtractor,
    C: TrackCatalog,
{
    pub fn new(source: S, extractor: M, catalog: C, options: ImportOptions) -> Self {
        Self {
            source,
            extractor,
            catalog,
            options,
        }
    }

    /// Copies the referenced playlist: fetch, resolve and search every item,
    /// then create the target playlist and add all matches in one pass.
    pub async fn run(&self, reference: &PlaylistReference) -> Result<ImportReport> {
        info!(
            "Importing YouTube playlist {} into '{}' (dry_run={})",
            reference.source_playlist_id(),
            reference.target_title(),
            self.options.dry_run
        );

        let mut report = ImportReport::new(reference, self.options.dry_run);

        let pages = self
            .fetch_playlist_items(reference.source_playlist_id())
            .await?;
        report.total_items = pages.iter().map(Vec::len).sum();
        info!(
            "Got all {} videos from YouTube ({} pages)",
            report.total_items,
            pages.len()
        );

        let outcomes = self.resolve_items(&pages).await?;

        let mut working_set: BTreeMap<ItemKey, SongInfo> = BTreeMap::new();
        for outcome in outcomes {
            match outcome {
                ItemOutcome::Resolved(song) => {
                    working_set.insert(song.key, song);
                }
                ItemOutcome::Unresolved => report.unresolved_items += 1,
                ItemOutcome::Failed(failed) => report.failed_items.push(failed),
            }
        }

        let uris = collect_uris(&working_set);
        let (matched, not_found): (Vec<SongInfo>, Vec<SongInfo>) = working_set
            .into_values()
            .partition(|song| song.target_uri.is_some());
        report.matched = matched;
        report.not_found = not_found;

        if self.options.dry_run {
            info!("Dry run: skipping playlist creation ({} tracks)", uris.len());
            report.finish();
            return Ok(report);
        }

        let playlist_id = self.create_target_playlist(reference.target_title()).await?;
        info!("Created playlist with ID {}", playlist_id);
        report.target_playlist_id = Some(playlist_id.clone());

        info!("Adding {} songs to playlist", uris.len());
        self.bulk_add_tracks(&playlist_id, &uris).await?;
        report.tracks_added = uris.len();

        report.finish();
        info!(
            "Import completed: {}/{} videos matched ({:.1}%)",
            report.matched.len(),
            report.total_items,
            report.match_rate()
        );

        Ok(report)
    }

    /// Follows `nextPageToken` until a page comes back without one.
    pub async fn fetch_playlist_items(
        &self,
        playlist_id: &str,
    ) -> Result<Vec<Vec<PlaylistItem>>> {
        let mut pages = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .source
                .list_items_page(playlist_id, page_token.as_deref())
                .await?;

            debug!("Page {}: {} items", pages.len(), page.items.len());
            pages.push(page.items);

            match page.next_page_token.filter(|token| !token.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        Ok(pages)
    }

    /// Track and artist for an item, or `None` when either is unknown.
    pub async fn resolve_song_metadata(
        &self,
        item: &PlaylistItem,
    ) -> Result<Option<(String, String)>> {
        let url = item.watch_url();
        let metadata = self.extractor.extract(&url).await?;

        let song = metadata.song();
        if song.is_none() {
            debug!("No track/artist metadata for '{}' ({})", item.title, url);
        }

        Ok(song)
    }

    pub async fn search_target_track(
        &self,
        track_name: &str,
        artist_name: &str,
    ) -> Result<Option<String>> {
        self.catalog.search_track(track_name, artist_name).await
    }

    pub async fn create_target_playlist(&self, title: &str) -> Result<String> {
        self.catalog.create_playlist(title).await
    }

    pub async fn bulk_add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<()> {
        self.catalog.add_tracks(playlist_id, uris).await
    }

    async fn resolve_items(&self, pages: &[Vec<PlaylistItem>]) -> Result<Vec<ItemOutcome>> {
        let items: Vec<(ItemKey, &PlaylistItem)> = pages
            .iter()
            .enumerate()
            .flat_map(|(page, items)| {
                items
                    .iter()
                    .enumerate()
                    .map(move |(offset, item)| (ItemKey::new(page, offset), item))
            })
            .collect();

        let pb = self.progress_bar(items.len());

        let outcomes = stream::iter(items)
            .map(|(key, item)| {
                let pb = pb.clone();
                async move {
                    pb.set_message(item.title.clone());
                    let outcome = self.process_item(key, item).await;
                    pb.inc(1);
                    outcome
                }
            })
            .buffered(self.options.concurrency.max(1))
            .try_collect::<Vec<_>>()
            .await;

        pb.finish_and_clear();
        outcomes
    }

    async fn process_item(&self, key: ItemKey, item: &PlaylistItem) -> Result<ItemOutcome> {
        let (track_name, artist_name) = match self.resolve_song_metadata(item).await {
            Ok(Some(song)) => song,
            Ok(None) => return Ok(ItemOutcome::Unresolved),
            Err(e) => {
                let policy = self.options.on_metadata_error;
                return self.handle_failure(policy, key, item, Stage::Metadata, e);
            }
        };

        let target_uri = match self.search_target_track(&track_name, &artist_name).await {
            Ok(uri) => uri,
            Err(e) => {
                let policy = self.options.on_search_error;
                return self.handle_failure(policy, key, item, Stage::Search, e);
            }
        };

        Ok(ItemOutcome::Resolved(SongInfo {
            key,
            video_title: item.title.clone(),
            source_url: item.watch_url(),
            track_name,
            artist_name,
            target_uri,
        }))
    }

    fn handle_failure(
        &self,
        policy: FailurePolicy,
        key: ItemKey,
        item: &PlaylistItem,
        stage: Stage,
        error: AppError,
    ) -> Result<ItemOutcome> {
        if policy == FailurePolicy::Abort || error.is_fatal() {
            return Err(error);
        }

        warn!("Skipping '{}' after {} failure: {}", item.title, stage, error);
        Ok(ItemOutcome::Failed(FailedItem {
            key,
            video_title: item.title.clone(),
            stage,
            reason: error.to_string(),
        }))
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.options.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::VideoMetadata;
    use crate::youtube::PlaylistItemsPage;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves pre-built pages keyed by the cursor that requests them.
    struct FakeSource {
        pages: HashMap<Option<String>, PlaylistItemsPage>,
        requested: Mutex<Vec<Option<String>>>,
    }

    impl FakeSource {
        fn new(pages: Vec<(Option<&str>, PlaylistItemsPage)>) -> Self {
            Self {
                pages: pages
                    .into_iter()
                    .map(|(token, page)| (token.map(str::to_string), page))
                    .collect(),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PlaylistSource for FakeSource {
        async fn list_items_page(
            &self,
            _playlist_id: &str,
            page_token: Option<&str>,
        ) -> Result<PlaylistItemsPage> {
            let token = page_token.map(str::to_string);
            self.requested.lock().unwrap().push(token.clone());
            self.pages.get(&token).cloned().ok_or(AppError::ProviderRequest {
                service: crate::error::Service::YouTube,
                status: 400,
                body: "invalidPageToken".to_string(),
            })
        }
    }

    /// Metadata keyed by watch URL. Unknown URLs fail like an unavailable video.
    struct FakeExtractor {
        songs: HashMap<String, VideoMetadata>,
    }

    impl FakeExtractor {
        fn new(songs: &[(&str, Option<&str>, Option<&str>)]) -> Self {
            Self {
                songs: songs
                    .iter()
                    .map(|(video_id, track, artist)| {
                        (
                            format!("https://www.youtube.com/watch?v={video_id}"),
                            VideoMetadata {
                                track: track.map(str::to_string),
                                artist: artist.map(str::to_string),
                            },
                        )
                    })
                    .collect(),
            }
        }
    }

    #[async_trait]
    impl MetadataExtractor for FakeExtractor {
        async fn extract(&self, url: &str) -> Result<VideoMetadata> {
            self.songs.get(url).cloned().ok_or_else(|| AppError::Metadata {
                url: url.to_string(),
                reason: "ERROR: Video unavailable".to_string(),
            })
        }
    }

    #[derive(Default)]
    struct FakeCatalog {
        results: HashMap<String, Vec<String>>,
        search_status: Option<u16>,
        add_status: Option<u16>,
        created: Mutex<Vec<String>>,
        added: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl FakeCatalog {
        fn with_results(results: Vec<(&str, Vec<&str>)>) -> Self {
            Self {
                results: results
                    .into_iter()
                    .map(|(track, uris)| {
                        (
                            track.to_string(),
                            uris.into_iter().map(str::to_string).collect(),
                        )
                    })
                    .collect(),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl TrackCatalog for FakeCatalog {
        async fn search_track(&self, track: &str, _artist: &str) -> Result<Option<String>> {
            if let Some(status) = self.search_status {
                return Err(AppError::ProviderRequest {
                    service: crate::error::Service::Spotify,
                    status,
                    body: String::new(),
                });
            }
            Ok(self
                .results
                .get(track)
                .and_then(|uris| uris.first().cloned()))
        }

        async fn create_playlist(&self, title: &str) -> Result<String> {
            self.created.lock().unwrap().push(title.to_string());
            Ok("new_playlist".to_string())
        }

        async fn add_tracks(&self, playlist_id: &str, uris: &[String]) -> Result<()> {
            if let Some(status) = self.add_status {
                return Err(AppError::BulkInsert { status });
            }
            self.added
                .lock()
                .unwrap()
                .push((playlist_id.to_string(), uris.to_vec()));
            Ok(())
        }
    }

    fn page(items: &[(&str, &str)], next: Option<&str>) -> PlaylistItemsPage {
        PlaylistItemsPage {
            items: items
                .iter()
                .map(|(title, id)| PlaylistItem::mock(title, id))
                .collect(),
            next_page_token: next.map(str::to_string),
        }
    }

    fn options() -> ImportOptions {
        ImportOptions {
            show_progress: false,
            ..Default::default()
        }
    }

    fn reference() -> PlaylistReference {
        PlaylistReference::new("PL123", "Road trip").unwrap()
    }

    #[tokio::test]
    async fn test_two_page_playlist_adds_only_resolved_song() {
        let source = FakeSource::new(vec![
            (None, page(&[("Daft Punk - Get Lucky", "v1")], Some("p2"))),
            (Some("p2"), page(&[("Holiday vlog", "v2")], None)),
        ]);
        let extractor = FakeExtractor::new(&[
            ("v1", Some("Get Lucky"), Some("Daft Punk")),
            ("v2", None, None),
        ]);
        let catalog = FakeCatalog::with_results(vec![("Get Lucky", vec!["spotify:track:lucky"])]);

        let importer = PlaylistImporter::new(source, extractor, catalog, options());
        let report = importer.run(&reference()).await.unwrap();

        assert_eq!(report.total_items, 2);
        assert_eq!(report.unresolved_items, 1);
        assert_eq!(report.matched.len(), 1);
        assert_eq!(report.target_playlist_id.as_deref(), Some("new_playlist"));
        assert_eq!(report.tracks_added, 1);
        assert_eq!(*importer.catalog.created.lock().unwrap(), vec!["Road trip"]);
        assert_eq!(
            *importer.catalog.added.lock().unwrap(),
            vec![(
                "new_playlist".to_string(),
                vec!["spotify:track:lucky".to_string()]
            )]
        );
    }

    #[tokio::test]
    async fn test_pagination_stops_without_cursor() {
        let source = FakeSource::new(vec![
            (None, page(&[("a", "v1"), ("b", "v2")], Some("p2"))),
            (Some("p2"), page(&[("c", "v3")], Some("p3"))),
            (Some("p3"), page(&[("d", "v4")], None)),
        ]);
        let importer = PlaylistImporter::new(
            source,
            FakeExtractor::new(&[]),
            FakeCatalog::default(),
            options(),
        );

        let pages = importer.fetch_playlist_items("PL123").await.unwrap();

        assert_eq!(pages.len(), 3);
        assert_eq!(pages[0][1].video_id, "v2");
        assert_eq!(pages[2][0].video_id, "v4");
        assert_eq!(
            *importer.source.requested.lock().unwrap(),
            vec![None, Some("p2".to_string()), Some("p3".to_string())]
        );
    }

    #[tokio::test]
    async fn test_empty_cursor_ends_pagination() {
        let source = FakeSource::new(vec![(None, page(&[("a", "v1")], Some("")))]);
        let importer = PlaylistImporter::new(
            source,
            FakeExtractor::new(&[]),
            FakeCatalog::default(),
            options(),
        );

        let pages = importer.fetch_playlist_items("PL123").await.unwrap();
        assert_eq!(pages.len(), 1);
    }

    #[tokio::test]
    async fn test_pagination_error_aborts_run() {
        let source = FakeSource::new(vec![(None, page(&[("a", "v1")], Some("broken")))]);
        let importer = PlaylistImporter::new(
            source,
            FakeExtractor::new(&[("v1", Some("a"), Some("b"))]),
            FakeCatalog::default(),
            options(),
        );

        let err = importer.run(&reference()).await.unwrap_err();
        assert_eq!(err.status(), Some(400));
        assert!(importer.catalog.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_first_search_result_wins_and_order_is_kept() {
        let source = FakeSource::new(vec![
            (None, page(&[("x", "v1"), ("x", "v2")], Some("p2"))),
            (Some("p2"), page(&[("x", "v3")], None)),
        ]);
        let extractor = FakeExtractor::new(&[
            ("v1", Some("One"), Some("A")),
            ("v2", Some("Two"), Some("B")),
            ("v3", Some("Three"), Some("C")),
        ]);
        let catalog = FakeCatalog::with_results(vec![
            ("One", vec!["spotify:track:1", "spotify:track:1b"]),
            ("Two", vec![]),
            ("Three", vec!["spotify:track:3"]),
        ]);

        let importer = PlaylistImporter::new(source, extractor, catalog, options());
        let report = importer.run(&reference()).await.unwrap();

        // Identical video titles are kept apart by their position.
        assert_eq!(report.matched.len(), 2);
        assert_eq!(report.not_found.len(), 1);
        assert_eq!(report.not_found[0].track_name, "Two");
        assert_eq!(
            importer.catalog.added.lock().unwrap()[0].1,
            vec!["spotify:track:1".to_string(), "spotify:track:3".to_string()]
        );
    }

    #[tokio::test]
    async fn test_metadata_failure_is_skipped_by_default() {
        let items = page(&[("Deleted video", "gone"), ("ok", "v1")], None);
        let source = FakeSource::new(vec![(None, items)]);
        let extractor = FakeExtractor::new(&[("v1", Some("One"), Some("A"))]);
        let catalog = FakeCatalog::with_results(vec![("One", vec!["spotify:track:1"])]);

        let importer = PlaylistImporter::new(source, extractor, catalog, options());
        let report = importer.run(&reference()).await.unwrap();

        assert_eq!(report.failed_items.len(), 1);
        assert_eq!(report.failed_items[0].stage, Stage::Metadata);
        assert_eq!(report.failed_items[0].key, ItemKey::new(0, 0));
        assert_eq!(report.tracks_added, 1);
    }

    #[tokio::test]
    async fn test_metadata_failure_aborts_when_configured() {
        let source = FakeSource::new(vec![(None, page(&[("Deleted video", "gone")], None))]);
        let importer = PlaylistImporter::new(
            source,
            FakeExtractor::new(&[]),
            FakeCatalog::default(),
            ImportOptions {
                on_metadata_error: FailurePolicy::Abort,
                ..options()
            },
        );

        let err = importer.run(&reference()).await.unwrap_err();
        assert!(matches!(err, AppError::Metadata { .. }));
        assert!(importer.catalog.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_failure_policies() {
        let make = |policy| {
            let source = FakeSource::new(vec![(None, page(&[("a", "v1")], None))]);
            let extractor = FakeExtractor::new(&[("v1", Some("One"), Some("A"))]);
            let catalog = FakeCatalog {
                search_status: Some(502),
                ..Default::default()
            };
            PlaylistImporter::new(
                source,
                extractor,
                catalog,
                ImportOptions {
                    on_search_error: policy,
                    ..options()
                },
            )
        };

        let skipping = make(FailurePolicy::Skip);
        let report = skipping.run(&reference()).await.unwrap();
        assert_eq!(report.failed_items.len(), 1);
        assert_eq!(report.failed_items[0].stage, Stage::Search);
        assert!(skipping.catalog.added.lock().unwrap()[0].1.is_empty());

        let aborting = make(FailurePolicy::Abort);
        let err = aborting.run(&reference()).await.unwrap_err();
        assert_eq!(err.status(), Some(502));
        assert!(aborting.catalog.created.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_expired_token_aborts_even_when_skipping() {
        let source = FakeSource::new(vec![(None, page(&[("a", "v1")], None))]);
        let extractor = FakeExtractor::new(&[("v1", Some("One"), Some("A"))]);
        let catalog = FakeCatalog {
            search_status: Some(401),
            ..Default::default()
        };

        let importer = PlaylistImporter::new(source, extractor, catalog, options());
        let err = importer.run(&reference()).await.unwrap_err();
        assert_eq!(err.status(), Some(401));
    }

    #[tokio::test]
    async fn test_item_keys_follow_page_and_position() {
        let source = FakeSource::new(vec![
            (None, page(&[("a", "v1"), ("b", "v2")], Some("p2"))),
            (Some("p2"), page(&[("c", "v3")], None)),
        ]);
        let extractor = FakeExtractor::new(&[
            ("v1", Some("One"), Some("A")),
            ("v2", Some("Two"), Some("B")),
            ("v3", Some("Three"), Some("C")),
        ]);
        let catalog = FakeCatalog::with_results(vec![("One", vec!["spotify:track:1"])]);

        let importer = PlaylistImporter::new(source, extractor, catalog, options());
        let report = importer.run(&reference()).await.unwrap();

        assert_eq!(report.matched[0].key, ItemKey::new(0, 0));
        let unmatched: Vec<ItemKey> = report.not_found.iter().map(|s| s.key).collect();
        assert_eq!(unmatched, vec![ItemKey::new(0, 1), ItemKey::new(1, 0)]);
    }

    #[tokio::test]
    async fn test_unrunnable_extractor_aborts_before_any_write() {
        let source = FakeSource::new(vec![(None, page(&[("a", "v1"), ("b", "v2")], None))]);
        let importer = PlaylistImporter::new(
            source,
            YtDlpExtractor::new("/nonexistent/yt-dlp"),
            FakeCatalog::default(),
            options(),
        );

        let err = importer.run(&reference()).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(importer.catalog.created.lock().unwrap().is_empty());
        assert!(importer.catalog.added.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_add_failure_carries_status() {
        let source = FakeSource::new(vec![(None, page(&[("a", "v1")], None))]);
        let extractor = FakeExtractor::new(&[("v1", Some("One"), Some("A"))]);
        let catalog = FakeCatalog {
            add_status: Some(403),
            ..FakeCatalog::with_results(vec![("One", vec!["spotify:track:1"])])
        };

        let importer = PlaylistImporter::new(source, extractor, catalog, options());
        let err = importer.run(&reference()).await.unwrap_err();
        assert!(matches!(err, AppError::BulkInsert { status: 403 }));
    }

    #[tokio::test]
    async fn test_dry_run_makes_no_writes() {
        let source = FakeSource::new(vec![(None, page(&[("a", "v1")], None))]);
        let extractor = FakeExtractor::new(&[("v1", Some("One"), Some("A"))]);
        let catalog = FakeCatalog::with_results(vec![("One", vec!["spotify:track:1"])]);

        let importer = PlaylistImporter::new(
            source,
            extractor,
            catalog,
            ImportOptions {
                dry_run: true,
                ..options()
            },
        );
        let report = importer.run(&reference()).await.unwrap();

        assert_eq!(report.matched.len(), 1);
        assert!(report.target_playlist_id.is_none());
        assert!(importer.catalog.created.lock().unwrap().is_empty());
        assert!(importer.catalog.added.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sequential_and_concurrent_runs_agree() {
        let items: Vec<(String, String)> = (0..12)
            .map(|i| (format!("video {i}"), format!("v{i}")))
            .collect();
        let item_refs: Vec<(&str, &str)> = items
            .iter()
            .map(|(t, v)| (t.as_str(), v.as_str()))
            .collect();
        let tracks: Vec<String> = (0..12).map(|i| format!("track {i}")).collect();
        let uris: Vec<String> = (0..12).map(|i| format!("spotify:track:{i}")).collect();

        let mut added = Vec::new();
        for concurrency in [1, 5] {
            let source = FakeSource::new(vec![(None, page(&item_refs, None))]);
            let extractor = FakeExtractor {
                songs: (0..12)
                    .map(|i| {
                        (
                            format!("https://www.youtube.com/watch?v=v{i}"),
                            VideoMetadata {
                                track: Some(tracks[i].clone()),
                                artist: Some("Artist".to_string()),
                            },
                        )
                    })
                    .collect(),
            };
            let catalog = FakeCatalog {
                results: (0..12)
                    .map(|i| (tracks[i].clone(), vec![uris[i].clone()]))
                    .collect(),
                ..Default::default()
            };

            let importer = PlaylistImporter::new(
                source,
                extractor,
                catalog,
                ImportOptions {
                    concurrency,
                    ..options()
                },
            );
            importer.run(&reference()).await.unwrap();
            added.push(importer.catalog.added.lock().unwrap()[0].1.clone());
        }

        assert_eq!(added[0], uris);
        assert_eq!(added[0], added[1]);
    }
}
