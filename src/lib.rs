pub mod config;
pub mod error;
pub mod importer;
pub mod metadata;
pub mod spotify;
pub mod youtube;

pub use config::{Config, FailurePolicy, ImportOptions};
pub use error::{AppError, Result};
pub use importer::{ImportReport, PlaylistImporter, PlaylistReference, SongInfo};
pub use metadata::{MetadataExtractor, VideoMetadata, YtDlpExtractor};
pub use spotify::SpotifyClient;
pub use youtube::{PlaylistItem, YouTubeClient};
