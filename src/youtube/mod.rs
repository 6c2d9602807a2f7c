pub mod auth;
pub mod client;
pub mod models;

pub use client::YouTubeClient;
pub use models::{PlaylistItem, PlaylistItemsPage};
