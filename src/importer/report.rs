use chrono::{DateTime, Local};
use colored::Colorize;
use std::fmt;

use crate::importer::models::{ItemKey, PlaylistReference, SongInfo};

/// Pipeline step an item failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Metadata,
    Search,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Metadata => write!(f, "metadata"),
            Stage::Search => write!(f, "search"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct FailedItem {
    pub key: ItemKey,
    pub video_title: String,
    pub stage: Stage,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ImportReport {
    pub source_playlist_id: String,
    pub target_title: String,
    pub total_items: usize,
    pub unresolved_items: usize,
    pub matched: Vec<SongInfo>,
    pub not_found: Vec<SongInfo>,
    pub failed_items: Vec<FailedItem>,
    pub target_playlist_id: Option<String>,
    pub tracks_added: usize,
    pub dry_run: bool,
    pub started_at: DateTime<Local>,
    pub finished_at: Option<DateTime<Local>>,
}

impl ImportReport {
    pub fn new(reference: &PlaylistReference, dry_run: bool) -> Self {
        Self {
            source_playlist_id: reference.source_playlist_id().to_string(),
            target_title: reference.target_title().to_string(),
            total_items: 0,
            unresolved_items: 0,
            matched: Vec::new(),
            not_found: Vec::new(),
            failed_items: Vec::new(),
            target_playlist_id: None,
            tracks_added: 0,
            dry_run,
            started_at: Local::now(),
            finished_at: None,
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Local::now());
    }

    pub fn match_rate(&self) -> f64 {
        if self.total_items > 0 {
            (self.matched.len() as f64 / self.total_items as f64) * 100.0
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        println!();
        println!("{}", "=".repeat(60));
        println!("{}", "IMPORT SUMMARY".bold());
        println!("{}", "=".repeat(60));
        println!("Source playlist: {}", self.source_playlist_id);
        println!("Videos processed: {}", self.total_items);
        println!(
            "Matched on Spotify: {}",
            self.matched.len().to_string().green()
        );
        println!(
            "No song metadata: {}",
            self.unresolved_items.to_string().yellow()
        );
        println!(
            "Not found on Spotify: {}",
            self.not_found.len().to_string().red()
        );
        if !self.failed_items.is_empty() {
            println!("Failed lookups: {}", self.failed_items.len().to_string().red());
        }
        println!("Match rate: {:.1}%", self.match_rate());

        if let Some(finished_at) = self.finished_at {
            let elapsed = finished_at - self.started_at;
            println!("Elapsed: {}s", elapsed.num_seconds());
        }

        match &self.target_playlist_id {
            Some(id) => println!(
                "Created '{}' ({}) with {} tracks",
                self.target_title.green(),
                id,
                self.tracks_added
            ),
            None if self.dry_run => println!(
                "{}",
                format!(
                    "Dry run: '{}' would get {} tracks",
                    self.target_title,
                    self.matched.len()
                )
                .yellow()
            ),
            None => {}
        }
        println!("{}", "=".repeat(60));

        if !self.not_found.is_empty() {
            println!("\nNot found on Spotify:");
            for song in &self.not_found {
                println!("  {} - {}", song.artist_name, song.track_name);
            }
        }

        if !self.failed_items.is_empty() {
            println!("\nFailed lookups:");
            for failed in &self.failed_items {
                println!(
                    "  [{}] {} ({}): {}",
                    failed.key, failed.video_title, failed.stage, failed.reason
                );
            }
        }
    }
}
