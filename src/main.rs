use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::{self, Write};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use youtube2spotify::{
    Config, FailurePolicy, ImportOptions, PlaylistImporter, PlaylistReference, YouTubeClient,
};

#[derive(Parser)]
#[command(name = "youtube2spotify")]
#[command(about = "Copy a YouTube playlist into a new Spotify playlist")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import a YouTube playlist into a new Spotify playlist
    Import {
        /// YouTube playlist ID or URL (prompted for when omitted)
        playlist: Option<String>,

        /// Title of the new Spotify playlist (prompted for when omitted)
        title: Option<String>,

        /// Resolve and search every video without creating the playlist
        #[arg(long)]
        dry_run: bool,

        /// Number of videos resolved at the same time
        #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u16).range(1..=32))]
        concurrency: u16,

        /// What to do when yt-dlp fails for a video
        #[arg(long, value_enum, default_value_t = FailurePolicy::Skip)]
        on_metadata_error: FailurePolicy,

        /// What to do when a Spotify search request fails
        #[arg(long, value_enum, default_value_t = FailurePolicy::Skip)]
        on_search_error: FailurePolicy,
    },

    /// Show setup guide
    Setup,
}

fn setup_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_tracing(cli.verbose);

    match cli.command {
        Commands::Import {
            playlist,
            title,
            dry_run,
            concurrency,
            on_metadata_error,
            on_search_error,
        } => {
            let options = ImportOptions {
                dry_run,
                concurrency: usize::from(concurrency),
                on_metadata_error,
                on_search_error,
                show_progress: true,
            };
            import(playlist, title, options).await?;
        }
        Commands::Setup => {
            show_setup_guide();
        }
    }

    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

async fn import(
    playlist: Option<String>,
    title: Option<String>,
    options: ImportOptions,
) -> Result<()> {
    println!("{}", "YouTube to Spotify Playlist Importer".cyan().bold());
    println!("{}", "=".repeat(50));

    if options.dry_run {
        println!(
            "{}",
            "DRY RUN MODE - No playlist will be created".yellow()
        );
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            println!("{} {}", "Missing configuration:".red(), e);
            println!(
                "\n{}",
                "Run `youtube2spotify setup` for the list of required settings.".yellow()
            );
            std::process::exit(1);
        }
    };

    let playlist = match playlist {
        Some(playlist) => playlist,
        None => prompt("Enter YouTube playlist ID: ")?,
    };
    let title = match title {
        Some(title) => title,
        None => prompt("Enter Spotify playlist title: ")?,
    };

    let playlist_id = YouTubeClient::parse_playlist_id(&playlist)
        .context("Failed to read the YouTube playlist")?;
    let reference = PlaylistReference::new(playlist_id, title)?;

    let importer = PlaylistImporter::connect(&config, options)
        .await
        .context("Failed to authenticate with YouTube")?;

    let report = importer
        .run(&reference)
        .await
        .context("Playlist import failed")?;

    report.print_summary();

    if report.dry_run {
        println!("\n{}", "Dry run completed - no changes made".yellow());
    } else {
        println!("\n{}", "Done with adding songs to playlist!".green());
    }

    Ok(())
}

fn show_setup_guide() {
    println!("{}", "YouTube to Spotify Importer Setup Guide".cyan().bold());
    println!("{}", "=".repeat(50));

    println!("\n{}", "1. YouTube Data API Setup".yellow());
    println!("   - Go to https://console.cloud.google.com/");
    println!("   - Enable the YouTube Data API v3");
    println!("   - Create an OAuth client ID of type 'Desktop app'");
    println!("   - Download it as client_secret.json");

    println!("\n{}", "2. Spotify Setup".yellow());
    println!("   - Get an access token with the playlist-modify-public scope");
    println!("   - Look up your Spotify user ID on your account page");

    println!("\n{}", "3. yt-dlp".yellow());
    println!("   - Install yt-dlp and make sure it is on your PATH");

    println!("\n{}", "4. Configuration".yellow());
    println!("   - Create a .env file with:");
    println!("     SPOTIFY_TOKEN=your_spotify_access_token");
    println!("     SPOTIFY_USER_ID=your_spotify_user_id");
    println!("     YOUTUBE_CLIENT_SECRET_FILE=client_secret.json");
    println!("     YTDLP_PATH=yt-dlp                 (optional)");

    println!("\n{}", "5. Usage".yellow());
    println!("   - youtube2spotify import                              (interactive)");
    println!("   - youtube2spotify import PLxxxx \"Road trip\" --dry-run  (preview matches)");
    println!("   - youtube2spotify import PLxxxx \"Road trip\"            (create playlist)");

    println!("\n{}", "Ready to start importing!".green());
}
