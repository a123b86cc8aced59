mod config;
mod logging;
mod model;
mod persist;
mod ports;
mod subsonic;
mod sync;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{eyre, Result};

use crate::config::{PlaylistFormat, SongFormat, SyncConfig};
use crate::persist::JsonStore;
use crate::ports::server::MediaServer;
use crate::subsonic::SubsonicClient;
use crate::sync::runner::TaskRunner;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address of the Subsonic server to export playlists from
    #[arg(long, env = "SUBSONIC_HOST")]
    host: String,

    /// Username for the target host
    #[arg(long, env = "SUBSONIC_USER")]
    user: String,

    /// Password for the target host
    #[arg(long, env = "SUBSONIC_PASSWORD")]
    password: String,

    /// Playlist IDs to sync (repeatable)
    #[arg(short = 'p', long = "playlist-id")]
    playlist_ids: Vec<String>,

    /// Directory to export playlist and song files to
    #[arg(short, long, default_value = "./exported-playlists")]
    output_path: PathBuf,

    /// Directory holding the per-playlist sync records
    #[arg(long, default_value = "./persist")]
    persist_dir: PathBuf,

    /// Format for exported song files; 'raw' exports the origin file untouched
    #[arg(long, value_enum, default_value_t = SongFormat::Mp3)]
    format: SongFormat,

    /// Maximum bitrate for transcoded song files; 0 means no limit
    #[arg(long, default_value_t = 0)]
    max_bitrate: u32,

    /// Playlist file flavor to write
    #[arg(long, value_enum, default_value_t = PlaylistFormat::M3u8)]
    playlist_format: PlaylistFormat,

    /// Write playlist entries without the leading ./
    #[arg(long)]
    absolute_paths: bool,

    /// Name exported files {song id}.{extension} directly under the output
    /// root, for devices that address tracks by id
    #[arg(long)]
    flat_naming: bool,

    /// Export playlist files only, no music tracks
    #[arg(long)]
    playlist_only: bool,

    /// Number of tracks to export at once within one playlist
    #[arg(long, default_value_t = 4)]
    concurrency: usize,

    /// List available playlists and their IDs instead of syncing
    #[arg(short, long)]
    list: bool,

    /// Console log level
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let args = Args::parse();
    logging::init_tracing(&args.log_level)?;

    let client = SubsonicClient::new(args.host.clone(), args.user.clone(), args.password.clone());

    if args.list {
        return list_playlists(&client).await;
    }

    if args.playlist_ids.is_empty() {
        return Err(eyre!(
            "No playlist IDs given. Use --playlist-id, or --list to discover IDs."
        ));
    }

    let config = Arc::new(SyncConfig {
        host: args.host,
        user: args.user,
        format: args.format,
        max_bitrate: args.max_bitrate,
        absolute_paths: args.absolute_paths,
        playlist_format: args.playlist_format,
        output_root: args.output_path,
        flat_naming: args.flat_naming,
        playlist_only: args.playlist_only,
        concurrency: args.concurrency,
    });

    let server = Arc::new(client);
    let store = Arc::new(JsonStore::new(args.persist_dir));

    let available = server.get_playlists().await?;
    let mut runner = TaskRunner::new(server.clone(), store, config);

    for id in &args.playlist_ids {
        if !available.iter().any(|playlist| &playlist.id == id) {
            tracing::warn!(%id, "Requested playlist not found on server, skipping");
            continue;
        }
        match server.get_playlist(id).await {
            Ok(snapshot) => {
                runner.add_task(snapshot);
            }
            Err(error) => {
                tracing::error!(%id, "Failed to fetch playlist, skipping: {error:?}");
            }
        }
    }

    for line in runner.start().await {
        println!("{line}");
    }

    Ok(())
}

async fn list_playlists(client: &SubsonicClient) -> Result<()> {
    let playlists = client.get_playlists().await?;

    println!("{:<12} {:<40} {:>6}", "ID", "Name", "Songs");
    for playlist in playlists {
        println!(
            "{:<12} {:<40} {:>6}",
            playlist.id, playlist.name, playlist.song_count
        );
    }

    Ok(())
}
