use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Target format for exported song files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SongFormat {
    /// The origin file as stored on the server, no transcode.
    Raw,
    Mp3,
    Opus,
}

impl SongFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            SongFormat::Raw => "raw",
            SongFormat::Mp3 => "mp3",
            SongFormat::Opus => "opus",
        }
    }
}

impl fmt::Display for SongFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flavor of the emitted playlist file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PlaylistFormat {
    M3u,
    M3u8,
}

impl PlaylistFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            PlaylistFormat::M3u => "m3u",
            PlaylistFormat::M3u8 => "m3u8",
        }
    }
}

impl fmt::Display for PlaylistFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Immutable per-run sync settings, built once from CLI arguments and passed
/// into every component.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Server address, used only for the playlist file header.
    pub host: String,
    /// Username on the server, used only for the playlist file header.
    pub user: String,
    pub format: SongFormat,
    /// Maximum bitrate for transcoded files. 0 means no limit.
    pub max_bitrate: u32,
    /// Write playlist entries without the leading `./` marker.
    pub absolute_paths: bool,
    pub playlist_format: PlaylistFormat,
    /// Root directory that all exported files land under.
    pub output_root: PathBuf,
    /// Name exported files `{song id}.{ext}` directly under the output root,
    /// for devices that address tracks by id instead of folder structure.
    pub flat_naming: bool,
    /// Write playlist files only, skipping purge/export/persist.
    pub playlist_only: bool,
    /// How many tracks to export at once within one playlist.
    pub concurrency: usize,
}

impl SyncConfig {
    /// The configured bitrate cap, with 0 normalized to "no limit".
    pub fn bitrate_limit(&self) -> Option<u32> {
        (self.max_bitrate > 0).then_some(self.max_bitrate)
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            user: String::new(),
            format: SongFormat::Mp3,
            max_bitrate: 0,
            absolute_paths: false,
            playlist_format: PlaylistFormat::M3u8,
            output_root: PathBuf::from("./exported-playlists"),
            flat_naming: false,
            playlist_only: false,
            concurrency: 4,
        }
    }
}
