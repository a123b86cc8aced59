use serde::{Deserialize, Serialize};

use crate::config::SongFormat;

/// Playlist metadata as returned by `getPlaylists`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Playlist {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub song_count: u32,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub changed: String,
}

/// One track entry of a remote playlist. Identity is `id`; `path` is the
/// server-side source path and may change between runs for the same id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: String,
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    /// File extension of the origin file on the server.
    #[serde(default)]
    pub suffix: String,
}

/// A remote playlist and its ordered tracks, fetched fresh each run.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistSnapshot {
    pub playlist: Playlist,
    pub songs: Vec<Song>,
}

/// Durable record of what a previous run materialized on disk for one
/// playlist, keyed by playlist id in the persist store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedPlaylist {
    pub format: SongFormat,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u32>,
    pub songs: Vec<PersistedSong>,
}

/// A track as last written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedSong {
    pub id: String,
    pub path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persisted_playlist_round_trips() {
        let record = PersistedPlaylist {
            format: SongFormat::Opus,
            bitrate: Some(128),
            songs: vec![PersistedSong {
                id: "300".into(),
                path: "/out/Artist/Album/01 Song.opus".into(),
            }],
        };

        let json = serde_json::to_string(&record).unwrap();
        let parsed: PersistedPlaylist = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, record);
    }

    #[test]
    fn test_persisted_playlist_omits_unset_bitrate() {
        let record = PersistedPlaylist {
            format: SongFormat::Raw,
            bitrate: None,
            songs: vec![],
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("bitrate"));

        // Records written before a bitrate was ever configured still parse.
        let parsed: PersistedPlaylist =
            serde_json::from_str(r#"{"format":"raw","songs":[]}"#).unwrap();
        assert_eq!(parsed.bitrate, None);
    }
}
