use std::path::{Path, PathBuf};

use crate::config::{SongFormat, SyncConfig};
use crate::model::Song;

/// Canonical output locations for one song.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    /// Where the exported file lives on disk, under the output root.
    pub storage_path: PathBuf,
    /// The line written for this song into the playlist file.
    pub playlist_entry: String,
}

/// Resolves both the on-disk path and the playlist entry for a song.
///
/// The extension follows the configured export format, except for `raw`
/// which keeps the origin extension. Flat naming collapses everything to
/// `{id}.{ext}` directly under the output root. Pure function: same song
/// and config always yield the same paths.
pub fn resolve_song_paths(song: &Song, config: &SyncConfig) -> ResolvedPaths {
    let extension = match config.format {
        SongFormat::Raw => Path::new(&song.path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or(&song.suffix)
            .to_string(),
        transcoded => transcoded.as_str().to_string(),
    };

    if config.flat_naming {
        let name = if extension.is_empty() {
            song.id.clone()
        } else {
            format!("{}.{}", song.id, extension)
        };
        return ResolvedPaths {
            storage_path: config.output_root.join(&name),
            playlist_entry: name,
        };
    }

    let relative = replace_extension(&song.path, &extension);
    let playlist_entry = if config.absolute_paths {
        relative.clone()
    } else {
        format!("./{relative}")
    };

    ResolvedPaths {
        storage_path: config.output_root.join(&relative),
        playlist_entry,
    }
}

fn replace_extension(source: &str, extension: &str) -> String {
    let path = Path::new(source);
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(source);
    let file_name = if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{stem}.{extension}")
    };

    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            format!("{}/{}", dir.to_string_lossy(), file_name)
        }
        _ => file_name,
    }
}
