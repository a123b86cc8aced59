use std::collections::HashSet;

use crate::config::SyncConfig;
use crate::model::{PersistedPlaylist, PersistedSong, Song};

/// The work plan for one playlist: which remote songs to fetch, which are
/// already on disk, and which persisted songs to delete.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Reconciled {
    pub to_export: Vec<Song>,
    pub to_skip: Vec<Song>,
    pub to_remove: Vec<PersistedSong>,
}

/// Diffs the remote snapshot against the persisted record.
///
/// A changed max bitrate or format invalidates the whole prior export:
/// every persisted song is removed and every remote song re-exported,
/// regardless of id overlap. Otherwise the diff is purely id-based. With no
/// persisted record at all, everything is exported.
///
/// Bitrate comparison treats 0 and unset both as "no limit"; only a change
/// between two differing effective limits invalidates.
pub fn reconcile(
    remote: &[Song],
    persisted: Option<&PersistedPlaylist>,
    config: &SyncConfig,
) -> Reconciled {
    let Some(persisted) = persisted else {
        // First export of this playlist, everything goes out.
        return Reconciled {
            to_export: remote.to_vec(),
            ..Reconciled::default()
        };
    };

    let persisted_limit = persisted.bitrate.filter(|b| *b > 0);
    if persisted_limit != config.bitrate_limit() {
        tracing::info!(
            persisted = ?persisted_limit,
            configured = ?config.bitrate_limit(),
            "Persisted max bitrate does not match configured max bitrate, re-exporting playlist"
        );
        return full_invalidation(remote, persisted);
    }

    if persisted.format != config.format {
        tracing::info!(
            persisted = %persisted.format,
            configured = %config.format,
            "Persisted format does not match configured format, re-exporting playlist"
        );
        return full_invalidation(remote, persisted);
    }

    let persisted_ids: HashSet<&str> = persisted.songs.iter().map(|s| s.id.as_str()).collect();
    let remote_ids: HashSet<&str> = remote.iter().map(|s| s.id.as_str()).collect();

    let (to_skip, to_export): (Vec<Song>, Vec<Song>) = remote
        .iter()
        .cloned()
        .partition(|song| persisted_ids.contains(song.id.as_str()));
    let to_remove = persisted
        .songs
        .iter()
        .filter(|song| !remote_ids.contains(song.id.as_str()))
        .cloned()
        .collect();

    Reconciled {
        to_export,
        to_skip,
        to_remove,
    }
}

fn full_invalidation(remote: &[Song], persisted: &PersistedPlaylist) -> Reconciled {
    Reconciled {
        to_export: remote.to_vec(),
        to_skip: Vec::new(),
        to_remove: persisted.songs.clone(),
    }
}
