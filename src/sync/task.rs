use std::collections::HashSet;
use std::io;
use std::path::Path;
use std::sync::Arc;

use color_eyre::eyre::{Result, WrapErr};
use futures::future::join_all;
use tokio::sync::Semaphore;

use crate::config::SyncConfig;
use crate::model::{PersistedPlaylist, PersistedSong, PlaylistSnapshot, Song};
use crate::ports::persist::PersistStore;
use crate::ports::server::{MediaServer, StreamOptions};
use crate::sync::paths::resolve_song_paths;
use crate::sync::prune::prune_empty_dirs;
use crate::sync::reconcile::{reconcile, Reconciled};

/// Outcome counts for one playlist sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    pub exported: usize,
    pub skipped: usize,
    pub removed: usize,
    pub failed: usize,
    pub total: usize,
}

/// One sync task per playlist, spawned by the `TaskRunner`.
///
/// `prepare` reads the persisted record and computes the work plan; a
/// failure there aborts only this playlist. `run` then drives the export
/// chain:
/// 1. Purge tracks that dropped out of the remote playlist
/// 2. Export new tracks, with bounded concurrency
/// 3. Write the playlist file
/// 4. Update the persisted record
///
/// A single track's export failure is recorded and excluded from the
/// playlist file and persisted record; it never aborts sibling tracks.
pub struct SyncTask<S, P> {
    snapshot: PlaylistSnapshot,
    server: Arc<S>,
    store: Arc<P>,
    config: Arc<SyncConfig>,
    reconciled: Reconciled,
    failed: HashSet<String>,
}

impl<S: MediaServer, P: PersistStore> SyncTask<S, P> {
    pub async fn prepare(
        snapshot: PlaylistSnapshot,
        server: Arc<S>,
        store: Arc<P>,
        config: Arc<SyncConfig>,
    ) -> Result<Self> {
        let persisted = store.get(&snapshot.playlist.id).await.wrap_err_with(|| {
            format!(
                "Failed to read persisted record for playlist {}",
                snapshot.playlist.id
            )
        })?;
        let reconciled = reconcile(&snapshot.songs, persisted.as_ref(), &config);

        tracing::debug!(
            playlist = %snapshot.playlist.name,
            export = reconciled.to_export.len(),
            skip = reconciled.to_skip.len(),
            remove = reconciled.to_remove.len(),
            "Reconciled playlist against persisted record"
        );

        Ok(Self {
            snapshot,
            server,
            store,
            config,
            reconciled,
            failed: HashSet::new(),
        })
    }

    pub async fn run(mut self) -> Result<SyncReport> {
        if self.config.playlist_only {
            self.write_playlist().await?;
            return Ok(self.report());
        }

        self.purge_removed().await;
        self.export_songs().await;
        self.write_playlist().await?;
        self.update_persist().await?;

        Ok(self.report())
    }

    /// Deletes files for tracks that dropped out of the remote playlist,
    /// then prunes emptied album/artist directories. Delete failures are
    /// logged and do not block the remaining removals.
    async fn purge_removed(&self) {
        for song in &self.reconciled.to_remove {
            let path = Path::new(&song.path);

            match tokio::fs::remove_file(path).await {
                Ok(()) => tracing::debug!(path = %path.display(), "Removed track"),
                Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                Err(error) => {
                    tracing::warn!(
                        path = %path.display(),
                        "Failed to remove track: {error}"
                    );
                    continue;
                }
            }

            if let Err(error) = prune_empty_dirs(path, &self.config.output_root).await {
                tracing::warn!(path = %path.display(), "Directory cleanup failed: {error}");
            }
        }
    }

    /// Fetches and writes every track in the export set, at most
    /// `config.concurrency` at a time. Failed song ids end up in
    /// `self.failed`.
    async fn export_songs(&mut self) {
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));

        let tasks: Vec<_> = self
            .reconciled
            .to_export
            .iter()
            .cloned()
            .map(|song| {
                let server = self.server.clone();
                let config = self.config.clone();
                let semaphore = semaphore.clone();
                async move {
                    let _permit = semaphore.acquire().await.unwrap();
                    match export_one(server.as_ref(), &config, &song).await {
                        Ok(()) => None,
                        Err(error) => {
                            tracing::error!(
                                song = %song.path,
                                id = %song.id,
                                "Failed to export track: {error:?}"
                            );
                            Some(song.id)
                        }
                    }
                }
            })
            .collect();

        for failed_id in join_all(tasks).await.into_iter().flatten() {
            self.failed.insert(failed_id);
        }
    }

    async fn write_playlist(&self) -> Result<()> {
        let filename = format!(
            "{}.{}",
            self.snapshot.playlist.name,
            self.config.playlist_format.extension()
        );
        let path = self.config.output_root.join(filename);

        tokio::fs::create_dir_all(&self.config.output_root)
            .await
            .wrap_err("Failed to create output directory")?;
        tokio::fs::write(&path, self.playlist_contents())
            .await
            .wrap_err_with(|| format!("Playlist file export failed: {}", path.display()))
    }

    /// Extended M3U text: identity/timestamp/options header comments, then
    /// one entry per retained track in snapshot order. Failed tracks are
    /// left out so the playlist only references files that exist.
    fn playlist_contents(&self) -> String {
        let playlist = &self.snapshot.playlist;
        let mut contents = format!(
            "# Playlist Sync: {}@{} - {} [{}]\n",
            self.config.user, self.config.host, playlist.name, playlist.id
        );
        contents.push_str(&format!("# Created: {}\n", nice_date(&playlist.created)));
        contents.push_str(&format!("# Updated: {}\n", nice_date(&playlist.changed)));
        contents.push_str(&format!(
            "# Sync Options: [format={}] [maxBitrate={}]\n",
            self.config.format, self.config.max_bitrate
        ));

        for song in &self.snapshot.songs {
            if self.failed.contains(&song.id) {
                continue;
            }
            contents.push_str(&resolve_song_paths(song, &self.config).playlist_entry);
            contents.push('\n');
        }

        contents
    }

    /// Rewrites the persisted record to exactly what this run materialized.
    /// Failed tracks are excluded so the next run re-attempts them.
    async fn update_persist(&self) -> Result<()> {
        let songs = self
            .snapshot
            .songs
            .iter()
            .filter(|song| !self.failed.contains(&song.id))
            .map(|song| PersistedSong {
                id: song.id.clone(),
                path: resolve_song_paths(song, &self.config)
                    .storage_path
                    .to_string_lossy()
                    .into_owned(),
            })
            .collect();

        let record = PersistedPlaylist {
            format: self.config.format,
            bitrate: self.config.bitrate_limit(),
            songs,
        };

        self.store
            .upsert_on_diff(&self.snapshot.playlist.id, &record)
            .await
            .wrap_err("Persist update failed")?;

        Ok(())
    }

    fn report(&self) -> SyncReport {
        SyncReport {
            exported: self.reconciled.to_export.len() - self.failed.len(),
            skipped: self.reconciled.to_skip.len(),
            removed: self.reconciled.to_remove.len(),
            failed: self.failed.len(),
            total: self.snapshot.songs.len(),
        }
    }
}

async fn export_one<S: MediaServer>(server: &S, config: &SyncConfig, song: &Song) -> Result<()> {
    let paths = resolve_song_paths(song, config);
    let options = StreamOptions {
        max_bit_rate: config.bitrate_limit(),
        format: config.format,
    };

    let streamed = server.stream(&song.id, options).await?;

    if let Some(dir) = paths.storage_path.parent() {
        tokio::fs::create_dir_all(dir)
            .await
            .wrap_err_with(|| format!("Failed to create directory {}", dir.display()))?;
    }
    tokio::fs::write(&paths.storage_path, &streamed.data)
        .await
        .wrap_err_with(|| format!("Failed to write {}", paths.storage_path.display()))?;

    tracing::debug!(path = %paths.storage_path.display(), "Exported track");
    Ok(())
}

/// Renders a server timestamp as `YYYY-MM-DD HH:MM:SS`, falling back to the
/// raw value when it is not RFC 3339.
fn nice_date(value: &str) -> String {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|date| date.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|_| value.to_string())
}
