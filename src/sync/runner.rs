use std::sync::Arc;

use color_eyre::eyre::Result;
use futures::future::join_all;

use crate::config::SyncConfig;
use crate::model::PlaylistSnapshot;
use crate::ports::persist::PersistStore;
use crate::ports::server::MediaServer;
use crate::sync::task::{SyncReport, SyncTask};

/// Fans one `SyncTask` out per playlist and collects a textual report.
///
/// Tasks run concurrently with no ordering between them; one playlist's
/// failure never prevents the others from completing and reporting.
pub struct TaskRunner<S, P> {
    server: Arc<S>,
    store: Arc<P>,
    config: Arc<SyncConfig>,
    snapshots: Vec<PlaylistSnapshot>,
}

impl<S: MediaServer, P: PersistStore> TaskRunner<S, P> {
    pub fn new(server: Arc<S>, store: Arc<P>, config: Arc<SyncConfig>) -> Self {
        Self {
            server,
            store,
            config,
            snapshots: Vec::new(),
        }
    }

    pub fn add_task(&mut self, snapshot: PlaylistSnapshot) -> &mut Self {
        tracing::debug!(playlist = %snapshot.playlist.name, "Queued sync task");
        self.snapshots.push(snapshot);
        self
    }

    /// Runs every queued task and returns one summary line per playlist.
    pub async fn start(self) -> Vec<String> {
        let playlist_only = self.config.playlist_only;

        let tasks: Vec<_> = self
            .snapshots
            .into_iter()
            .map(|snapshot| {
                let server = self.server.clone();
                let store = self.store.clone();
                let config = self.config.clone();
                async move {
                    let name = snapshot.playlist.name.clone();
                    match run_one(snapshot, server, store, config).await {
                        Ok(report) => summarize(&name, &report, playlist_only),
                        Err(error) => {
                            tracing::error!(playlist = %name, "Sync task failed: {error:?}");
                            format!("{name}: sync failed ({error})")
                        }
                    }
                }
            })
            .collect();

        join_all(tasks).await
    }
}

async fn run_one<S: MediaServer, P: PersistStore>(
    snapshot: PlaylistSnapshot,
    server: Arc<S>,
    store: Arc<P>,
    config: Arc<SyncConfig>,
) -> Result<SyncReport> {
    // Reconciliation failures surface here, before any destructive work.
    let task = SyncTask::prepare(snapshot, server, store, config).await?;
    task.run().await
}

fn summarize(name: &str, report: &SyncReport, playlist_only: bool) -> String {
    if playlist_only {
        format!("{name}: playlist file exported ({} tracks)", report.total)
    } else {
        format!(
            "{name}: exported {} of {} tracks ({} skipped, {} removed, {} failed)",
            report.exported, report.total, report.skipped, report.removed, report.failed
        )
    }
}
