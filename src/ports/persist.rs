use color_eyre::eyre::Result;

use crate::model::PersistedPlaylist;

/// Port trait over the durable per-playlist sync records.
///
/// Keys are playlist ids, so concurrent tasks never contend on one key.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait PersistStore: Send + Sync {
    /// Returns the stored record, or `None` if this playlist was never
    /// successfully synced.
    async fn get(&self, key: &str) -> Result<Option<PersistedPlaylist>>;

    /// Writes `value` only when it differs from what is stored, creating the
    /// record if absent. Returns the previous value if one existed.
    async fn upsert_on_diff(
        &self,
        key: &str,
        value: &PersistedPlaylist,
    ) -> Result<Option<PersistedPlaylist>>;
}
