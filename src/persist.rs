use std::io;
use std::path::PathBuf;

use color_eyre::eyre::{Result, WrapErr};

use crate::model::PersistedPlaylist;
use crate::ports::persist::PersistStore;

/// File-backed persist store: one JSON document per playlist id inside the
/// persist directory.
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

#[async_trait::async_trait]
impl PersistStore for JsonStore {
    async fn get(&self, key: &str) -> Result<Option<PersistedPlaylist>> {
        let path = self.record_path(key);
        match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map(Some)
                .wrap_err_with(|| format!("Failed to parse persist record {}", path.display())),
            Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(error) => Err(error)
                .wrap_err_with(|| format!("Failed to read persist record {}", path.display())),
        }
    }

    async fn upsert_on_diff(
        &self,
        key: &str,
        value: &PersistedPlaylist,
    ) -> Result<Option<PersistedPlaylist>> {
        let previous = self.get(key).await?;

        if previous.as_ref() == Some(value) {
            return Ok(previous);
        }

        tokio::fs::create_dir_all(&self.dir)
            .await
            .wrap_err_with(|| format!("Failed to create persist directory {}", self.dir.display()))?;

        let path = self.record_path(key);
        let json = serde_json::to_vec_pretty(value).wrap_err("Failed to serialize persist record")?;
        tokio::fs::write(&path, json)
            .await
            .wrap_err_with(|| format!("Failed to write persist record {}", path.display()))?;

        Ok(previous)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SongFormat;
    use crate::model::PersistedSong;

    fn record(bitrate: Option<u32>, ids: &[&str]) -> PersistedPlaylist {
        PersistedPlaylist {
            format: SongFormat::Mp3,
            bitrate,
            songs: ids
                .iter()
                .map(|id| PersistedSong {
                    id: (*id).into(),
                    path: format!("/out/{id}.mp3"),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_get_absent_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().to_path_buf());

        assert_eq!(store.get("pl1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_upsert_creates_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().to_path_buf());
        let value = record(Some(192), &["1", "2"]);

        let previous = store.upsert_on_diff("pl1", &value).await.unwrap();
        assert_eq!(previous, None);
        assert_eq!(store.get("pl1").await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn test_upsert_returns_previous_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().to_path_buf());
        let first = record(None, &["1"]);
        let second = record(None, &["1", "2"]);

        store.upsert_on_diff("pl1", &first).await.unwrap();
        let previous = store.upsert_on_diff("pl1", &second).await.unwrap();

        assert_eq!(previous, Some(first));
        assert_eq!(store.get("pl1").await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_upsert_skips_write_when_equal() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::new(dir.path().to_path_buf());
        let value = record(Some(128), &["1"]);

        store.upsert_on_diff("pl1", &value).await.unwrap();
        let before = tokio::fs::metadata(dir.path().join("pl1.json"))
            .await
            .unwrap()
            .modified()
            .unwrap();

        let previous = store.upsert_on_diff("pl1", &value).await.unwrap();
        assert_eq!(previous, Some(value));

        let after = tokio::fs::metadata(dir.path().join("pl1.json"))
            .await
            .unwrap()
            .modified()
            .unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_get_corrupt_record_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        tokio::fs::write(dir.path().join("pl1.json"), b"not json")
            .await
            .unwrap();
        let store = JsonStore::new(dir.path().to_path_buf());

        assert!(store.get("pl1").await.is_err());
    }
}
