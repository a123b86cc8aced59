use std::io;
use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};

/// Removes now-empty directories above a deleted file, walking up one level
/// at a time until hitting `root` or a non-empty directory.
///
/// `path` is the deleted file's former location; pruning starts at its
/// parent. A directory that has already disappeared is treated as pruned by
/// a concurrently running task, not as an error.
pub async fn prune_empty_dirs(path: &Path, root: &Path) -> Result<()> {
    let mut current = path.parent();

    while let Some(dir) = current {
        if dir == root || !dir.starts_with(root) {
            break;
        }

        match dir_is_empty(dir).await {
            Ok(true) => match tokio::fs::remove_dir(dir).await {
                Ok(()) => tracing::debug!(dir = %dir.display(), "Removed empty directory"),
                Err(error) if error.kind() == io::ErrorKind::NotFound => {}
                Err(error) => {
                    return Err(error).wrap_err_with(|| {
                        format!("Failed to remove directory {}", dir.display())
                    });
                }
            },
            Ok(false) => break,
            // Already gone, keep walking up in case the parent emptied out.
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => {
                return Err(error)
                    .wrap_err_with(|| format!("Failed to read directory {}", dir.display()));
            }
        }

        current = dir.parent();
    }

    Ok(())
}

async fn dir_is_empty(dir: &Path) -> io::Result<bool> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    Ok(entries.next_entry().await?.is_none())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_prunes_empty_ancestors_up_to_root() {
        let root = tempfile::tempdir().unwrap();
        let album = root.path().join("Artist/Album");
        tokio::fs::create_dir_all(&album).await.unwrap();

        prune_empty_dirs(&album.join("01 Song.mp3"), root.path())
            .await
            .unwrap();

        assert!(!album.exists());
        assert!(!root.path().join("Artist").exists());
        assert!(root.path().exists());
    }

    #[tokio::test]
    async fn test_stops_at_non_empty_directory() {
        let root = tempfile::tempdir().unwrap();
        let album = root.path().join("Artist/Album");
        tokio::fs::create_dir_all(&album).await.unwrap();
        tokio::fs::write(root.path().join("Artist/other.mp3"), b"x")
            .await
            .unwrap();

        prune_empty_dirs(&album.join("01 Song.mp3"), root.path())
            .await
            .unwrap();

        assert!(!album.exists());
        assert!(root.path().join("Artist").exists());
    }

    #[tokio::test]
    async fn test_never_removes_root_itself() {
        let root = tempfile::tempdir().unwrap();

        prune_empty_dirs(&root.path().join("loose.mp3"), root.path())
            .await
            .unwrap();

        assert!(root.path().exists());
    }

    #[tokio::test]
    async fn test_missing_directory_is_a_no_op() {
        let root = tempfile::tempdir().unwrap();
        let gone = root.path().join("Artist/Album/01 Song.mp3");

        prune_empty_dirs(&gone, root.path()).await.unwrap();
    }

    #[tokio::test]
    async fn test_path_outside_root_is_left_alone() {
        let root = tempfile::tempdir().unwrap();
        let elsewhere = tempfile::tempdir().unwrap();
        let dir = elsewhere.path().join("dir");
        tokio::fs::create_dir_all(&dir).await.unwrap();

        prune_empty_dirs(&dir.join("file.mp3"), root.path())
            .await
            .unwrap();

        assert!(dir.exists());
    }
}
