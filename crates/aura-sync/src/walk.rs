//! Async directory walking.

use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::debug;

use crate::error::SyncError;

/// Collect every regular file below `root`, sorted.
///
/// Directories are descended into; symbolic links and other special files
/// below the root are skipped, never followed.
pub async fn collect_files(root: &Path) -> Result<Vec<PathBuf>, SyncError> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let walk_err = |source| SyncError::Walk {
            path: dir.clone(),
            source,
        };
        let mut entries = fs::read_dir(&dir).await.map_err(walk_err)?;
        while let Some(entry) = entries.next_entry().await.map_err(walk_err)? {
            let path = entry.path();
            let file_type = entry.file_type().await.map_err(walk_err)?;
            if file_type.is_dir() {
                pending.push(path);
            } else if file_type.is_file() {
                files.push(path);
            } else {
                debug!(path = %path.display(), "skipping non-regular entry");
            }
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finds_nested_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("assets/img")).unwrap();
        std::fs::create_dir_all(root.join("empty")).unwrap();
        std::fs::write(root.join("index.html"), "x").unwrap();
        std::fs::write(root.join("assets/app.js"), "x").unwrap();
        std::fs::write(root.join("assets/img/logo.svg"), "x").unwrap();

        let files = collect_files(root).await.unwrap();
        let rel: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
            .collect();
        assert_eq!(rel, vec!["assets/app.js", "assets/img/logo.svg", "index.html"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn skips_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret"), "x").unwrap();
        std::fs::write(dir.path().join("real.txt"), "x").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("linked-dir")).unwrap();
        std::os::unix::fs::symlink(
            outside.path().join("secret"),
            dir.path().join("linked-file"),
        )
        .unwrap();

        let files = collect_files(dir.path()).await.unwrap();
        assert_eq!(files, vec![dir.path().join("real.txt")]);
    }

    #[tokio::test]
    async fn missing_root_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = collect_files(&dir.path().join("nope")).await.unwrap_err();
        assert!(matches!(err, SyncError::Walk { .. }));
    }
}
