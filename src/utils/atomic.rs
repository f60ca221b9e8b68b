//! Atomic file writes.
//!
//! Content is written to a sibling temp file, synced, then renamed over the
//! destination, so readers observe either the previous file or the complete
//! new one. Used for the registry document and the config file.

use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Write `content` to `path` atomically, creating parent directories.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
    }

    let temp_path = temp_sibling(path);

    {
        let mut file = fs::File::create(&temp_path)
            .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

        file.write_all(content)
            .with_context(|| format!("Failed to write to temp file: {}", temp_path.display()))?;

        file.sync_all().context("Failed to sync file to disk")?;
    }

    if let Err(e) = fs::rename(&temp_path, path) {
        let _ = fs::remove_file(&temp_path);
        return Err(e).with_context(|| format!("Failed to rename temp file to: {}", path.display()));
    }

    Ok(())
}

/// Async wrapper running [`atomic_write`] on the blocking pool.
pub async fn atomic_write_async(path: PathBuf, content: Vec<u8>) -> Result<()> {
    tokio::task::spawn_blocking(move || atomic_write(&path, &content))
        .await
        .context("Atomic write task panicked")?
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();
    path.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_atomic_write_overwrites() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("registry.json");

        atomic_write(&file, b"initial").unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "initial");

        atomic_write(&file, b"updated").unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "updated");
    }

    #[test]
    fn test_atomic_write_creates_parent_and_leaves_no_temp() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("deep").join("nested").join("config.toml");

        atomic_write(&file, b"token = \"x\"").unwrap();
        assert!(file.exists());

        let leftovers: Vec<_> = std::fs::read_dir(file.parent().unwrap())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[tokio::test]
    async fn test_atomic_write_async() {
        let temp = tempdir().unwrap();
        let file = temp.path().join("async.json");
        atomic_write_async(file.clone(), b"{}".to_vec()).await.unwrap();
        assert_eq!(std::fs::read_to_string(&file).unwrap(), "{}");
    }
}
