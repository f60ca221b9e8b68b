//! Filesystem capability used by the installer and backup manager.
//!
//! [`NativeFs`] is the primary implementation (rename, walkdir-based copy).
//! [`FileByFileFs`] copies with plain `read_dir` recursion and streamed file
//! copies. [`FallbackFs`] retries any failed operation of its primary through
//! its secondary, which is how the installer's last-resort copy works.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Directory operations needed to swap an artifact into place.
pub trait Filesystem: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Recursively copy the directory `from` to `to`, creating `to`.
    fn copy_dir(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Remove a directory tree. Removing a missing path succeeds.
    fn remove_dir_all(&self, path: &Path) -> io::Result<()>;

    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    /// Entries directly inside `path`, sorted by name.
    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

fn remove_tree(path: &Path) -> io::Result<()> {
    match fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

fn sorted_entries(path: &Path) -> io::Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(path)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<io::Result<Vec<_>>>()?;
    entries.sort();
    Ok(entries)
}

/// `std::fs` with a walkdir-driven recursive copy.
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeFs;

impl Filesystem for NativeFs {
    fn name(&self) -> &'static str {
        "native"
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn copy_dir(&self, from: &Path, to: &Path) -> io::Result<()> {
        for entry in WalkDir::new(from).follow_links(false) {
            let entry = entry.map_err(io::Error::other)?;
            let relative = entry.path().strip_prefix(from).map_err(io::Error::other)?;
            let target = to.join(relative);

            if entry.file_type().is_dir() {
                fs::create_dir_all(&target)?;
            } else if entry.file_type().is_file() {
                if let Some(parent) = target.parent() {
                    fs::create_dir_all(parent)?;
                }
                fs::copy(entry.path(), &target)?;
            } else {
                debug!(path = %entry.path().display(), "Skipping non-regular file during copy");
            }
        }
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        remove_tree(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        sorted_entries(path)
    }
}

/// Plain recursive copy: one `read_dir` per directory, one stream copy per file.
///
/// Does not rely on `fs::copy`'s platform fast paths (reflinks,
/// `copy_file_range`), which fail on some network and overlay mounts.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileByFileFs;

impl FileByFileFs {
    fn copy_recursive(from: &Path, to: &Path) -> io::Result<()> {
        fs::create_dir_all(to)?;
        for entry in fs::read_dir(from)? {
            let entry = entry?;
            let file_type = entry.file_type()?;
            let target = to.join(entry.file_name());
            if file_type.is_dir() {
                Self::copy_recursive(&entry.path(), &target)?;
            } else if file_type.is_file() {
                let mut reader = fs::File::open(entry.path())?;
                let mut writer = fs::File::create(&target)?;
                io::copy(&mut reader, &mut writer)?;
                writer.sync_all()?;
            }
        }
        Ok(())
    }
}

impl Filesystem for FileByFileFs {
    fn name(&self) -> &'static str {
        "file-by-file"
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn copy_dir(&self, from: &Path, to: &Path) -> io::Result<()> {
        if !from.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("source is not a directory: {}", from.display()),
            ));
        }
        Self::copy_recursive(from, to)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        if !path.exists() {
            return Ok(());
        }
        for entry in fs::read_dir(path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                self.remove_dir_all(&entry.path())?;
            } else {
                fs::remove_file(entry.path())?;
            }
        }
        fs::remove_dir(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn exists(&self, path: &Path) -> bool {
        fs::metadata(path).is_ok()
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        sorted_entries(path)
    }
}

/// Runs every operation on `primary`; a failure is retried once on `secondary`.
#[derive(Debug, Clone, Default)]
pub struct FallbackFs<P, S> {
    primary: P,
    secondary: S,
}

impl<P: Filesystem, S: Filesystem> FallbackFs<P, S> {
    pub fn new(primary: P, secondary: S) -> Self {
        Self {
            primary,
            secondary,
        }
    }

    fn with_fallback<T>(
        &self,
        op: &str,
        path: &Path,
        run: impl Fn(&dyn Filesystem) -> io::Result<T>,
    ) -> io::Result<T> {
        match run(&self.primary) {
            Ok(value) => Ok(value),
            Err(primary_err) => {
                warn!(
                    op,
                    path = %path.display(),
                    primary = self.primary.name(),
                    secondary = self.secondary.name(),
                    error = %primary_err,
                    "Filesystem operation failed, retrying with fallback"
                );
                run(&self.secondary)
            }
        }
    }
}

/// The production filesystem: native operations backed by file-by-file copies.
pub type DefaultFs = FallbackFs<NativeFs, FileByFileFs>;

impl<P: Filesystem, S: Filesystem> Filesystem for FallbackFs<P, S> {
    fn name(&self) -> &'static str {
        "fallback"
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.with_fallback("rename", from, |fs| fs.rename(from, to))
    }

    fn copy_dir(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.with_fallback("copy_dir", from, |fs| fs.copy_dir(from, to))
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        self.with_fallback("remove_dir_all", path, |fs| fs.remove_dir_all(path))
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.with_fallback("create_dir_all", path, |fs| fs.create_dir_all(path))
    }

    fn exists(&self, path: &Path) -> bool {
        self.primary.exists(path) || self.secondary.exists(path)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.with_fallback("list_dir", path, |fs| fs.list_dir(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn sample_tree(root: &Path) {
        fs::create_dir_all(root.join("includes/admin")).unwrap();
        fs::create_dir_all(root.join("languages")).unwrap();
        fs::write(root.join("widget.php"), "<?php\n/* Plugin Name: Widget */").unwrap();
        fs::write(root.join("includes/admin/page.php"), "<?php // admin").unwrap();
    }

    fn assert_tree(root: &Path) {
        assert!(root.join("widget.php").is_file());
        assert!(root.join("includes/admin/page.php").is_file());
        assert!(root.join("languages").is_dir());
    }

    #[test]
    fn test_native_copy_dir() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        sample_tree(&src);

        NativeFs.copy_dir(&src, &temp.path().join("dst")).unwrap();
        assert_tree(&temp.path().join("dst"));
    }

    #[test]
    fn test_file_by_file_copy_and_remove() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        sample_tree(&src);
        let dst = temp.path().join("dst");

        FileByFileFs.copy_dir(&src, &dst).unwrap();
        assert_tree(&dst);

        FileByFileFs.remove_dir_all(&dst).unwrap();
        assert!(!dst.exists());
        FileByFileFs.remove_dir_all(&dst).unwrap();
    }

    #[test]
    fn test_remove_missing_is_ok() {
        let temp = TempDir::new().unwrap();
        NativeFs.remove_dir_all(&temp.path().join("nope")).unwrap();
    }

    #[derive(Default)]
    struct BrokenFs {
        calls: AtomicUsize,
    }

    impl Filesystem for BrokenFs {
        fn name(&self) -> &'static str {
            "broken"
        }
        fn rename(&self, _: &Path, _: &Path) -> io::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(io::Error::other("rename refused"))
        }
        fn copy_dir(&self, _: &Path, _: &Path) -> io::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(io::Error::other("copy refused"))
        }
        fn remove_dir_all(&self, _: &Path) -> io::Result<()> {
            Err(io::Error::other("remove refused"))
        }
        fn create_dir_all(&self, _: &Path) -> io::Result<()> {
            Err(io::Error::other("mkdir refused"))
        }
        fn exists(&self, _: &Path) -> bool {
            false
        }
        fn list_dir(&self, _: &Path) -> io::Result<Vec<PathBuf>> {
            Err(io::Error::other("list refused"))
        }
    }

    #[test]
    fn test_fallback_uses_secondary_on_failure() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        sample_tree(&src);
        let dst = temp.path().join("dst");

        let fs = FallbackFs::new(BrokenFs::default(), FileByFileFs);
        fs.copy_dir(&src, &dst).unwrap();
        assert_tree(&dst);
        assert_eq!(fs.primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fs.list_dir(temp.path()).unwrap(), vec![dst.clone(), src.clone()]);
    }

    #[test]
    fn test_fallback_reports_secondary_error() {
        let temp = TempDir::new().unwrap();
        let fs = FallbackFs::new(BrokenFs::default(), BrokenFs::default());
        let err = fs.copy_dir(temp.path(), &temp.path().join("x")).unwrap_err();
        assert_eq!(err.to_string(), "copy refused");
        assert_eq!(fs.secondary.calls.load(Ordering::SeqCst), 1);
    }
}
