//! Failure injection for filesystem operations.

use crate::updater::Filesystem;
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Operations of [`Filesystem`] that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FsOp {
    Rename,
    CopyDir,
    RemoveDirAll,
    CreateDirAll,
}

/// Wraps a filesystem and fails the selected operations with an I/O error.
#[derive(Debug)]
pub struct FailingFs<F> {
    inner: F,
    failing: Mutex<HashSet<FsOp>>,
    calls: Mutex<HashMap<FsOp, usize>>,
}

impl<F: Filesystem> FailingFs<F> {
    pub fn new(inner: F, failing: impl IntoIterator<Item = FsOp>) -> Self {
        Self {
            inner,
            failing: Mutex::new(failing.into_iter().collect()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Replace the set of failing operations.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn set_failing(&self, failing: impl IntoIterator<Item = FsOp>) {
        *self.failing.lock().unwrap() = failing.into_iter().collect();
    }

    /// How often `op` was called, failed or not.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self, op: FsOp) -> usize {
        self.calls.lock().unwrap().get(&op).copied().unwrap_or(0)
    }

    fn check(&self, op: FsOp, path: &Path) -> io::Result<()> {
        *self.calls.lock().unwrap().entry(op).or_default() += 1;
        if self.failing.lock().unwrap().contains(&op) {
            return Err(io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("injected {op:?} failure on {}", path.display()),
            ));
        }
        Ok(())
    }
}

impl<F: Filesystem> Filesystem for FailingFs<F> {
    fn name(&self) -> &'static str {
        "failing"
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.check(FsOp::Rename, from)?;
        self.inner.rename(from, to)
    }

    fn copy_dir(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.check(FsOp::CopyDir, from)?;
        self.inner.copy_dir(from, to)
    }

    fn remove_dir_all(&self, path: &Path) -> io::Result<()> {
        self.check(FsOp::RemoveDirAll, path)?;
        self.inner.remove_dir_all(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        self.check(FsOp::CreateDirAll, path)?;
        self.inner.create_dir_all(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn list_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        self.inner.list_dir(path)
    }
}
