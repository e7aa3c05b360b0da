//! Where unit texts are read from and written to
//!
//! [`FsStorage`] is the real thing. [`MemoryStorage`] backs tests and lets
//! callers run the pipeline over texts that never touch disk.

use crate::error::{DriverError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::NamedTempFile;
use tracing::debug;

/// Unit text storage
#[async_trait]
pub trait Storage: Send + Sync + 'static {
    /// Read the whole text at `path`
    async fn read(&self, path: &Path) -> Result<String>;

    /// Replace the text at `path`
    ///
    /// Readers never observe a partially written file.
    async fn write(&self, path: &Path, contents: &str) -> Result<()>;
}

/// Filesystem storage with atomic replacement
#[derive(Debug, Clone, Copy, Default)]
pub struct FsStorage;

impl FsStorage {
    /// Create filesystem storage
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Storage for FsStorage {
    async fn read(&self, path: &Path) -> Result<String> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| DriverError::io(path, e))
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<()> {
        let path = path.to_path_buf();
        let contents = contents.to_owned();
        tokio::task::spawn_blocking(move || atomic_write(&path, contents.as_bytes()))
            .await
            .map_err(|e| DriverError::io(PathBuf::new(), std::io::Error::other(e)))?
    }
}

/// Write to a temp file next to `path`, then rename over it
///
/// The existing file's permissions are carried over.
fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let io = |e: std::io::Error| DriverError::io(path, e);

    let mut tmp = NamedTempFile::new_in(parent).map_err(io)?;
    if let Ok(meta) = std::fs::metadata(path) {
        tmp.as_file().set_permissions(meta.permissions()).map_err(io)?;
    }
    tmp.write_all(bytes).map_err(io)?;
    tmp.as_file().sync_all().map_err(io)?;
    tmp.persist(path).map_err(|e| io(e.error))?;

    debug!(path = %path.display(), bytes = bytes.len(), "persisted unit");
    Ok(())
}

/// In-memory storage
#[derive(Debug, Default)]
pub struct MemoryStorage {
    files: DashMap<PathBuf, String>,
    writes: AtomicUsize,
}

impl MemoryStorage {
    /// Create empty storage
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a file
    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files.insert(path.into(), contents.into());
    }

    /// Current text of a file
    #[must_use]
    pub fn get(&self, path: &Path) -> Option<String> {
        self.files.get(path).map(|entry| entry.value().clone())
    }

    /// Every stored path, sorted
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.files.iter().map(|e| e.key().clone()).collect();
        paths.sort();
        paths
    }

    /// Number of writes performed through [`Storage::write`]
    #[inline]
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn read(&self, path: &Path) -> Result<String> {
        self.get(path)
            .ok_or_else(|| DriverError::io(path, std::io::ErrorKind::NotFound.into()))
    }

    async fn write(&self, path: &Path, contents: &str) -> Result<()> {
        self.files.insert(path.to_path_buf(), contents.to_owned());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn storage_fs_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A.scala");
        std::fs::write(&path, "package a\n").unwrap();

        let storage = FsStorage::new();
        assert_eq!(storage.read(&path).await.unwrap(), "package a\n");

        storage.write(&path, "package b\n").await.unwrap();
        assert_eq!(storage.read(&path).await.unwrap(), "package b\n");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn storage_fs_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("A.scala");
        std::fs::write(&path, "x").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();

        FsStorage::new().write(&path, "y").await.unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[tokio::test]
    async fn storage_fs_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = FsStorage::new().read(&dir.path().join("nope.scala")).await.unwrap_err();
        assert!(matches!(err, DriverError::Io { .. }));
    }

    #[tokio::test]
    async fn storage_memory_counts_writes() {
        let storage = MemoryStorage::new();
        storage.insert("a/A.scala", "package a\n");
        assert!(storage.read(Path::new("b/B.scala")).await.is_err());

        storage.write(Path::new("a/A.scala"), "package aa\n").await.unwrap();
        assert_eq!(storage.get(Path::new("a/A.scala")).unwrap(), "package aa\n");
        assert_eq!(storage.write_count(), 1);
        assert_eq!(storage.paths(), vec![PathBuf::from("a/A.scala")]);
    }
}
