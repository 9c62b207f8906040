// Filesystem storage implementation
//
// This module provides a filesystem-backed implementation of the
// StorageService trait for single-host deployments. Containers map to
// subdirectories of a root directory.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use futures::future::BoxFuture;
use overture_error::{StorageError, StorageResult};
use tracing::debug;

use crate::{normalize_path, StorageService};

/// Filesystem-backed implementation of the `StorageService` trait.
pub struct FileStorageService {
    root: PathBuf,
}

impl FileStorageService {
    /// Creates a storage service rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn file_path(&self, container: &str, path: &str) -> PathBuf {
        self.root.join(container).join(normalize_path(path))
    }

    fn io_error(path: &Path, source: std::io::Error) -> StorageError {
        StorageError::Io { path: path.display().to_string(), source }
    }

    fn collect_paths<'a>(
        dir: PathBuf,
        base: &'a Path,
        recursive: bool,
        paths: &'a mut Vec<String>,
    ) -> BoxFuture<'a, StorageResult<()>> {
        Box::pin(async move {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| Self::io_error(&dir, e))?;
            while let Some(entry) =
                entries.next_entry().await.map_err(|e| Self::io_error(&dir, e))?
            {
                let entry_path = entry.path();
                let file_type =
                    entry.file_type().await.map_err(|e| Self::io_error(&entry_path, e))?;
                if file_type.is_dir() {
                    if recursive {
                        Self::collect_paths(entry_path, base, recursive, paths).await?;
                    }
                } else if let Ok(relative) = entry_path.strip_prefix(base) {
                    paths.push(relative.to_string_lossy().replace('\\', "/"));
                }
            }
            Ok(())
        })
    }
}

#[async_trait]
impl StorageService for FileStorageService {
    async fn exists(&self, container: &str, path: &str) -> StorageResult<bool> {
        let file_path = self.file_path(container, path);
        match tokio::fs::try_exists(&file_path).await {
            Ok(found) => Ok(found),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(Self::io_error(&file_path, e)),
        }
    }

    async fn read(&self, container: &str, path: &str) -> StorageResult<Vec<u8>> {
        let file_path = self.file_path(container, path);
        match tokio::fs::read(&file_path).await {
            Ok(content) => Ok(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::FileNotFound(format!("{container}:{path}")))
            }
            Err(e) => Err(Self::io_error(&file_path, e)),
        }
    }

    async fn write(
        &self,
        container: &str,
        path: &str,
        content: &[u8],
        _content_type: &str,
    ) -> StorageResult<()> {
        let file_path = self.file_path(container, path);
        if let Some(parent) = file_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| Self::io_error(parent, e))?;
        }
        debug!(path = %file_path.display(), bytes = content.len(), "writing storage file");
        tokio::fs::write(&file_path, content)
            .await
            .map_err(|e| Self::io_error(&file_path, e))
    }

    async fn list(
        &self,
        container: &str,
        prefix: &str,
        recursive: bool,
    ) -> StorageResult<Vec<String>> {
        let base = self.root.join(container);
        let dir = base.join(normalize_path(prefix));
        match tokio::fs::try_exists(&dir).await {
            Ok(true) => {}
            Ok(false) => return Ok(Vec::new()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io_error(&dir, e)),
        }
        let mut paths = Vec::new();
        Self::collect_paths(dir, &base, recursive, &mut paths).await?;
        paths.sort();
        Ok(paths)
    }

    async fn delete(&self, container: &str, path: &str) -> StorageResult<()> {
        let file_path = self.file_path(container, path);
        match tokio::fs::remove_file(&file_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StorageError::FileNotFound(format!("{container}:{path}")))
            }
            Err(e) => Err(Self::io_error(&file_path, e)),
        }
    }
}
