// In-memory storage implementation
//
// This module provides an in-memory implementation of the StorageService
// trait for testing and development.

use std::collections::BTreeMap;
use std::sync::RwLock;

use async_trait::async_trait;
use overture_error::{StorageError, StorageResult};

use crate::{normalize_path, StorageService};

/// In-memory implementation of the `StorageService` trait.
///
/// Files are kept in a single map keyed by `container` and path, which
/// makes prefix listings a range scan.
pub struct MemoryStorageService {
    files: RwLock<BTreeMap<(String, String), Vec<u8>>>,
}

impl MemoryStorageService {
    /// Creates an empty in-memory storage service.
    pub fn new() -> Self {
        Self { files: RwLock::new(BTreeMap::new()) }
    }

    fn key(container: &str, path: &str) -> (String, String) {
        (container.to_string(), normalize_path(path).to_string())
    }

    fn lock_poisoned(e: impl std::fmt::Display) -> StorageError {
        StorageError::Backend(format!("Failed to acquire storage lock: {e}"))
    }
}

impl Default for MemoryStorageService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageService for MemoryStorageService {
    async fn exists(&self, container: &str, path: &str) -> StorageResult<bool> {
        let files = self.files.read().map_err(Self::lock_poisoned)?;
        Ok(files.contains_key(&Self::key(container, path)))
    }

    async fn read(&self, container: &str, path: &str) -> StorageResult<Vec<u8>> {
        let files = self.files.read().map_err(Self::lock_poisoned)?;
        files
            .get(&Self::key(container, path))
            .cloned()
            .ok_or_else(|| StorageError::FileNotFound(format!("{container}:{path}")))
    }

    async fn write(
        &self,
        container: &str,
        path: &str,
        content: &[u8],
        _content_type: &str,
    ) -> StorageResult<()> {
        let mut files = self.files.write().map_err(Self::lock_poisoned)?;
        files.insert(Self::key(container, path), content.to_vec());
        Ok(())
    }

    async fn list(
        &self,
        container: &str,
        prefix: &str,
        recursive: bool,
    ) -> StorageResult<Vec<String>> {
        let prefix = normalize_path(prefix);
        let files = self.files.read().map_err(Self::lock_poisoned)?;
        Ok(files
            .keys()
            .filter(|(c, p)| c == container && p.starts_with(prefix))
            .filter(|(_, p)| {
                // A non-recursive listing excludes paths nested below a
                // further directory level.
                recursive
                    || !p[prefix.len()..].trim_start_matches('/').contains('/')
            })
            .map(|(_, p)| p.clone())
            .collect())
    }

    async fn delete(&self, container: &str, path: &str) -> StorageResult<()> {
        let mut files = self.files.write().map_err(Self::lock_poisoned)?;
        files
            .remove(&Self::key(container, path))
            .map(|_| ())
            .ok_or_else(|| StorageError::FileNotFound(format!("{container}:{path}")))
    }
}
