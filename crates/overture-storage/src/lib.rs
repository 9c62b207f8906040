// Durable object storage abstraction
//
// This crate provides the storage collaborator consumed by the resource
// provider engine, together with an in-memory implementation for tests
// and a filesystem implementation for single-host deployments.

pub mod file_storage;
pub mod memory_storage;

pub use file_storage::FileStorageService;
pub use memory_storage::MemoryStorageService;

use async_trait::async_trait;
use overture_error::StorageResult;

/// Interface to a durable object storage backend.
///
/// Storage is organized into named containers holding files addressed by
/// slash-separated paths. The backend is the system of record shared by
/// every replica; the engine performs no retries on top of it.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Checks whether a file exists.
    async fn exists(&self, container: &str, path: &str) -> StorageResult<bool>;

    /// Reads the full content of a file.
    async fn read(&self, container: &str, path: &str) -> StorageResult<Vec<u8>>;

    /// Writes the full content of a file, creating it if needed.
    async fn write(
        &self,
        container: &str,
        path: &str,
        content: &[u8],
        content_type: &str,
    ) -> StorageResult<()>;

    /// Lists the paths of the files under a prefix.
    async fn list(
        &self,
        container: &str,
        prefix: &str,
        recursive: bool,
    ) -> StorageResult<Vec<String>>;

    /// Deletes a file.
    async fn delete(&self, container: &str, path: &str) -> StorageResult<()>;
}

/// Normalizes a storage path: strips the leading slash so that backends
/// can join it onto container roots.
pub(crate) fn normalize_path(path: &str) -> &str {
    path.trim_start_matches('/')
}
