// Type-erased resource collection interface
//
// A provider is a registration table of resource collections, one per
// resource type. The engine dispatches on the resource type name and talks
// to collections through this trait; the typed collection implementations
// live in the sibling modules.

use std::sync::Arc;

use async_trait::async_trait;
use overture_error::ProviderResult;
use overture_storage::StorageService;
use overture_types::{InstanceSettings, ResourcePath, UpsertResult};
use serde_json::Value;

/// Names of the built-in and type-specific actions.
pub mod actions {
    /// Checks whether a proposed name collides with any cached entry.
    pub const CHECK_NAME: &str = "check-name";
    /// Returns the subset of the category matching a filter description.
    pub const FILTER: &str = "filter";
    /// Hard-deletes a tombstoned entry from the index (administrative).
    pub const PURGE: &str = "purge";
    /// Activates a pipeline.
    pub const ACTIVATE: &str = "activate";
    /// Deactivates a pipeline.
    pub const DEACTIVATE: &str = "deactivate";
    /// Hands a request record to the processing collaborator.
    pub const PROCESS: &str = "process";
}

/// Shared context every collection of a provider operates in.
pub struct ProviderContext {
    /// The name of the resource provider.
    pub provider_name: String,
    /// The deployment instance settings.
    pub instance: InstanceSettings,
    /// The durable storage backend.
    pub storage: Arc<dyn StorageService>,
    /// The storage container holding the provider's files.
    pub container: String,
}

impl ProviderContext {
    /// Creates a context for the given provider using the default
    /// `resource-provider` container.
    pub fn new(
        provider_name: impl Into<String>,
        instance: InstanceSettings,
        storage: Arc<dyn StorageService>,
    ) -> Self {
        Self {
            provider_name: provider_name.into(),
            instance,
            storage,
            container: "resource-provider".to_string(),
        }
    }

    /// Overrides the storage container.
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }
}

/// One resource category of a provider: its cache, its durable store and
/// its operations.
///
/// Results are exchanged as JSON values; the engine offers typed access on
/// top by deserializing them.
#[async_trait]
pub trait ResourceCollection: Send + Sync {
    /// The resource type name this collection is registered under.
    fn resource_type(&self) -> &str;

    /// The file name of the category's durable store, used to route change
    /// notifications. `None` for categories discovered by listing.
    fn store_file_name(&self) -> Option<&str>;

    /// Loads or creates the category's durable store and seeds the cache.
    async fn initialize(&self) -> ProviderResult<()>;

    /// Reloads the durable store and merges it into the cache
    /// (last-writer-wins by name; entries absent from the reloaded store
    /// are left untouched).
    async fn refresh(&self) -> ProviderResult<()>;

    /// Returns every cached resource not marked deleted.
    async fn get_all(&self) -> ProviderResult<Value>;

    /// Returns the resource with the given name, or a not-found error if
    /// it is absent or tombstoned.
    async fn get_by_id(&self, id: &str) -> ProviderResult<Value>;

    /// Creates or updates a resource from its serialized definition.
    async fn upsert(
        &self,
        path: &ResourcePath,
        serialized_resource: &str,
        identity: &str,
    ) -> ProviderResult<UpsertResult>;

    /// Soft-deletes the resource with the given name.
    async fn delete(&self, id: &str) -> ProviderResult<()>;

    /// Executes a named action with a serialized argument on behalf of
    /// the given identity.
    async fn execute_action(
        &self,
        action: &str,
        resource_id: Option<&str>,
        serialized_action: &str,
        identity: &str,
    ) -> ProviderResult<Value>;
}

/// A type-specific action registered on a collection, e.g. pipeline
/// activation or request processing.
#[async_trait]
pub trait CollectionAction<C>: Send + Sync {
    /// Executes the action against the collection on behalf of the given
    /// identity.
    async fn execute(
        &self,
        collection: &C,
        resource_id: Option<&str>,
        serialized_action: &str,
        identity: &str,
    ) -> ProviderResult<Value>;
}
