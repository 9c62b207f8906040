// Collection discovered by listing a storage directory
//
// Long-lived request records are not tracked through an index file. Each
// record lives in its own JSON file under a day folder, and the cache is
// built by recursively listing the records directory. A malformed record
// file is logged and skipped so one bad file never takes the category
// down.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use overture_error::{ProviderError, ProviderResult};
use overture_types::{Resource, ResourcePath, UpsertResult};
use serde_json::Value;
use tracing::{info, warn};

use crate::collection::{CollectionAction, ProviderContext, ResourceCollection};
use crate::validation::check_resource_name;

const JSON_CONTENT_TYPE: &str = "application/json";

/// A resource that records the storage path it was discovered at.
pub trait DiscoverableResource: Resource {
    /// The storage path of the record, once persisted.
    fn resource_file_path(&self) -> Option<&str>;

    /// Records the storage path the resource was persisted at.
    fn set_resource_file_path(&mut self, path: String);
}

/// A resource collection discovered by recursively listing a directory of
/// one-file-per-resource records.
pub struct DiscoveredCollection<T: DiscoverableResource> {
    context: Arc<ProviderContext>,
    resource_type: String,
    directory: String,
    resources: DashMap<String, T>,
    actions: HashMap<String, Arc<dyn CollectionAction<DiscoveredCollection<T>>>>,
}

impl<T: DiscoverableResource> DiscoveredCollection<T> {
    /// Creates an uninitialized collection over the given directory.
    pub fn new(
        context: Arc<ProviderContext>,
        resource_type: impl Into<String>,
        directory: impl Into<String>,
    ) -> Self {
        Self {
            context,
            resource_type: resource_type.into(),
            directory: directory.into(),
            resources: DashMap::new(),
            actions: HashMap::new(),
        }
    }

    /// Registers a type-specific action under the given name.
    pub fn with_action(
        mut self,
        name: impl Into<String>,
        action: Arc<dyn CollectionAction<DiscoveredCollection<T>>>,
    ) -> Self {
        self.actions.insert(name.into(), action);
        self
    }

    fn object_id(&self, name: &str) -> String {
        format!(
            "/instances/{}/providers/{}/{}/{}",
            self.context.instance.id, self.context.provider_name, self.resource_type, name
        )
    }

    /// The storage path a new record is persisted at, grouped by day.
    fn record_path(&self, name: &str) -> String {
        let day = Utc::now().format("%Y%m%d");
        format!("{}/{}/{}-{}.json", self.directory, day, day, name)
    }

    async fn scan(&self) -> ProviderResult<()> {
        let paths = self
            .context
            .storage
            .list(&self.context.container, &self.directory, true)
            .await?;
        for path in paths.iter().filter(|p| p.ends_with(".json")) {
            let content = self.context.storage.read(&self.context.container, path).await?;
            match serde_json::from_slice::<T>(&content) {
                Ok(mut resource) => {
                    resource.set_resource_file_path(path.clone());
                    self.resources.insert(resource.name().to_string(), resource);
                }
                Err(err) => {
                    warn!(path = %path, error = %err, "skipping malformed record file");
                }
            }
        }
        Ok(())
    }

    /// Returns the live record with the given name, rescanning the
    /// directory on a cache miss.
    pub async fn load_resource(&self, name: &str) -> ProviderResult<T> {
        if !self.resources.contains_key(name) {
            self.scan().await?;
        }
        match self.resources.get(name) {
            Some(r) if !r.deleted() => Ok(r.value().clone()),
            _ => Err(ProviderError::not_found(self.object_id(name))),
        }
    }

    /// Creates or updates a typed record.
    pub async fn upsert_resource(
        &self,
        resource_id: Option<&str>,
        mut resource: T,
        identity: &str,
    ) -> ProviderResult<UpsertResult> {
        let name = resource.name().to_string();
        if let Some(id) = resource_id {
            if id != name {
                return Err(ProviderError::conflict(format!(
                    "The resource name {name} does not match the path identifier {id}."
                )));
            }
        }
        let messages = check_resource_name(&name);
        if !messages.is_empty() {
            return Err(ProviderError::validation_messages(messages));
        }

        let resource_exists = self.resources.contains_key(&name);
        // A record keeps the path it was first persisted at, whatever day
        // it is updated on.
        let path = self
            .resources
            .get(&name)
            .and_then(|r| r.resource_file_path().map(String::from))
            .or_else(|| resource.resource_file_path().map(String::from))
            .unwrap_or_else(|| self.record_path(&name));
        resource.set_resource_file_path(path.clone());

        let object_id = self.object_id(&name);
        {
            let base = resource.base_mut();
            base.object_id = Some(object_id.clone());
            base.version = Some(self.context.instance.version.clone());
            base.updated_by = Some(identity.to_string());
            if !resource_exists {
                base.created_by = Some(identity.to_string());
            }
        }

        let content = serde_json::to_vec_pretty(&resource)?;
        self.context
            .storage
            .write(&self.context.container, &path, &content, JSON_CONTENT_TYPE)
            .await?;
        self.resources.insert(name, resource);

        info!(resource = %object_id, exists = resource_exists, "record upserted");
        Ok(UpsertResult { object_id, resource_exists })
    }
}

#[async_trait]
impl<T: DiscoverableResource> ResourceCollection for DiscoveredCollection<T> {
    fn resource_type(&self) -> &str {
        &self.resource_type
    }

    fn store_file_name(&self) -> Option<&str> {
        None
    }

    async fn initialize(&self) -> ProviderResult<()> {
        self.scan().await?;
        info!(
            resource_type = %self.resource_type,
            records = self.resources.len(),
            "collection initialized"
        );
        Ok(())
    }

    async fn refresh(&self) -> ProviderResult<()> {
        self.scan().await
    }

    async fn get_all(&self) -> ProviderResult<Value> {
        let records: Vec<T> = self
            .resources
            .iter()
            .filter(|r| !r.deleted())
            .map(|r| r.value().clone())
            .collect();
        Ok(serde_json::to_value(records)?)
    }

    async fn get_by_id(&self, id: &str) -> ProviderResult<Value> {
        Ok(serde_json::to_value(self.load_resource(id).await?)?)
    }

    async fn upsert(
        &self,
        path: &ResourcePath,
        serialized_resource: &str,
        identity: &str,
    ) -> ProviderResult<UpsertResult> {
        let resource: T = serde_json::from_str(serialized_resource).map_err(|e| {
            ProviderError::validation(format!("The resource definition is malformed: {e}"))
        })?;
        self.upsert_resource(path.resource_id(), resource, identity).await
    }

    async fn delete(&self, _id: &str) -> ProviderResult<()> {
        Err(ProviderError::conflict(format!(
            "Resources of type {} cannot be deleted.",
            self.resource_type
        )))
    }

    async fn execute_action(
        &self,
        action: &str,
        resource_id: Option<&str>,
        serialized_action: &str,
        identity: &str,
    ) -> ProviderResult<Value> {
        match self.actions.get(action) {
            Some(custom) => {
                custom.execute(self, resource_id, serialized_action, identity).await
            }
            None => Err(ProviderError::conflict(format!(
                "The action {action} is not supported by the {} collection.",
                self.resource_type
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overture_storage::{MemoryStorageService, StorageService};
    use overture_types::vectorization::VectorizationRequest;
    use overture_types::InstanceSettings;

    fn collection() -> DiscoveredCollection<VectorizationRequest> {
        let context = Arc::new(
            ProviderContext::new(
                "vectorization",
                InstanceSettings::new("inst-1", "0.9.1"),
                Arc::new(MemoryStorageService::new()),
            )
            .with_container("vectorization-state"),
        );
        DiscoveredCollection::new(context, "vectorization-requests", "requests")
    }

    #[tokio::test]
    async fn records_are_grouped_into_day_folders() {
        let collection = collection();
        collection.initialize().await.unwrap();

        let request = VectorizationRequest::new("req-1", "site://docs/page-1");
        collection.upsert_resource(None, request, "worker").await.unwrap();

        let stored = collection.load_resource("req-1").await.unwrap();
        let day = Utc::now().format("%Y%m%d").to_string();
        assert_eq!(
            stored.resource_file_path.as_deref(),
            Some(format!("requests/{day}/{day}-req-1.json").as_str())
        );
    }

    #[tokio::test]
    async fn updates_keep_the_original_record_path() {
        let collection = collection();
        collection.initialize().await.unwrap();

        let mut request = VectorizationRequest::new("req-1", "site://docs/page-1");
        request.resource_file_path = Some("requests/20240101/20240101-req-1.json".to_string());
        collection.upsert_resource(None, request.clone(), "worker").await.unwrap();

        request.error_messages.push("transient".to_string());
        let result = collection.upsert_resource(None, request, "worker").await.unwrap();
        assert!(result.resource_exists);

        let stored = collection.load_resource("req-1").await.unwrap();
        assert_eq!(
            stored.resource_file_path.as_deref(),
            Some("requests/20240101/20240101-req-1.json")
        );
    }

    #[tokio::test]
    async fn discovery_skips_malformed_files_and_non_json() {
        let collection = collection();
        let storage = Arc::clone(&collection.context.storage);

        let good = VectorizationRequest::new("req-1", "site://docs/page-1");
        storage
            .write(
                "vectorization-state",
                "requests/20240101/20240101-req-1.json",
                &serde_json::to_vec(&good).unwrap(),
                "application/json",
            )
            .await
            .unwrap();
        storage
            .write(
                "vectorization-state",
                "requests/20240101/20240101-broken.json",
                b"not json",
                "application/json",
            )
            .await
            .unwrap();
        storage
            .write("vectorization-state", "requests/notes.txt", b"ignored", "text/plain")
            .await
            .unwrap();

        collection.initialize().await.unwrap();
        let all = collection.get_all().await.unwrap();
        assert_eq!(all.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn cache_miss_falls_back_to_a_rescan() {
        let collection = collection();
        collection.initialize().await.unwrap();

        let request = VectorizationRequest::new("req-late", "site://docs/page-9");
        collection
            .context
            .storage
            .write(
                "vectorization-state",
                "requests/20240101/20240101-req-late.json",
                &serde_json::to_vec(&request).unwrap(),
                "application/json",
            )
            .await
            .unwrap();

        let found = collection.load_resource("req-late").await.unwrap();
        assert_eq!(found.content_identifier, "site://docs/page-9");
    }

    #[tokio::test]
    async fn delete_is_rejected() {
        let collection = collection();
        collection.initialize().await.unwrap();
        let err = collection.delete("req-1").await.unwrap_err();
        assert!(matches!(err, ProviderError::Conflict(_)));
    }
}
