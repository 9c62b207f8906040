// Index-backed collection with one payload file per resource
//
// The durable form of this collection is a store file holding lightweight
// references plus one JSON payload file per resource. The reference cache
// is seeded at initialization; payloads are fetched lazily on first access
// and kept in a second cache keyed by name.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::try_join_all;
use overture_error::{ProviderError, ProviderResult};
use overture_types::{
    ActionResult, NameCheckResult, NameCheckStatus, Resource, ResourceFilter, ResourceName,
    ResourcePath, ResourceReference, ResourceStore, UpsertResult,
};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::info;

use crate::collection::{actions, ProviderContext, ResourceCollection};
use crate::validation::{check_resource_name, ResourceValidator};

const JSON_CONTENT_TYPE: &str = "application/json";

/// A resource collection persisted as a reference index plus one payload
/// file per resource.
pub struct ReferenceCollection<T: Resource> {
    context: Arc<ProviderContext>,
    resource_type: String,
    store_file_name: String,
    references: DashMap<String, ResourceReference>,
    loaded: DashMap<String, T>,
    default_name: RwLock<Option<String>>,
    validator: Option<Arc<dyn ResourceValidator<T>>>,
}

impl<T: Resource> ReferenceCollection<T> {
    /// Creates an uninitialized collection for the given resource type.
    pub fn new(
        context: Arc<ProviderContext>,
        resource_type: impl Into<String>,
        store_file_name: impl Into<String>,
    ) -> Self {
        Self {
            context,
            resource_type: resource_type.into(),
            store_file_name: store_file_name.into(),
            references: DashMap::new(),
            loaded: DashMap::new(),
            default_name: RwLock::new(None),
            validator: None,
        }
    }

    /// Attaches a validator run on every upserted resource.
    pub fn with_validator(mut self, validator: Arc<dyn ResourceValidator<T>>) -> Self {
        self.validator = Some(validator);
        self
    }

    fn store_path(&self) -> String {
        format!("/{}/{}", self.context.provider_name, self.store_file_name)
    }

    fn payload_path(&self, name: &str) -> String {
        format!("/{}/{}.json", self.context.provider_name, name)
    }

    fn object_id(&self, name: &str) -> String {
        format!(
            "/instances/{}/providers/{}/{}/{}",
            self.context.instance.id, self.context.provider_name, self.resource_type, name
        )
    }

    async fn persist_index(&self) -> ProviderResult<()> {
        let entries: Vec<ResourceReference> =
            self.references.iter().map(|r| r.value().clone()).collect();
        let store =
            ResourceStore::from_cache(entries.iter(), self.default_name.read().await.clone());
        let content = serde_json::to_vec_pretty(&store)?;
        self.context
            .storage
            .write(&self.context.container, &self.store_path(), &content, JSON_CONTENT_TYPE)
            .await?;
        Ok(())
    }

    fn live_reference(&self, name: &str) -> ProviderResult<ResourceReference> {
        match self.references.get(name) {
            Some(r) if !r.deleted => Ok(r.value().clone()),
            _ => Err(ProviderError::not_found(self.object_id(name))),
        }
    }

    /// Returns the resource with the given name, fetching its payload from
    /// storage on first access.
    pub async fn load_resource(&self, name: &str) -> ProviderResult<T> {
        let reference = self.live_reference(name)?;
        if let Some(resource) = self.loaded.get(name) {
            return Ok(resource.value().clone());
        }
        let content = self
            .context
            .storage
            .read(&self.context.container, &reference.storage_path)
            .await?;
        let resource: T = serde_json::from_slice(&content)?;
        self.loaded.insert(name.to_string(), resource.clone());
        Ok(resource)
    }

    /// Returns every live resource of the collection.
    pub async fn load_all(&self) -> ProviderResult<Vec<T>> {
        let names: Vec<String> = self
            .references
            .iter()
            .filter(|r| !r.deleted)
            .map(|r| r.key().clone())
            .collect();
        try_join_all(names.iter().map(|name| self.load_resource(name))).await
    }

    /// Creates or updates a typed resource.
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
        if let Some(existing) = self.references.get(&name) {
            if existing.deleted {
                return Err(ProviderError::conflict(format!(
                    "The resource {name} has been deleted and cannot be recreated under the same name."
                )));
            }
        }

        let mut messages = check_resource_name(&name);
        if let Some(validator) = &self.validator {
            messages.extend(validator.validate(&resource).await);
        }
        if !messages.is_empty() {
            return Err(ProviderError::validation_messages(messages));
        }

        let resource_exists = self.references.contains_key(&name);
        let created_by = if resource_exists {
            self.load_resource(&name).await?.base().created_by.clone()
        } else {
            Some(identity.to_string())
        };
        let object_id = self.object_id(&name);
        {
            let base = resource.base_mut();
            base.object_id = Some(object_id.clone());
            base.version = Some(self.context.instance.version.clone());
            base.updated_by = Some(identity.to_string());
            base.created_by = created_by;
        }

        // Payload first, then the cache, then the index: a crash between
        // the writes leaves at worst an unindexed payload file.
        let storage_path = self.payload_path(&name);
        let content = serde_json::to_vec_pretty(&resource)?;
        self.context
            .storage
            .write(&self.context.container, &storage_path, &content, JSON_CONTENT_TYPE)
            .await?;

        let reference =
            ResourceReference::new(&name, resource.resource_type(), storage_path);
        self.loaded.insert(name.clone(), resource);
        self.references.insert(name.clone(), reference);
        self.persist_index().await?;

        info!(resource = %object_id, exists = resource_exists, "resource upserted");
        Ok(UpsertResult { object_id, resource_exists })
    }

    async fn purge(&self, name: &str) -> ProviderResult<Value> {
        match self.references.get(name).map(|r| r.value().clone()) {
            None => Err(ProviderError::not_found(self.object_id(name))),
            Some(r) if !r.deleted => Err(ProviderError::conflict(format!(
                "The resource {name} is not deleted and cannot be purged."
            ))),
            Some(r) => {
                self.references.remove(name);
                self.loaded.remove(name);
                self.persist_index().await?;
                // The payload file may already be gone; that is fine.
                if let Err(err) = self
                    .context
                    .storage
                    .delete(&self.context.container, &r.storage_path)
                    .await
                {
                    info!(path = %r.storage_path, error = %err, "purged payload was already absent");
                }
                Ok(serde_json::to_value(ActionResult::success())?)
            }
        }
    }

    fn check_name(&self, serialized_action: &str) -> ProviderResult<Value> {
        let proposed: ResourceName = serde_json::from_str(serialized_action)?;
        // A tombstoned entry still reserves its name.
        let taken = self.references.contains_key(&proposed.name);
        let result = NameCheckResult {
            name: proposed.name.clone(),
            resource_type: proposed.resource_type,
            status: if taken { NameCheckStatus::Denied } else { NameCheckStatus::Allowed },
            message: taken.then(|| {
                format!(
                    "The name {} is already in use by an existing or previously deleted resource.",
                    proposed.name
                )
            }),
        };
        Ok(serde_json::to_value(result)?)
    }

    async fn filter(&self, serialized_action: &str) -> ProviderResult<Value> {
        let filter: ResourceFilter = serde_json::from_str(serialized_action)?;
        match filter.default {
            Some(true) => {
                let default_name = self.default_name.read().await.clone().ok_or_else(|| {
                    ProviderError::configuration(format!(
                        "The {} collection has no default resource configured.",
                        self.resource_type
                    ))
                })?;
                let resource = self.load_resource(&default_name).await?;
                Ok(serde_json::to_value(vec![resource])?)
            }
            Some(false) => {
                let default_name = self.default_name.read().await.clone();
                let all = self.load_all().await?;
                let rest: Vec<T> = all
                    .into_iter()
                    .filter(|r| Some(r.name()) != default_name.as_deref())
                    .collect();
                Ok(serde_json::to_value(rest)?)
            }
            None => Ok(serde_json::to_value(self.load_all().await?)?),
        }
    }
}

#[async_trait]
impl<T: Resource> ResourceCollection for ReferenceCollection<T> {
    fn resource_type(&self) -> &str {
        &self.resource_type
    }

    fn store_file_name(&self) -> Option<&str> {
        Some(&self.store_file_name)
    }

    async fn initialize(&self) -> ProviderResult<()> {
        let path = self.store_path();
        if self.context.storage.exists(&self.context.container, &path).await? {
            let content = self.context.storage.read(&self.context.container, &path).await?;
            let store: ResourceStore<ResourceReference> = serde_json::from_slice(&content)?;
            *self.default_name.write().await = store.default_resource_name.clone();
            for (name, reference) in store.into_map() {
                self.references.insert(name, reference);
            }
        } else {
            let store = ResourceStore::<ResourceReference>::empty();
            let content = serde_json::to_vec_pretty(&store)?;
            self.context
                .storage
                .write(&self.context.container, &path, &content, JSON_CONTENT_TYPE)
                .await?;
        }
        info!(
            resource_type = %self.resource_type,
            references = self.references.len(),
            "collection initialized"
        );
        Ok(())
    }

    async fn refresh(&self) -> ProviderResult<()> {
        let content = self
            .context
            .storage
            .read(&self.context.container, &self.store_path())
            .await?;
        let store: ResourceStore<ResourceReference> = serde_json::from_slice(&content)?;
        *self.default_name.write().await = store.default_resource_name.clone();
        // Merge, never wipe: entries absent from the reloaded store stay
        // cached. Reloaded entries evict their stale payloads.
        for (name, reference) in store.into_map() {
            self.loaded.remove(&name);
            self.references.insert(name, reference);
        }
        Ok(())
    }

    async fn get_all(&self) -> ProviderResult<Value> {
        Ok(serde_json::to_value(self.load_all().await?)?)
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

    async fn delete(&self, id: &str) -> ProviderResult<()> {
        let mut reference = match self.references.get(id) {
            Some(r) => r.value().clone(),
            None => return Err(ProviderError::not_found(self.object_id(id))),
        };
        // Deleting an already tombstoned resource is a no-op.
        if !reference.deleted {
            reference.deleted = true;
            self.references.insert(id.to_string(), reference);
            self.loaded.remove(id);
            self.persist_index().await?;
            info!(resource = %self.object_id(id), "resource deleted");
        }
        Ok(())
    }

    async fn execute_action(
        &self,
        action: &str,
        resource_id: Option<&str>,
        serialized_action: &str,
        _identity: &str,
    ) -> ProviderResult<Value> {
        match action {
            actions::CHECK_NAME => self.check_name(serialized_action),
            actions::FILTER => self.filter(serialized_action).await,
            actions::PURGE => {
                let id = resource_id.ok_or_else(|| {
                    ProviderError::validation("The purge action requires a resource identifier.")
                })?;
                self.purge(id).await
            }
            other => Err(ProviderError::conflict(format!(
                "The action {other} is not supported by the {} collection.",
                self.resource_type
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overture_storage::{MemoryStorageService, StorageService};
    use overture_types::model::{model_types, ModelDefinition};
    use overture_types::InstanceSettings;

    fn collection() -> ReferenceCollection<ModelDefinition> {
        let context = Arc::new(ProviderContext::new(
            "model",
            InstanceSettings::new("inst-1", "0.9.1"),
            Arc::new(MemoryStorageService::new()),
        ));
        ReferenceCollection::new(context, "models", "_model-references.json")
    }

    #[tokio::test]
    async fn initialize_creates_an_empty_index() {
        let collection = collection();
        collection.initialize().await.unwrap();
        assert!(collection
            .context
            .storage
            .exists("resource-provider", "/model/_model-references.json")
            .await
            .unwrap());
        let all = collection.get_all().await.unwrap();
        assert_eq!(all.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn upsert_assigns_object_id_and_audit_fields() {
        let collection = collection();
        collection.initialize().await.unwrap();

        let model = ModelDefinition::new("gpt-main", model_types::COMPLETION);
        let result = collection
            .upsert_resource(None, model, "alice@example.com")
            .await
            .unwrap();

        assert!(!result.resource_exists);
        assert_eq!(
            result.object_id,
            "/instances/inst-1/providers/model/models/gpt-main"
        );

        let stored = collection.load_resource("gpt-main").await.unwrap();
        assert_eq!(stored.base.created_by.as_deref(), Some("alice@example.com"));
        assert_eq!(stored.base.version.as_deref(), Some("0.9.1"));
    }

    #[tokio::test]
    async fn second_upsert_reports_existing_and_keeps_created_by() {
        let collection = collection();
        collection.initialize().await.unwrap();

        let model = ModelDefinition::new("gpt-main", model_types::COMPLETION);
        collection.upsert_resource(None, model.clone(), "alice").await.unwrap();
        let result = collection.upsert_resource(None, model, "bob").await.unwrap();

        assert!(result.resource_exists);
        let stored = collection.load_resource("gpt-main").await.unwrap();
        assert_eq!(stored.base.created_by.as_deref(), Some("alice"));
        assert_eq!(stored.base.updated_by.as_deref(), Some("bob"));
    }

    #[tokio::test]
    async fn deleted_resources_are_hidden_and_cannot_be_recreated() {
        let collection = collection();
        collection.initialize().await.unwrap();

        let model = ModelDefinition::new("gpt-main", model_types::BASIC);
        collection.upsert_resource(None, model.clone(), "alice").await.unwrap();
        collection.delete("gpt-main").await.unwrap();

        assert!(collection.load_resource("gpt-main").await.unwrap_err().is_not_found());
        // Idempotent.
        collection.delete("gpt-main").await.unwrap();

        let err = collection.upsert_resource(None, model, "alice").await.unwrap_err();
        assert!(matches!(err, ProviderError::Conflict(_)));
    }

    #[tokio::test]
    async fn purge_frees_the_name() {
        let collection = collection();
        collection.initialize().await.unwrap();

        let model = ModelDefinition::new("gpt-main", model_types::BASIC);
        collection.upsert_resource(None, model.clone(), "alice").await.unwrap();

        // Purging a live resource is rejected.
        let err = collection.purge("gpt-main").await.unwrap_err();
        assert!(matches!(err, ProviderError::Conflict(_)));

        collection.delete("gpt-main").await.unwrap();
        collection.purge("gpt-main").await.unwrap();

        let result = collection.upsert_resource(None, model, "alice").await.unwrap();
        assert!(!result.resource_exists);
    }

    #[tokio::test]
    async fn check_name_denies_tombstoned_names() {
        let collection = collection();
        collection.initialize().await.unwrap();

        let model = ModelDefinition::new("gpt-main", model_types::BASIC);
        collection.upsert_resource(None, model, "alice").await.unwrap();
        collection.delete("gpt-main").await.unwrap();

        let denied = collection
            .check_name(r#"{"name":"gpt-main"}"#)
            .unwrap();
        assert_eq!(denied["status"], "denied");

        let allowed = collection.check_name(r#"{"name":"gpt-other"}"#).unwrap();
        assert_eq!(allowed["status"], "allowed");
    }

    #[tokio::test]
    async fn refresh_merges_without_wiping() {
        let first = collection();
        first.initialize().await.unwrap();
        first
            .upsert_resource(None, ModelDefinition::new("a", model_types::BASIC), "alice")
            .await
            .unwrap();

        // A second collection over the same storage, as another replica.
        let second = ReferenceCollection::<ModelDefinition>::new(
            Arc::clone(&first.context),
            "models",
            "_model-references.json",
        );
        second.initialize().await.unwrap();
        second
            .upsert_resource(None, ModelDefinition::new("b", model_types::BASIC), "bob")
            .await
            .unwrap();

        first.refresh().await.unwrap();
        let all = first.load_all().await.unwrap();
        let mut names: Vec<&str> = all.iter().map(|m| m.base.name.as_str()).collect();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn refresh_keeps_cached_entries_absent_from_the_store_file() {
        let collection = collection();
        collection.initialize().await.unwrap();
        for name in ["a", "b"] {
            collection
                .upsert_resource(None, ModelDefinition::new(name, model_types::BASIC), "alice")
                .await
                .unwrap();
        }

        // A replica that never saw `b` rewrites the index with an updated
        // `a` and a new `c`.
        let store = ResourceStore::from_cache(
            [
                &ResourceReference::new("a", model_types::BASIC, "/model/a-v2.json"),
                &ResourceReference::new("c", model_types::BASIC, "/model/c.json"),
            ],
            None,
        );
        collection
            .context
            .storage
            .write(
                "resource-provider",
                "/model/_model-references.json",
                &serde_json::to_vec(&store).unwrap(),
                "application/json",
            )
            .await
            .unwrap();

        collection.refresh().await.unwrap();

        assert_eq!(
            collection.references.get("a").unwrap().storage_path,
            "/model/a-v2.json"
        );
        assert_eq!(collection.references.get("c").unwrap().storage_path, "/model/c.json");
        // The entry missing from the reloaded store survives, payload
        // cache included.
        assert!(!collection.references.get("b").unwrap().deleted);
        assert!(collection.loaded.get("b").is_some());
        // Reloaded entries evict their stale payloads.
        assert!(collection.loaded.get("a").is_none());
    }

    #[tokio::test]
    async fn lazy_load_survives_cache_eviction() {
        let collection = collection();
        collection.initialize().await.unwrap();
        collection
            .upsert_resource(None, ModelDefinition::new("a", model_types::BASIC), "alice")
            .await
            .unwrap();

        collection.loaded.clear();
        let reloaded = collection.load_resource("a").await.unwrap();
        assert_eq!(reloaded.base.name, "a");
    }
}
