// Collection whose store file embeds the full resources
//
// Small categories (profiles, pipelines) skip the per-resource payload
// files: the store file carries the complete resources, tombstones
// included, and the whole category is cached at initialization. Type
// specific actions (pipeline activation and the like) are registered on
// the collection through the `CollectionAction` table.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use overture_error::{ProviderError, ProviderResult};
use overture_types::{
    ActionResult, NameCheckResult, NameCheckStatus, Resource, ResourceFilter, ResourceName,
    ResourcePath, ResourceStore, UpsertResult,
};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::info;

use crate::collection::{actions, CollectionAction, ProviderContext, ResourceCollection};
use crate::validation::{check_resource_name, ResourceValidator};

const JSON_CONTENT_TYPE: &str = "application/json";

/// A resource collection persisted as a single store file embedding the
/// full resources.
pub struct EmbeddedCollection<T: Resource> {
    context: Arc<ProviderContext>,
    resource_type: String,
    store_file_name: String,
    resources: DashMap<String, T>,
    default_name: RwLock<Option<String>>,
    validator: Option<Arc<dyn ResourceValidator<T>>>,
    actions: HashMap<String, Arc<dyn CollectionAction<EmbeddedCollection<T>>>>,
}

impl<T: Resource> EmbeddedCollection<T> {
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
            resources: DashMap::new(),
            default_name: RwLock::new(None),
            validator: None,
            actions: HashMap::new(),
        }
    }

    /// Attaches a validator run on every upserted resource.
    pub fn with_validator(mut self, validator: Arc<dyn ResourceValidator<T>>) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Registers a type-specific action under the given name.
    pub fn with_action(
        mut self,
        name: impl Into<String>,
        action: Arc<dyn CollectionAction<EmbeddedCollection<T>>>,
    ) -> Self {
        self.actions.insert(name.into(), action);
        self
    }

    fn store_path(&self) -> String {
        format!("/{}/{}", self.context.provider_name, self.store_file_name)
    }

    fn object_id(&self, name: &str) -> String {
        format!(
            "/instances/{}/providers/{}/{}/{}",
            self.context.instance.id, self.context.provider_name, self.resource_type, name
        )
    }

    async fn persist_store(&self) -> ProviderResult<()> {
        let entries: Vec<T> = self.resources.iter().map(|r| r.value().clone()).collect();
        let store =
            ResourceStore::from_cache(entries.iter(), self.default_name.read().await.clone());
        let content = serde_json::to_vec_pretty(&store)?;
        self.context
            .storage
            .write(&self.context.container, &self.store_path(), &content, JSON_CONTENT_TYPE)
            .await?;
        Ok(())
    }

    /// Returns the live resource with the given name.
    pub fn get_resource(&self, name: &str) -> ProviderResult<T> {
        match self.resources.get(name) {
            Some(r) if !r.deleted() => Ok(r.value().clone()),
            _ => Err(ProviderError::not_found(self.object_id(name))),
        }
    }

    /// Returns every live resource of the collection.
    pub fn live_resources(&self) -> Vec<T> {
        self.resources
            .iter()
            .filter(|r| !r.deleted())
            .map(|r| r.value().clone())
            .collect()
    }

    /// Replaces a cached resource and rewrites the store file. Used by the
    /// type-specific actions; upserts go through `upsert_resource`.
    pub async fn update_and_persist(&self, resource: T) -> ProviderResult<()> {
        self.resources.insert(resource.name().to_string(), resource);
        self.persist_store().await
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
        if let Some(existing) = self.resources.get(&name) {
            if existing.deleted() {
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

        let resource_exists = self.resources.contains_key(&name);
        let created_by = if resource_exists {
            self.get_resource(&name)?.base().created_by.clone()
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

        self.resources.insert(name.clone(), resource);
        self.persist_store().await?;

        info!(resource = %object_id, exists = resource_exists, "resource upserted");
        Ok(UpsertResult { object_id, resource_exists })
    }

    async fn purge(&self, name: &str) -> ProviderResult<Value> {
        match self.resources.get(name).map(|r| r.deleted()) {
            None => Err(ProviderError::not_found(self.object_id(name))),
            Some(false) => Err(ProviderError::conflict(format!(
                "The resource {name} is not deleted and cannot be purged."
            ))),
            Some(true) => {
                self.resources.remove(name);
                self.persist_store().await?;
                Ok(serde_json::to_value(ActionResult::success())?)
            }
        }
    }

    fn check_name(&self, serialized_action: &str) -> ProviderResult<Value> {
        let proposed: ResourceName = serde_json::from_str(serialized_action)?;
        let taken = self.resources.contains_key(&proposed.name);
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
        let default_name = self.default_name.read().await.clone();
        match filter.default {
            Some(true) => {
                let default_name = default_name.ok_or_else(|| {
                    ProviderError::configuration(format!(
                        "The {} collection has no default resource configured.",
                        self.resource_type
                    ))
                })?;
                let resource = self.get_resource(&default_name)?;
                Ok(serde_json::to_value(vec![resource])?)
            }
            Some(false) => {
                let rest: Vec<T> = self
                    .live_resources()
                    .into_iter()
                    .filter(|r| Some(r.name()) != default_name.as_deref())
                    .collect();
                Ok(serde_json::to_value(rest)?)
            }
            None => Ok(serde_json::to_value(self.live_resources())?),
        }
    }
}

#[async_trait]
impl<T: Resource> ResourceCollection for EmbeddedCollection<T> {
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
            let store: ResourceStore<T> = serde_json::from_slice(&content)?;
            *self.default_name.write().await = store.default_resource_name.clone();
            for (name, resource) in store.into_map() {
                self.resources.insert(name, resource);
            }
        } else {
            let store = ResourceStore::<T>::empty();
            let content = serde_json::to_vec_pretty(&store)?;
            self.context
                .storage
                .write(&self.context.container, &path, &content, JSON_CONTENT_TYPE)
                .await?;
        }
        info!(
            resource_type = %self.resource_type,
            resources = self.resources.len(),
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
        let store: ResourceStore<T> = serde_json::from_slice(&content)?;
        *self.default_name.write().await = store.default_resource_name.clone();
        // Merge, never wipe.
        for (name, resource) in store.into_map() {
            self.resources.insert(name, resource);
        }
        Ok(())
    }

    async fn get_all(&self) -> ProviderResult<Value> {
        Ok(serde_json::to_value(self.live_resources())?)
    }

    async fn get_by_id(&self, id: &str) -> ProviderResult<Value> {
        Ok(serde_json::to_value(self.get_resource(id)?)?)
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
        let mut resource = match self.resources.get(id) {
            Some(r) => r.value().clone(),
            None => return Err(ProviderError::not_found(self.object_id(id))),
        };
        if !resource.deleted() {
            resource.base_mut().deleted = true;
            self.resources.insert(id.to_string(), resource);
            self.persist_store().await?;
            info!(resource = %self.object_id(id), "resource deleted");
        }
        Ok(())
    }

    async fn execute_action(
        &self,
        action: &str,
        resource_id: Option<&str>,
        serialized_action: &str,
        identity: &str,
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
            other => match self.actions.get(other) {
                Some(custom) => {
                    custom.execute(self, resource_id, serialized_action, identity).await
                }
                None => Err(ProviderError::conflict(format!(
                    "The action {other} is not supported by the {} collection.",
                    self.resource_type
                ))),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use overture_storage::MemoryStorageService;
    use overture_types::vectorization::{vectorization_types, VectorizationProfile};
    use overture_types::InstanceSettings;

    fn collection() -> EmbeddedCollection<VectorizationProfile> {
        let context = Arc::new(ProviderContext::new(
            "vectorization",
            InstanceSettings::new("inst-1", "0.9.1"),
            Arc::new(MemoryStorageService::new()),
        ));
        EmbeddedCollection::new(
            context,
            "indexing-profiles",
            "vectorization-indexing-profiles.json",
        )
    }

    fn profile(name: &str) -> VectorizationProfile {
        VectorizationProfile::new(name, vectorization_types::INDEXING_PROFILE)
    }

    #[tokio::test]
    async fn store_file_round_trips_the_full_resources() {
        let first = collection();
        first.initialize().await.unwrap();
        first.upsert_resource(None, profile("idx-1"), "alice").await.unwrap();

        let second = EmbeddedCollection::<VectorizationProfile>::new(
            Arc::clone(&first.context),
            "indexing-profiles",
            "vectorization-indexing-profiles.json",
        );
        second.initialize().await.unwrap();
        let reloaded = second.get_resource("idx-1").unwrap();
        assert_eq!(reloaded.base.created_by.as_deref(), Some("alice"));
        assert_eq!(
            reloaded.base.object_id.as_deref(),
            Some("/instances/inst-1/providers/vectorization/indexing-profiles/idx-1")
        );
    }

    #[tokio::test]
    async fn tombstones_survive_the_store_file() {
        let first = collection();
        first.initialize().await.unwrap();
        first.upsert_resource(None, profile("idx-1"), "alice").await.unwrap();
        first.delete("idx-1").await.unwrap();

        let second = EmbeddedCollection::<VectorizationProfile>::new(
            Arc::clone(&first.context),
            "indexing-profiles",
            "vectorization-indexing-profiles.json",
        );
        second.initialize().await.unwrap();
        assert!(second.get_resource("idx-1").unwrap_err().is_not_found());
        let err = second.upsert_resource(None, profile("idx-1"), "bob").await.unwrap_err();
        assert!(matches!(err, ProviderError::Conflict(_)));
    }

    #[tokio::test]
    async fn filter_on_default_requires_a_configured_default() {
        let collection = collection();
        collection.initialize().await.unwrap();
        collection.upsert_resource(None, profile("idx-1"), "alice").await.unwrap();

        let err = collection.filter(r#"{"default":true}"#).await.unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));

        *collection.default_name.write().await = Some("idx-1".to_string());
        let selected = collection.filter(r#"{"default":true}"#).await.unwrap();
        assert_eq!(selected.as_array().unwrap().len(), 1);

        let rest = collection.filter(r#"{"default":false}"#).await.unwrap();
        assert_eq!(rest.as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn unknown_action_is_a_conflict() {
        let collection = collection();
        collection.initialize().await.unwrap();
        let err = collection
            .execute_action("explode", None, "{}", "alice")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Conflict(_)));
    }
}
