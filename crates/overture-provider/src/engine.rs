// Generic resource provider engine
//
// An engine owns the registered collections of one provider, parses
// resource paths against its registration table, dispatches operations to
// the addressed collection, and keeps the sibling replicas informed by
// publishing a change notification after every successful mutation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use overture_error::{ProviderError, ProviderResult};
use overture_types::{ResourcePath, UpsertResult};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::collection::{ProviderContext, ResourceCollection};
use crate::events::{EventEnvelope, EventService};

/// A resource provider: a named registration table of collections over a
/// shared context.
pub struct ProviderEngine {
    context: Arc<ProviderContext>,
    collections: HashMap<String, Arc<dyn ResourceCollection>>,
    // Store file name to resource type, for routing change notifications.
    file_map: HashMap<String, String>,
    event_namespace: String,
    events: Option<Arc<dyn EventService>>,
    initialized: AtomicBool,
}

impl ProviderEngine {
    /// Creates an engine with no registered collections.
    pub fn new(context: Arc<ProviderContext>) -> Self {
        let event_namespace = format!("resource-provider:{}", context.provider_name);
        Self {
            context,
            collections: HashMap::new(),
            file_map: HashMap::new(),
            event_namespace,
            events: None,
            initialized: AtomicBool::new(false),
        }
    }

    /// Registers a collection under its resource type name.
    pub fn register(mut self, collection: Arc<dyn ResourceCollection>) -> Self {
        if let Some(file_name) = collection.store_file_name() {
            self.file_map
                .insert(file_name.to_string(), collection.resource_type().to_string());
        }
        self.collections
            .insert(collection.resource_type().to_string(), collection);
        self
    }

    /// Attaches the event feed change notifications are published to.
    pub fn with_events(mut self, events: Arc<dyn EventService>) -> Self {
        self.events = Some(events);
        self
    }

    /// The provider name.
    pub fn name(&self) -> &str {
        &self.context.provider_name
    }

    /// The event namespaces the engine listens on.
    pub fn event_namespaces(&self) -> Vec<String> {
        vec![self.event_namespace.clone()]
    }

    /// Initializes every registered collection. Operations dispatched
    /// before initialization completes are rejected.
    pub async fn initialize(&self) -> ProviderResult<()> {
        for collection in self.collections.values() {
            collection.initialize().await?;
        }
        self.initialized.store(true, Ordering::Release);
        info!(provider = self.name(), "resource provider initialized");
        Ok(())
    }

    fn ensure_initialized(&self) -> ProviderResult<()> {
        if self.initialized.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(ProviderError::configuration(format!(
                "The resource provider {} has not been initialized.",
                self.name()
            )))
        }
    }

    fn parse_path(&self, resource_path: &str, allow_action: bool) -> ProviderResult<ResourcePath> {
        let providers = vec![self.context.provider_name.clone()];
        let types: Vec<String> = self.collections.keys().cloned().collect();
        ResourcePath::parse(resource_path, &providers, &types, allow_action)
    }

    fn collection(&self, resource_type: &str) -> ProviderResult<&Arc<dyn ResourceCollection>> {
        self.collections.get(resource_type).ok_or_else(|| {
            ProviderError::conflict(format!(
                "The resource type {resource_type} is not supported by the {} provider.",
                self.name()
            ))
        })
    }

    async fn publish_change(&self, resource_type: &str) {
        let Some(events) = &self.events else { return };
        let Ok(collection) = self.collection(resource_type) else { return };
        let Some(file_name) = collection.store_file_name() else { return };
        let subject = format!(
            "/{}/{}/{}",
            self.context.container, self.context.provider_name, file_name
        );
        let envelope = EventEnvelope::new(subject, self.event_namespace.clone());
        if let Err(err) = events.publish(&self.event_namespace, vec![envelope]).await {
            warn!(provider = self.name(), error = %err, "change notification failed");
        }
    }

    /// Returns the addressed resource, or every live resource of the
    /// addressed type, as JSON.
    ///
    /// The identity is carried for parity with the mutating operations;
    /// reads do not record it.
    pub async fn get_resources(
        &self,
        resource_path: &str,
        _identity: &str,
    ) -> ProviderResult<Value> {
        self.ensure_initialized()?;
        let path = self.parse_path(resource_path, false)?;
        let collection = self.collection(path.resource_type())?;
        match path.resource_id() {
            Some(id) => collection.get_by_id(id).await,
            None => collection.get_all().await,
        }
    }

    /// Returns the single addressed resource deserialized into `T`.
    pub async fn get_resource<T: DeserializeOwned>(
        &self,
        resource_path: &str,
        _identity: &str,
    ) -> ProviderResult<T> {
        self.ensure_initialized()?;
        let path = self.parse_path(resource_path, false)?;
        let id = path.resource_id().ok_or_else(|| {
            ProviderError::validation("The resource path does not address a single resource.")
        })?;
        let value = self.collection(path.resource_type())?.get_by_id(id).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Creates or updates the addressed resource from its serialized
    /// definition.
    pub async fn upsert_resource(
        &self,
        resource_path: &str,
        serialized_resource: &str,
        identity: &str,
    ) -> ProviderResult<UpsertResult> {
        self.ensure_initialized()?;
        let path = self.parse_path(resource_path, false)?;
        let result = self
            .collection(path.resource_type())?
            .upsert(&path, serialized_resource, identity)
            .await?;
        self.publish_change(path.resource_type()).await;
        Ok(result)
    }

    /// Soft-deletes the addressed resource.
    pub async fn delete_resource(
        &self,
        resource_path: &str,
        _identity: &str,
    ) -> ProviderResult<()> {
        self.ensure_initialized()?;
        let path = self.parse_path(resource_path, false)?;
        let id = path.resource_id().ok_or_else(|| {
            ProviderError::validation("The resource path does not address a single resource.")
        })?;
        self.collection(path.resource_type())?.delete(id).await?;
        self.publish_change(path.resource_type()).await;
        Ok(())
    }

    /// Executes the action named by the resource path.
    pub async fn execute_action(
        &self,
        resource_path: &str,
        serialized_action: &str,
        identity: &str,
    ) -> ProviderResult<Value> {
        self.ensure_initialized()?;
        let path = self.parse_path(resource_path, true)?;
        let action = path.action().ok_or_else(|| {
            ProviderError::validation("The resource path does not address an action.")
        })?;
        let result = self
            .collection(path.resource_type())?
            .execute_action(action, path.resource_id(), serialized_action, identity)
            .await?;
        // Actions may rewrite the durable store; a spurious refresh on the
        // other replicas is harmless.
        self.publish_change(path.resource_type()).await;
        Ok(result)
    }

    /// Applies one change notification: refreshes the collection whose
    /// store file the subject names. Failures are logged and swallowed.
    pub async fn handle_event(&self, envelope: &EventEnvelope) {
        if envelope.subject.is_empty() {
            debug!(provider = self.name(), "ignoring event with empty subject");
            return;
        }
        let file_name = envelope.file_name();
        let Some(resource_type) = self.file_map.get(file_name) else {
            debug!(
                provider = self.name(),
                file = file_name,
                "ignoring event for an unknown store file"
            );
            return;
        };
        match self.collections[resource_type].refresh().await {
            Ok(()) => {
                info!(provider = self.name(), resource_type = %resource_type, "cache refreshed")
            }
            Err(err) => warn!(
                provider = self.name(),
                resource_type = %resource_type,
                error = %err,
                "cache refresh failed"
            ),
        }
    }
}
