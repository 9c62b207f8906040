// The vectorization resource provider
//
// Profiles and pipelines are small embedded categories persisted in one
// store file each under `/vectorization/`. Request records live in the
// `vectorization-state` container and are discovered by listing; they
// carry the `process` action handing a request to the processing
// collaborator, and pipelines carry `activate`/`deactivate`.

use std::sync::Arc;

use async_trait::async_trait;
use overture_error::{ProviderError, ProviderResult};
use overture_storage::StorageService;
use overture_types::vectorization::{
    vectorization_types, ProcessingState, VectorizationPipeline, VectorizationProfile,
    VectorizationRequest,
};
use overture_types::{ActionResult, InstanceSettings};
use serde_json::Value;

use crate::collection::{actions, CollectionAction, ProviderContext};
use crate::discovered_collection::{DiscoverableResource, DiscoveredCollection};
use crate::embedded_collection::EmbeddedCollection;
use crate::engine::ProviderEngine;
use crate::validation::{check_resource_type, ResourceValidator};

/// The name of the vectorization resource provider.
pub const PROVIDER_NAME: &str = "vectorization";
/// The resource types managed by the provider.
pub const TEXT_PARTITIONING_PROFILES: &str = "text-partitioning-profiles";
pub const TEXT_EMBEDDING_PROFILES: &str = "text-embedding-profiles";
pub const INDEXING_PROFILES: &str = "indexing-profiles";
pub const PIPELINES: &str = "pipelines";
pub const VECTORIZATION_REQUESTS: &str = "vectorization-requests";

const STATE_CONTAINER: &str = "vectorization-state";
const REQUESTS_DIRECTORY: &str = "requests";

impl DiscoverableResource for VectorizationRequest {
    fn resource_file_path(&self) -> Option<&str> {
        self.resource_file_path.as_deref()
    }

    fn set_resource_file_path(&mut self, path: String) {
        self.resource_file_path = Some(path);
    }
}

/// Hands accepted vectorization requests to the processing service.
#[async_trait]
pub trait RequestProcessor: Send + Sync {
    /// Submits a request for processing.
    async fn process(&self, request: &VectorizationRequest) -> ProviderResult<()>;
}

struct ProfileValidator {
    expected_type: &'static str,
    required_settings: &'static [&'static str],
}

#[async_trait]
impl ResourceValidator<VectorizationProfile> for ProfileValidator {
    async fn validate(&self, resource: &VectorizationProfile) -> Vec<String> {
        let mut messages =
            check_resource_type(&resource.base.resource_type, &[self.expected_type]);
        for key in self.required_settings {
            if !resource.settings.contains_key(*key) {
                messages.push(format!("The profile settings are missing the {key} entry."));
            }
        }
        messages
    }
}

struct PipelineValidator;

#[async_trait]
impl ResourceValidator<VectorizationPipeline> for PipelineValidator {
    async fn validate(&self, resource: &VectorizationPipeline) -> Vec<String> {
        let mut messages =
            check_resource_type(&resource.base.resource_type, &[vectorization_types::PIPELINE]);
        let wiring = [
            ("data source", &resource.data_source_object_id),
            ("text partitioning profile", &resource.text_partitioning_profile_object_id),
            ("text embedding profile", &resource.text_embedding_profile_object_id),
            ("indexing profile", &resource.indexing_profile_object_id),
        ];
        for (label, object_id) in wiring {
            if object_id.is_empty() {
                messages.push(format!("The pipeline is missing its {label} object id."));
            }
        }
        messages
    }
}

/// Flips a pipeline's activation flag and rewrites the store file.
struct PipelineActivation {
    active: bool,
}

#[async_trait]
impl CollectionAction<EmbeddedCollection<VectorizationPipeline>> for PipelineActivation {
    async fn execute(
        &self,
        collection: &EmbeddedCollection<VectorizationPipeline>,
        resource_id: Option<&str>,
        _serialized_action: &str,
        _identity: &str,
    ) -> ProviderResult<Value> {
        let id = resource_id.ok_or_else(|| {
            ProviderError::validation("Pipeline activation requires a pipeline identifier.")
        })?;
        let mut pipeline = collection.get_resource(id)?;
        pipeline.active = self.active;
        collection.update_and_persist(pipeline).await?;
        Ok(serde_json::to_value(ActionResult::success())?)
    }
}

/// Hands a new request record to the processing collaborator and marks it
/// in progress.
struct ProcessRequest {
    processor: Arc<dyn RequestProcessor>,
}

#[async_trait]
impl CollectionAction<DiscoveredCollection<VectorizationRequest>> for ProcessRequest {
    async fn execute(
        &self,
        collection: &DiscoveredCollection<VectorizationRequest>,
        resource_id: Option<&str>,
        _serialized_action: &str,
        identity: &str,
    ) -> ProviderResult<Value> {
        let id = resource_id.ok_or_else(|| {
            ProviderError::validation("The process action requires a request identifier.")
        })?;
        let mut request = collection.load_resource(id).await?;
        if request.processing_state != ProcessingState::New {
            return Err(ProviderError::conflict(format!(
                "The request {id} has already been submitted for processing."
            )));
        }
        self.processor.process(&request).await?;
        request.processing_state = ProcessingState::InProgress;
        collection.upsert_resource(Some(id), request, identity).await?;
        Ok(serde_json::to_value(ActionResult::success())?)
    }
}

fn profiles(
    context: &Arc<ProviderContext>,
    resource_type: &str,
    expected_type: &'static str,
    required_settings: &'static [&'static str],
) -> Arc<EmbeddedCollection<VectorizationProfile>> {
    Arc::new(
        EmbeddedCollection::new(
            Arc::clone(context),
            resource_type,
            format!("vectorization-{resource_type}.json"),
        )
        .with_validator(Arc::new(ProfileValidator { expected_type, required_settings })),
    )
}

/// Builds the vectorization resource provider over the given storage
/// backend and request processor.
pub fn vectorization_provider(
    instance: InstanceSettings,
    storage: Arc<dyn StorageService>,
    processor: Arc<dyn RequestProcessor>,
) -> ProviderEngine {
    let context = Arc::new(ProviderContext::new(
        PROVIDER_NAME,
        instance.clone(),
        Arc::clone(&storage),
    ));
    let state_context = Arc::new(
        ProviderContext::new(PROVIDER_NAME, instance, storage).with_container(STATE_CONTAINER),
    );

    let pipelines = EmbeddedCollection::<VectorizationPipeline>::new(
        Arc::clone(&context),
        PIPELINES,
        "vectorization-pipelines.json",
    )
    .with_validator(Arc::new(PipelineValidator))
    .with_action(actions::ACTIVATE, Arc::new(PipelineActivation { active: true }))
    .with_action(actions::DEACTIVATE, Arc::new(PipelineActivation { active: false }));

    let requests = DiscoveredCollection::<VectorizationRequest>::new(
        state_context,
        VECTORIZATION_REQUESTS,
        REQUESTS_DIRECTORY,
    )
    .with_action(actions::PROCESS, Arc::new(ProcessRequest { processor }));

    ProviderEngine::new(context.clone())
        .register(profiles(
            &context,
            TEXT_PARTITIONING_PROFILES,
            vectorization_types::TEXT_PARTITIONING_PROFILE,
            &[],
        ))
        .register(profiles(
            &context,
            TEXT_EMBEDDING_PROFILES,
            vectorization_types::TEXT_EMBEDDING_PROFILE,
            &[],
        ))
        .register(profiles(
            &context,
            INDEXING_PROFILES,
            vectorization_types::INDEXING_PROFILE,
            &["index_name"],
        ))
        .register(Arc::new(pipelines))
        .register(Arc::new(requests))
}
