// The model resource provider
//
// Manages AI model definitions through a reference-indexed collection:
// the index lives at `/model/_model-references.json` and each definition
// in its own payload file next to it.

use std::sync::Arc;

use async_trait::async_trait;
use overture_storage::StorageService;
use overture_types::model::{model_types, ModelDefinition};
use overture_types::InstanceSettings;

use crate::collection::ProviderContext;
use crate::engine::ProviderEngine;
use crate::reference_collection::ReferenceCollection;
use crate::validation::{check_resource_type, ResourceValidator};

/// The name of the model resource provider.
pub const PROVIDER_NAME: &str = "model";
/// The resource type managed by the provider.
pub const MODELS: &str = "models";

const MODEL_REFERENCES_FILE: &str = "_model-references.json";

struct ModelDefinitionValidator;

#[async_trait]
impl ResourceValidator<ModelDefinition> for ModelDefinitionValidator {
    async fn validate(&self, resource: &ModelDefinition) -> Vec<String> {
        let mut messages = check_resource_type(&resource.base.resource_type, model_types::ALL);
        if let Some(deployment_name) = &resource.deployment_name {
            if deployment_name.is_empty() {
                messages.push("The deployment name must not be empty.".to_string());
            }
        }
        messages
    }
}

/// Builds the model resource provider over the given storage backend.
pub fn model_provider(
    instance: InstanceSettings,
    storage: Arc<dyn StorageService>,
) -> ProviderEngine {
    let context = Arc::new(ProviderContext::new(PROVIDER_NAME, instance, storage));
    let models = ReferenceCollection::<ModelDefinition>::new(
        Arc::clone(&context),
        MODELS,
        MODEL_REFERENCES_FILE,
    )
    .with_validator(Arc::new(ModelDefinitionValidator));

    ProviderEngine::new(context).register(Arc::new(models))
}
