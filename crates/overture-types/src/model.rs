// Resource types managed by the model resource provider

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::resource::{Resource, ResourceBase};

/// Type discriminators known to the model resource provider.
pub mod model_types {
    pub const BASIC: &str = "basic";
    pub const COMPLETION: &str = "completion";
    pub const EMBEDDING: &str = "embedding";

    /// Every discriminator accepted for a model definition.
    pub const ALL: &[&str] = &[BASIC, COMPLETION, EMBEDDING];
}

/// The definition of an AI model available to the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelDefinition {
    #[serde(flatten)]
    pub base: ResourceBase,
    /// The object id of the endpoint serving the model.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_object_id: Option<String>,
    /// The deployment name of the model at its endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment_name: Option<String>,
    /// Default parameters passed to the model on every call.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub model_parameters: HashMap<String, serde_json::Value>,
}

impl ModelDefinition {
    /// Creates a model definition with the given name and discriminator.
    pub fn new(name: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            base: ResourceBase::new(name, resource_type),
            endpoint_object_id: None,
            deployment_name: None,
            model_parameters: HashMap::new(),
        }
    }
}

impl Resource for ModelDefinition {
    fn base(&self) -> &ResourceBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ResourceBase {
        &mut self.base
    }
}
