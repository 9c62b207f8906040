// Resource types managed by the vectorization resource provider

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::resource::{Resource, ResourceBase};

/// Type discriminators known to the vectorization resource provider.
pub mod vectorization_types {
    pub const TEXT_PARTITIONING_PROFILE: &str = "text-partitioning-profile";
    pub const TEXT_EMBEDDING_PROFILE: &str = "text-embedding-profile";
    pub const INDEXING_PROFILE: &str = "indexing-profile";
    pub const PIPELINE: &str = "vectorization-pipeline";
    pub const REQUEST: &str = "vectorization-request";

    /// Every profile discriminator.
    pub const PROFILES: &[&str] = &[
        TEXT_PARTITIONING_PROFILE,
        TEXT_EMBEDDING_PROFILE,
        INDEXING_PROFILE,
    ];
}

/// A vectorization profile: named settings for one stage of the
/// vectorization pipeline (partitioning, embedding or indexing).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizationProfile {
    #[serde(flatten)]
    pub base: ResourceBase,
    /// Stage-specific settings.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub settings: HashMap<String, String>,
    /// References into the platform configuration.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub configuration_references: HashMap<String, String>,
}

impl VectorizationProfile {
    /// Creates a profile with the given name and discriminator.
    pub fn new(name: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            base: ResourceBase::new(name, resource_type),
            settings: HashMap::new(),
            configuration_references: HashMap::new(),
        }
    }
}

impl Resource for VectorizationProfile {
    fn base(&self) -> &ResourceBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ResourceBase {
        &mut self.base
    }
}

/// A vectorization pipeline: a data source wired to a profile for each
/// stage, with an activation flag flipped through the activate/deactivate
/// actions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizationPipeline {
    #[serde(flatten)]
    pub base: ResourceBase,
    /// Whether the pipeline is currently active.
    #[serde(default)]
    pub active: bool,
    /// The object id of the data source feeding the pipeline.
    pub data_source_object_id: String,
    /// The object id of the text partitioning profile.
    pub text_partitioning_profile_object_id: String,
    /// The object id of the text embedding profile.
    pub text_embedding_profile_object_id: String,
    /// The object id of the indexing profile.
    pub indexing_profile_object_id: String,
}

impl VectorizationPipeline {
    /// Creates an inactive pipeline with the given name and profile wiring.
    pub fn new(
        name: impl Into<String>,
        data_source_object_id: impl Into<String>,
        text_partitioning_profile_object_id: impl Into<String>,
        text_embedding_profile_object_id: impl Into<String>,
        indexing_profile_object_id: impl Into<String>,
    ) -> Self {
        Self {
            base: ResourceBase::new(name, vectorization_types::PIPELINE),
            active: false,
            data_source_object_id: data_source_object_id.into(),
            text_partitioning_profile_object_id: text_partitioning_profile_object_id.into(),
            text_embedding_profile_object_id: text_embedding_profile_object_id.into(),
            indexing_profile_object_id: indexing_profile_object_id.into(),
        }
    }
}

impl Resource for VectorizationPipeline {
    fn base(&self) -> &ResourceBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ResourceBase {
        &mut self.base
    }
}

/// The processing state of a vectorization request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingState {
    New,
    InProgress,
    Completed,
    Failed,
}

impl Default for ProcessingState {
    fn default() -> Self {
        ProcessingState::New
    }
}

/// A long-lived vectorization request record.
///
/// Requests are not tracked through an index file; they are discovered by
/// listing the request records directory and live one file per request,
/// grouped into day folders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorizationRequest {
    #[serde(flatten)]
    pub base: ResourceBase,
    /// The identifier of the content to vectorize.
    pub content_identifier: String,
    /// The object id of the pipeline processing the request, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pipeline_object_id: Option<String>,
    /// The current processing state.
    #[serde(default)]
    pub processing_state: ProcessingState,
    /// The storage path of this request record, populated when the record
    /// is first persisted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_file_path: Option<String>,
    /// Errors accumulated while processing the request.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_messages: Vec<String>,
}

impl VectorizationRequest {
    /// Creates a new request for the given content.
    pub fn new(name: impl Into<String>, content_identifier: impl Into<String>) -> Self {
        Self {
            base: ResourceBase::new(name, vectorization_types::REQUEST),
            content_identifier: content_identifier.into(),
            pipeline_object_id: None,
            processing_state: ProcessingState::New,
            resource_file_path: None,
            error_messages: Vec::new(),
        }
    }
}

impl Resource for VectorizationRequest {
    fn base(&self) -> &ResourceBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut ResourceBase {
        &mut self.base
    }
}
