// Base shape shared by every persisted resource

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The fields every stored resource must carry.
///
/// `name` is unique within the resource-type scope and immutable after
/// creation. `object_id` is the hierarchical identifier assigned at upsert
/// time. `deleted` is the soft-delete tombstone: tombstoned resources are
/// excluded from listings and can never be resurrected by upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceBase {
    /// The unique name of the resource.
    pub name: String,
    /// The hierarchical object identifier, assigned at upsert time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    /// The type discriminator used for polymorphic deserialization.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// A human-readable display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// A description of the resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Soft-delete tombstone flag.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
    /// The identity that created the resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// The identity that last updated the resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
    /// The platform version the resource was last written with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

impl ResourceBase {
    /// Creates a new base with the given name and type discriminator.
    pub fn new(name: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            object_id: None,
            resource_type: resource_type.into(),
            display_name: None,
            description: None,
            deleted: false,
            created_by: None,
            updated_by: None,
            version: None,
        }
    }
}

/// Uniform access to the base fields of a concrete resource type.
///
/// Concrete resources embed `ResourceBase` with `#[serde(flatten)]` and
/// implement this trait so the generic engine can assign object ids and
/// audit fields without knowing the concrete type.
pub trait Resource:
    Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
    /// The embedded base fields.
    fn base(&self) -> &ResourceBase;

    /// Mutable access to the embedded base fields.
    fn base_mut(&mut self) -> &mut ResourceBase;

    /// The unique name of the resource.
    fn name(&self) -> &str {
        &self.base().name
    }

    /// The type discriminator of the resource.
    fn resource_type(&self) -> &str {
        &self.base().resource_type
    }

    /// Whether the resource is tombstoned.
    fn deleted(&self) -> bool {
        self.base().deleted
    }
}

/// Anything stored in a `ResourceStore` keyed by a unique name.
pub trait Keyed {
    /// The key under which the entry is cached and indexed.
    fn key(&self) -> &str;

    /// Whether the entry is tombstoned.
    fn is_tombstoned(&self) -> bool;
}

impl<T: Resource> Keyed for T {
    fn key(&self) -> &str {
        self.name()
    }

    fn is_tombstoned(&self) -> bool {
        self.deleted()
    }
}
