// Lightweight index entries pointing at full resource payloads

use serde::{Deserialize, Serialize};

use crate::resource::Keyed;

/// An index entry mapping a resource name to the storage location of its
/// full payload.
///
/// References are created on the first upsert of a resource, flipped to
/// `deleted` on delete, and never physically removed from the index during
/// normal operation (purge is a separate administrative action).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceReference {
    /// The unique name of the resource.
    pub name: String,
    /// The concrete subtype discriminator, used to pick the correct
    /// deserializer for the full resource.
    #[serde(rename = "type")]
    pub resource_type: String,
    /// The exact location of the full resource payload.
    pub storage_path: String,
    /// Soft-delete tombstone flag.
    #[serde(default)]
    pub deleted: bool,
}

impl ResourceReference {
    /// Creates a live reference for a resource stored at the given path.
    pub fn new(
        name: impl Into<String>,
        resource_type: impl Into<String>,
        storage_path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            resource_type: resource_type.into(),
            storage_path: storage_path.into(),
            deleted: false,
        }
    }
}

impl Keyed for ResourceReference {
    fn key(&self) -> &str {
        &self.name
    }

    fn is_tombstoned(&self) -> bool {
        self.deleted
    }
}
