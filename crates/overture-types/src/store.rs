// Durable per-category store files

use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::resource::Keyed;

/// The durable, serialized form of one resource category: every
/// reference/resource of the category plus an optional default-resource
/// name.
///
/// The store file on durable storage must always reflect the full current
/// state of the in-memory cache for its category; it is rewritten in a
/// single write on every mutating operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceStore<T> {
    /// The resources or references of the category.
    pub resources: Vec<T>,
    /// The name of the category's default resource, if one is configured.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_resource_name: Option<String>,
}

impl<T> Default for ResourceStore<T> {
    fn default() -> Self {
        Self { resources: Vec::new(), default_resource_name: None }
    }
}

impl<T> ResourceStore<T>
where
    T: Keyed + Clone + Serialize + DeserializeOwned,
{
    /// Creates an empty store with no default resource.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a store from the current contents of a cache.
    pub fn from_cache<'a, I>(entries: I, default_resource_name: Option<String>) -> Self
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        Self {
            resources: entries.into_iter().cloned().collect(),
            default_resource_name,
        }
    }

    /// Consumes the store and returns its entries keyed by name.
    pub fn into_map(self) -> HashMap<String, T> {
        self.resources
            .into_iter()
            .map(|r| (r.key().to_string(), r))
            .collect()
    }
}
