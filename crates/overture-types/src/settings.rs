// Instance-wide settings

use serde::{Deserialize, Serialize};

/// Settings shared by every resource provider running in a deployment
/// instance. Typically loaded from the deployment's TOML configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceSettings {
    /// The unique identifier of the deployment instance. Part of every
    /// object id assigned by a resource provider.
    pub id: String,
    /// The platform version, stamped on resources at upsert time.
    pub version: String,
}

impl InstanceSettings {
    /// Creates settings with the given instance id and version.
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self { id: id.into(), version: version.into() }
    }
}

impl Default for InstanceSettings {
    fn default() -> Self {
        Self { id: "local".to_string(), version: env!("CARGO_PKG_VERSION").to_string() }
    }
}
