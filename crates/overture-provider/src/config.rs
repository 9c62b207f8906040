// Deployment configuration for the resource providers
//
// A deployment is described by a small TOML file carrying the instance
// settings and the storage root. Malformed or unreadable configuration
// surfaces as a configuration failure before any provider comes up.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use overture_error::{ProviderError, ProviderResult};
use overture_storage::{FileStorageService, StorageService};
use overture_types::InstanceSettings;
use serde::Deserialize;

/// Deployment configuration shared by every provider of an instance.
///
/// ```toml
/// [instance]
/// id = "inst-1"
/// version = "0.9.1"
///
/// [storage]
/// root = "/var/lib/overture"
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// The deployment instance settings.
    pub instance: InstanceSettings,
    /// The durable storage configuration.
    pub storage: StorageConfig,
}

/// Filesystem storage backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// The directory containers are created under.
    pub root: PathBuf,
}

impl EngineConfig {
    /// Parses a configuration from its TOML representation.
    pub fn from_toml(content: &str) -> ProviderResult<Self> {
        toml::from_str(content).map_err(|e| {
            ProviderError::configuration(format!("Invalid engine configuration: {e}"))
        })
    }

    /// Loads a configuration from a TOML file.
    pub async fn load(path: &Path) -> ProviderResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            ProviderError::configuration(format!(
                "Failed to read the engine configuration at {}: {e}",
                path.display()
            ))
        })?;
        Self::from_toml(&content)
    }

    /// Builds the storage backend described by the configuration.
    pub fn storage(&self) -> Arc<dyn StorageService> {
        Arc::new(FileStorageService::new(self.storage.root.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_complete_configuration() {
        let config = EngineConfig::from_toml(
            r#"
            [instance]
            id = "inst-1"
            version = "0.9.1"

            [storage]
            root = "/var/lib/overture"
            "#,
        )
        .unwrap();

        assert_eq!(config.instance.id, "inst-1");
        assert_eq!(config.storage.root, PathBuf::from("/var/lib/overture"));
    }

    #[test]
    fn missing_sections_are_configuration_failures() {
        let err = EngineConfig::from_toml("[instance]\nid = \"inst-1\"").unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }
}
