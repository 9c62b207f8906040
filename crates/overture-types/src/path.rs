// Resource path parsing and object id computation
//
// Resource paths address an operation's target:
//
//   /instances/{instance-id}/providers/{provider}/{type}[/{id}[/{action}]]
//
// The relative form `{type}[/{id}[/{action}]]` is also accepted; the
// instance id and provider name are then supplied by the engine when the
// object id is computed.

use overture_error::{ProviderError, ProviderResult};

const INSTANCE_TOKEN: &str = "instances";
const RESOURCE_PROVIDER_TOKEN: &str = "providers";

/// One resource type segment of a parsed path: the type name, an optional
/// resource identifier and an optional action name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTypeInstance {
    /// The resource type addressed by the path.
    pub resource_type: String,
    /// The resource identifier, when the path addresses a single resource.
    pub resource_id: Option<String>,
    /// The action name, when the path addresses an action.
    pub action: Option<String>,
}

/// A parsed resource identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourcePath {
    instance_id: Option<String>,
    provider: Option<String>,
    type_instance: ResourceTypeInstance,
}

impl ResourcePath {
    /// Parses a resource path, validating the provider and resource type
    /// against the engine's registration table.
    ///
    /// When `allow_action` is true the trailing path segment is the action
    /// name (an action path always carries one); otherwise the path must
    /// address a resource type or a single resource.
    pub fn parse(
        resource_path: &str,
        allowed_providers: &[String],
        allowed_resource_types: &[String],
        allow_action: bool,
    ) -> ProviderResult<Self> {
        let mut segments: Vec<&str> = resource_path
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        if segments.is_empty() {
            return Err(ProviderError::validation("The resource path is empty."));
        }

        let mut instance_id = None;
        let mut provider = None;

        if segments[0] == INSTANCE_TOKEN {
            if segments.len() < 2 {
                return Err(ProviderError::validation(
                    "The resource path is missing the instance identifier.",
                ));
            }
            instance_id = Some(segments[1].to_string());
            segments.drain(..2);

            if segments.first() == Some(&RESOURCE_PROVIDER_TOKEN) {
                if segments.len() < 2 {
                    return Err(ProviderError::validation(
                        "The resource path is missing the resource provider name.",
                    ));
                }
                let name = segments[1].to_string();
                if !allowed_providers.iter().any(|p| p == &name) {
                    return Err(ProviderError::conflict(format!(
                        "The resource provider {name} is not valid for this resource path."
                    )));
                }
                provider = Some(name);
                segments.drain(..2);
            }
        }

        if segments.is_empty() {
            return Err(ProviderError::validation(
                "The resource path does not contain a resource type.",
            ));
        }

        let resource_type = segments[0].to_string();
        if !allowed_resource_types.iter().any(|t| t == &resource_type) {
            return Err(ProviderError::conflict(format!(
                "The resource type {resource_type} is not supported."
            )));
        }
        let rest = &segments[1..];

        let type_instance = if allow_action {
            match rest {
                [action] => ResourceTypeInstance {
                    resource_type,
                    resource_id: None,
                    action: Some((*action).to_string()),
                },
                [id, action] => ResourceTypeInstance {
                    resource_type,
                    resource_id: Some((*id).to_string()),
                    action: Some((*action).to_string()),
                },
                _ => {
                    return Err(ProviderError::validation(
                        "The resource path does not contain an action name.",
                    ))
                }
            }
        } else {
            match rest {
                [] => ResourceTypeInstance {
                    resource_type,
                    resource_id: None,
                    action: None,
                },
                [id] => ResourceTypeInstance {
                    resource_type,
                    resource_id: Some((*id).to_string()),
                    action: None,
                },
                _ => {
                    return Err(ProviderError::validation(
                        "The resource path contains too many segments.",
                    ))
                }
            }
        };

        Ok(Self { instance_id, provider, type_instance })
    }

    /// The instance id carried by the path, when fully qualified.
    pub fn instance_id(&self) -> Option<&str> {
        self.instance_id.as_deref()
    }

    /// The provider name carried by the path, when fully qualified.
    pub fn provider(&self) -> Option<&str> {
        self.provider.as_deref()
    }

    /// The resource type instance of the path.
    pub fn type_instance(&self) -> &ResourceTypeInstance {
        &self.type_instance
    }

    /// The resource type addressed by the path.
    pub fn resource_type(&self) -> &str {
        &self.type_instance.resource_type
    }

    /// The resource identifier addressed by the path, if any.
    pub fn resource_id(&self) -> Option<&str> {
        self.type_instance.resource_id.as_deref()
    }

    /// The action addressed by the path, if any.
    pub fn action(&self) -> Option<&str> {
        self.type_instance.action.as_deref()
    }

    /// Whether the path addresses a resource type rather than a resource.
    pub fn is_resource_type_path(&self) -> bool {
        self.type_instance.resource_id.is_none()
    }

    /// Computes the object id of the addressed resource.
    ///
    /// The supplied instance id and provider name are used when the path
    /// was given in its relative form.
    pub fn object_id(&self, instance_id: &str, provider: &str) -> ProviderResult<String> {
        let resource_id = self.resource_id().ok_or_else(|| {
            ProviderError::validation(
                "An object id cannot be computed for a resource type path.",
            )
        })?;
        Ok(format!(
            "/instances/{}/providers/{}/{}/{}",
            self.instance_id.as_deref().unwrap_or(instance_id),
            self.provider.as_deref().unwrap_or(provider),
            self.type_instance.resource_type,
            resource_id
        ))
    }
}
