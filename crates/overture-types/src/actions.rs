// Argument and result types for resource provider actions

use serde::{Deserialize, Serialize};

/// The result of an upsert operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpsertResult {
    /// The object id assigned to the resource.
    pub object_id: String,
    /// Whether the upsert updated an existing resource.
    pub resource_exists: bool,
}

/// The argument of the `check-name` action: a proposed resource name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceName {
    /// The proposed name.
    pub name: String,
    /// The proposed type discriminator, if known.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
}

/// The outcome of a name check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NameCheckStatus {
    /// The name is available.
    Allowed,
    /// The name collides with an existing or previously deleted resource.
    Denied,
}

/// The result of the `check-name` action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NameCheckResult {
    /// The checked name.
    pub name: String,
    /// The checked type discriminator, if one was supplied.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,
    /// Whether the name may be used.
    pub status: NameCheckStatus,
    /// An explanation when the name is denied.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// The argument of the `filter` action.
///
/// `default: Some(true)` selects only the category's default resource;
/// `Some(false)` selects everything but the default; `None` selects every
/// non-deleted resource.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceFilter {
    /// Filter on the category's default resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<bool>,
}

/// The result of an action that has no payload of its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    /// Whether the action succeeded.
    pub is_success: bool,
    /// The error message, when the action failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl ActionResult {
    /// A successful action result.
    pub fn success() -> Self {
        Self { is_success: true, error_message: None }
    }
}
