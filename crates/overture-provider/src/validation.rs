// Validation seam for resource definitions

use async_trait::async_trait;
use overture_types::Resource;

/// Validates a typed resource before it is persisted.
///
/// A validator returns the full list of problems found with the resource;
/// an empty list means the resource is valid. The engine aggregates the
/// messages into a single validation failure.
#[async_trait]
pub trait ResourceValidator<T: Resource>: Send + Sync {
    /// Validates the resource, returning every validation message.
    async fn validate(&self, resource: &T) -> Vec<String>;
}

/// Checks a resource name against the platform naming rules: non-empty,
/// alphanumeric plus `-` and `_`.
pub fn check_resource_name(name: &str) -> Vec<String> {
    let mut messages = Vec::new();
    if name.is_empty() {
        messages.push("The resource name must not be empty.".to_string());
    } else if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        messages.push(format!(
            "The resource name {name} contains characters other than letters, digits, '-' and '_'."
        ));
    }
    messages
}

/// Checks a type discriminator against the category's known types.
pub fn check_resource_type(resource_type: &str, known_types: &[&str]) -> Vec<String> {
    if known_types.contains(&resource_type) {
        Vec::new()
    } else {
        vec![format!("The resource type {resource_type} is not a known type.")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names_pass() {
        assert!(check_resource_name("profile-1").is_empty());
        assert!(check_resource_name("Profile_2").is_empty());
    }

    #[test]
    fn invalid_names_are_reported() {
        assert_eq!(check_resource_name("").len(), 1);
        assert_eq!(check_resource_name("bad name").len(), 1);
        assert_eq!(check_resource_name("bad/name").len(), 1);
    }

    #[test]
    fn unknown_types_are_reported() {
        assert!(check_resource_type("basic", &["basic", "completion"]).is_empty());
        assert_eq!(check_resource_type("exotic", &["basic"]).len(), 1);
    }
}
