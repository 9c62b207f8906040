// Overture error handling framework
// Central location for the error types shared by the resource provider crates

use std::fmt;
use thiserror::Error;

// Re-export common error handling tools for convenience
pub use anyhow;
pub use thiserror;

/// Result type for durable storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Result type for resource provider operations
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Errors raised by the durable storage collaborators.
///
/// Storage failures are not retried inside the engine; they propagate to the
/// caller as `ProviderError::Storage`.
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("The file {0} was not found")]
    FileNotFound(String),
    #[error("The container {0} was not found")]
    ContainerNotFound(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Errors raised by the resource provider engine.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The requested resource is missing or has been tombstoned.
    #[error("The resource {0} was not found")]
    NotFound(String),

    /// The resource definition was malformed or rejected by a validator.
    /// Carries every validation message gathered for the resource.
    #[error("Validation failed: {}", messages.join(", "))]
    Validation { messages: Vec<String> },

    /// Name/path mismatch, attempted resurrection of a tombstoned resource,
    /// or an unsupported resource type or action for this provider.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Durable I/O failure, surfaced to the caller unchanged.
    #[error("Storage failure: {0}")]
    Storage(#[from] StorageError),

    /// The provider is misconfigured for the requested operation, e.g. a
    /// default-resource action on a category with no configured default.
    #[error("Configuration failure: {0}")]
    Configuration(String),

    /// A payload could not be serialized or deserialized.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ProviderError {
    /// Creates a `NotFound` error for the given resource identifier.
    pub fn not_found(resource: impl fmt::Display) -> Self {
        ProviderError::NotFound(resource.to_string())
    }

    /// Creates a `Validation` error from a single message.
    pub fn validation(message: impl Into<String>) -> Self {
        ProviderError::Validation { messages: vec![message.into()] }
    }

    /// Creates a `Validation` error aggregating several messages.
    pub fn validation_messages(messages: Vec<String>) -> Self {
        ProviderError::Validation { messages }
    }

    /// Creates a `Conflict` error with the given message.
    pub fn conflict(message: impl Into<String>) -> Self {
        ProviderError::Conflict(message.into())
    }

    /// Creates a `Configuration` error with the given message.
    pub fn configuration(message: impl Into<String>) -> Self {
        ProviderError::Configuration(message.into())
    }

    /// True when the error maps to a client-facing not-found response.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::NotFound(_))
    }

    /// True when the error is recoverable at the API boundary (4xx-class),
    /// as opposed to storage failures which surface as 5xx-class.
    pub fn is_client_error(&self) -> bool {
        !matches!(self, ProviderError::Storage(_))
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::Serialization(err.to_string())
    }
}
