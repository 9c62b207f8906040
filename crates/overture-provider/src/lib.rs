// Overture resource provider engine
//
// A resource provider keeps a process-local cache of named, versioned
// configuration resources consistent with a durable object-storage backend
// and propagates changes across service replicas through a publish/subscribe
// event feed.
//
// The engine is generic: a provider is a registration table mapping resource
// type names to typed collections, supplied at construction. The concrete
// providers (model definitions, vectorization) are plain constructor
// functions in the `providers` module.

pub mod collection;
pub mod config;
pub mod discovered_collection;
pub mod embedded_collection;
pub mod engine;
pub mod events;
pub mod providers;
pub mod reference_collection;
pub mod validation;

pub use collection::{actions, CollectionAction, ProviderContext, ResourceCollection};
pub use config::{EngineConfig, StorageConfig};
pub use discovered_collection::{DiscoverableResource, DiscoveredCollection};
pub use embedded_collection::EmbeddedCollection;
pub use engine::ProviderEngine;
pub use events::{EventBridge, EventEnvelope, EventService, InMemoryEventService};
pub use reference_collection::ReferenceCollection;
pub use validation::ResourceValidator;
