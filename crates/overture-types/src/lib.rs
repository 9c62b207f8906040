// Core type definitions for the Overture resource provider platform
//
// Every resource managed by a provider shares the same base shape
// (`ResourceBase`), is tracked through a lightweight index entry
// (`ResourceReference`), persisted through a per-category store file
// (`ResourceStore`), and addressed through a hierarchical resource path
// (`ResourcePath`).

pub mod actions;
pub mod model;
pub mod path;
pub mod reference;
pub mod resource;
pub mod settings;
pub mod store;
pub mod vectorization;

pub use actions::{
    ActionResult, NameCheckResult, NameCheckStatus, ResourceFilter, ResourceName, UpsertResult,
};
pub use path::{ResourcePath, ResourceTypeInstance};
pub use reference::ResourceReference;
pub use resource::{Keyed, Resource, ResourceBase};
pub use settings::InstanceSettings;
pub use store::ResourceStore;
