// Concrete resource providers built on the generic engine

pub mod model;
pub mod vectorization;

pub use model::model_provider;
pub use vectorization::{vectorization_provider, RequestProcessor};
