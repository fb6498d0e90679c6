//! Model export and serialization module
//!
//! Persists the fitted pipeline as a checksummed binary artifact.

mod serializer;

pub use serializer::{load_model, save_model, ModelMetadata};
