//! Entity metadata
//!
//! External [`EntityDescriptor`]s are compiled once into immutable
//! [`EntityMetadata`] and shared through the [`MetadataRegistry`].

pub mod models;
pub mod registry;

pub use models::{EntityDescriptor, EntityMetadata, FieldDescriptor, FieldSpec, OperationSet};
pub use registry::MetadataRegistry;
