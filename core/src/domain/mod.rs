//! Core domain models - the resource table the watch protocol mirrors

pub mod resource;

// Re-export commonly used types
pub use resource::{
	Annotation, AnnotationValue, Endpoint, EnvironmentVariable, ResourceId, ResourceSnapshot,
	ResourceTypeDescriptor,
};
