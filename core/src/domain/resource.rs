//! Resource model for the watch protocol
//!
//! A resource is one unit tracked by the mirror: a process, container or
//! managed service owned by the application host. Snapshots are value types;
//! every delta replaces the whole snapshot for a resource, fields are never
//! patched individually.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity of a resource across its lifetime
///
/// Compound key of type tag plus unique id. Immutable once assigned; two
/// resources of different types may share a `uid` without colliding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
	pub uid: String,
	pub resource_type: String,
}

impl ResourceId {
	pub fn new(uid: impl Into<String>, resource_type: impl Into<String>) -> Self {
		Self {
			uid: uid.into(),
			resource_type: resource_type.into(),
		}
	}
}

impl std::fmt::Display for ResourceId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}/{}", self.resource_type, self.uid)
	}
}

/// Full state of one resource at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
	pub id: ResourceId,
	pub display_name: String,

	/// Free-form lifecycle state ("Starting", "Running", "Failed", ...)
	pub state: String,

	pub created_at: DateTime<Utc>,

	/// How many endpoints this resource is expected to expose once ready.
	/// May differ from `endpoints.len()` while the resource is starting.
	pub expected_endpoint_count: u32,

	pub endpoints: Vec<Endpoint>,
	pub environment: Vec<EnvironmentVariable>,
	pub annotations: Vec<Annotation>,
}

/// A network endpoint exposed by a resource
///
/// Either a resolved HTTP address or an allocated host/port pair, depending
/// on how far along the resource is in its lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Endpoint {
	pub name: String,
	pub http_address: Option<String>,
	pub allocated_address: Option<String>,
	pub allocated_port: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentVariable {
	pub name: String,
	pub value: String,
}

/// Namespaced key/value annotation attached to a resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
	pub namespace: String,
	pub name: String,
	pub value: AnnotationValue,
}

/// Annotation payload, a single scalar or a list of scalars
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotationValue {
	Scalar(String),
	List(Vec<String>),
}

/// Descriptor for a known resource type
///
/// Carried in the initial snapshot so a presentation layer can label
/// resources it has never seen before.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTypeDescriptor {
	pub unique_name: String,
	pub display_name: String,
}
