//! Local mirror of the server's resource table
//!
//! Exactly one writer exists: the synchronizer's read loop. Everything else
//! observes the mirror through snapshot copies, never through shared mutable
//! access, so readers can never see a half-applied change batch.

use crate::domain::resource::{ResourceId, ResourceSnapshot, ResourceTypeDescriptor};
use crate::infra::wire::messages::ResourceChange;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct MirrorState {
	resources: HashMap<ResourceId, ResourceSnapshot>,
	resource_types: HashMap<String, ResourceTypeDescriptor>,
}

/// Keyed collection mirroring the publisher's resource table
#[derive(Debug, Default)]
pub struct ResourceMirror {
	state: RwLock<MirrorState>,
}

impl ResourceMirror {
	pub fn new() -> Self {
		Self::default()
	}

	/// Replace the entire mirror with an initial snapshot.
	pub async fn replace_all(
		&self,
		resources: Vec<ResourceSnapshot>,
		resource_types: Vec<ResourceTypeDescriptor>,
	) {
		let mut state = self.state.write().await;
		state.resources = resources
			.into_iter()
			.map(|resource| (resource.id.clone(), resource))
			.collect();
		state.resource_types = resource_types
			.into_iter()
			.map(|descriptor| (descriptor.unique_name.clone(), descriptor))
			.collect();
	}

	/// Apply a change batch in sequence order. Returns the number of changes
	/// applied (deletes of absent resources still count; they are no-ops,
	/// not errors).
	pub async fn apply_changes(&self, changes: Vec<ResourceChange>) -> usize {
		let mut state = self.state.write().await;
		let applied = changes.len();
		for change in changes {
			match change {
				ResourceChange::Upsert { resource } => {
					state.resources.insert(resource.id.clone(), resource);
				}
				ResourceChange::Delete { id } => {
					state.resources.remove(&id);
				}
			}
		}
		applied
	}

	/// Drop every entry, including type descriptors. Used when recovering
	/// from a gap during which deletions may have been missed.
	pub async fn clear(&self) {
		let mut state = self.state.write().await;
		state.resources.clear();
		state.resource_types.clear();
	}

	/// Snapshot copy of the current resource table.
	pub async fn snapshot(&self) -> HashMap<ResourceId, ResourceSnapshot> {
		self.state.read().await.resources.clone()
	}

	/// Look up a single resource by id.
	pub async fn get(&self, id: &ResourceId) -> Option<ResourceSnapshot> {
		self.state.read().await.resources.get(id).cloned()
	}

	/// Known type descriptors, keyed by unique name.
	pub async fn resource_types(&self) -> HashMap<String, ResourceTypeDescriptor> {
		self.state.read().await.resource_types.clone()
	}

	pub async fn len(&self) -> usize {
		self.state.read().await.resources.len()
	}

	pub async fn is_empty(&self) -> bool {
		self.state.read().await.resources.is_empty()
	}
}
