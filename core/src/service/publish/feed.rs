//! Simulated resource feed
//!
//! Source of truth behind the publisher. Each watcher gets its own feed
//! instance, so there is no shared mutable state between watchers; the feed
//! owns a private resource table and mutates it on every tick.

use crate::config::PublishConfig;
use crate::domain::resource::{
	Annotation, AnnotationValue, Endpoint, EnvironmentVariable, ResourceId, ResourceSnapshot,
	ResourceTypeDescriptor,
};
use crate::infra::wire::messages::ResourceChange;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;

const RESOURCE_NAMES: &[&str] = &["api", "worker", "cache", "postgres", "frontend", "migrator"];
const RESOURCE_TYPES: &[&str] = &["executable", "container"];
const LIFECYCLE_STATES: &[&str] = &["Starting", "Running", "Degraded", "Stopped"];

/// Generates the resource table one watcher observes
pub struct ResourceFeed {
	rng: StdRng,
	resources: HashMap<ResourceId, ResourceSnapshot>,
	spawned: u64,
}

impl ResourceFeed {
	pub fn new(config: &PublishConfig) -> Self {
		let rng = match config.feed_seed {
			Some(seed) => StdRng::seed_from_u64(seed),
			None => StdRng::from_entropy(),
		};
		Self {
			rng,
			resources: HashMap::new(),
			spawned: 0,
		}
	}

	/// Populate the table and return the complete initial state.
	pub fn initial(
		&mut self,
		count: usize,
	) -> (Vec<ResourceSnapshot>, Vec<ResourceTypeDescriptor>) {
		for _ in 0..count {
			let resource = self.spawn_resource();
			self.resources.insert(resource.id.clone(), resource);
		}

		let mut resources: Vec<_> = self.resources.values().cloned().collect();
		// Stable order keeps seeded runs comparable.
		resources.sort_by(|a, b| a.id.uid.cmp(&b.id.uid));

		(resources, Self::type_descriptors())
	}

	/// Mutate the table once and describe the mutation as a change batch.
	pub fn next_batch(&mut self) -> Vec<ResourceChange> {
		if self.resources.is_empty() {
			let resource = self.spawn_resource();
			self.resources.insert(resource.id.clone(), resource.clone());
			return vec![ResourceChange::Upsert { resource }];
		}

		match self.rng.gen_range(0..100u32) {
			// Mostly lifecycle churn on an existing resource.
			0..=69 => self.flip_state(),
			70..=84 => {
				let resource = self.spawn_resource();
				self.resources.insert(resource.id.clone(), resource.clone());
				vec![ResourceChange::Upsert { resource }]
			}
			_ => {
				// Keep at least one resource alive.
				if self.resources.len() < 2 {
					return self.flip_state();
				}
				let id = self.pick_id();
				self.resources.remove(&id);
				vec![ResourceChange::Delete { id }]
			}
		}
	}

	fn flip_state(&mut self) -> Vec<ResourceChange> {
		let id = self.pick_id();
		let mut resource = self.resources[&id].clone();
		resource.state =
			LIFECYCLE_STATES[self.rng.gen_range(0..LIFECYCLE_STATES.len())].to_string();
		self.resources.insert(id, resource.clone());
		vec![ResourceChange::Upsert { resource }]
	}

	/// Current table contents (test observability).
	pub fn resources(&self) -> &HashMap<ResourceId, ResourceSnapshot> {
		&self.resources
	}

	fn type_descriptors() -> Vec<ResourceTypeDescriptor> {
		RESOURCE_TYPES
			.iter()
			.map(|name| ResourceTypeDescriptor {
				unique_name: (*name).to_string(),
				display_name: {
					let mut chars = name.chars();
					match chars.next() {
						Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
						None => String::new(),
					}
				},
			})
			.collect()
	}

	fn pick_id(&mut self) -> ResourceId {
		let mut ids: Vec<_> = self.resources.keys().cloned().collect();
		ids.sort_by(|a, b| a.uid.cmp(&b.uid));
		ids.swap_remove(self.rng.gen_range(0..ids.len()))
	}

	fn spawn_resource(&mut self) -> ResourceSnapshot {
		self.spawned += 1;
		let name = RESOURCE_NAMES[self.rng.gen_range(0..RESOURCE_NAMES.len())];
		let resource_type = RESOURCE_TYPES[self.rng.gen_range(0..RESOURCE_TYPES.len())];
		let uid = format!("{name}-{:04}", self.spawned);
		let port: u16 = self.rng.gen_range(3000..9000);

		ResourceSnapshot {
			id: ResourceId::new(uid.clone(), resource_type),
			display_name: name.to_string(),
			state: "Starting".to_string(),
			created_at: Utc::now(),
			expected_endpoint_count: 2,
			endpoints: vec![
				Endpoint {
					name: "http".to_string(),
					http_address: Some(format!("http://localhost:{port}")),
					allocated_address: None,
					allocated_port: None,
				},
				Endpoint {
					name: "internal".to_string(),
					http_address: None,
					allocated_address: Some("localhost".to_string()),
					allocated_port: Some(port),
				},
			],
			environment: vec![
				EnvironmentVariable {
					name: "SERVICE_NAME".to_string(),
					value: name.to_string(),
				},
				EnvironmentVariable {
					name: "LOG_LEVEL".to_string(),
					value: "info".to_string(),
				},
			],
			annotations: vec![
				Annotation {
					namespace: "deploy".to_string(),
					name: "instance".to_string(),
					value: AnnotationValue::Scalar(uid),
				},
				Annotation {
					namespace: "deploy".to_string(),
					name: "profiles".to_string(),
					value: AnnotationValue::List(vec![
						"default".to_string(),
						"dev".to_string(),
					]),
				},
			],
		}
	}
}
