//! Test helper modules for integration tests

#![allow(dead_code)]

pub mod transport;

pub use transport::*;

use chrono::Utc;
use std::time::Duration;
use tokio::sync::broadcast;
use wd_core::domain::resource::{ResourceId, ResourceSnapshot, ResourceTypeDescriptor};
use wd_core::{ResourceChange, ResourceUpdate, WatchEvent};

/// Build a minimal resource snapshot for protocol tests.
pub fn resource(uid: &str, state: &str) -> ResourceSnapshot {
	ResourceSnapshot {
		id: ResourceId::new(uid, "executable"),
		display_name: uid.to_string(),
		state: state.to_string(),
		created_at: Utc::now(),
		expected_endpoint_count: 0,
		endpoints: vec![],
		environment: vec![],
		annotations: vec![],
	}
}

pub fn resource_id(uid: &str) -> ResourceId {
	ResourceId::new(uid, "executable")
}

pub fn initial_snapshot(resources: Vec<ResourceSnapshot>) -> ResourceUpdate {
	ResourceUpdate::InitialSnapshot {
		resources,
		resource_types: vec![ResourceTypeDescriptor {
			unique_name: "executable".to_string(),
			display_name: "Executable".to_string(),
		}],
	}
}

pub fn changes(changes: Vec<ResourceChange>) -> ResourceUpdate {
	ResourceUpdate::Changes { changes }
}

pub fn upsert(resource: ResourceSnapshot) -> ResourceChange {
	ResourceChange::Upsert { resource }
}

pub fn delete(uid: &str) -> ResourceChange {
	ResourceChange::Delete {
		id: resource_id(uid),
	}
}

/// Wait until an event of the given type arrives, skipping others.
pub async fn wait_for_event(
	subscriber: &mut broadcast::Receiver<WatchEvent>,
	event_type: &str,
) -> WatchEvent {
	tokio::time::timeout(Duration::from_secs(10), async {
		loop {
			let event = subscriber.recv().await.expect("event bus closed");
			if event.event_type() == event_type {
				return event;
			}
		}
	})
	.await
	.unwrap_or_else(|_| panic!("timed out waiting for {event_type}"))
}
