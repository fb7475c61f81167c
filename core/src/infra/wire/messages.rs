//! Watch protocol messages
//!
//! Defines the message types exchanged on a watch stream:
//! - Client opens the stream with a [`WatchRequest`]
//! - Server answers with exactly one initial snapshot
//! - Server then interleaves change batches and heartbeats until the
//!   consumer cancels

use crate::domain::resource::{ResourceId, ResourceSnapshot, ResourceTypeDescriptor};
use serde::{Deserialize, Serialize};

/// Client → Server: open a watch stream
///
/// `is_reconnect` is always sent as `false`; the protocol has no resume
/// cursor, so every reconnect requests a full resync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchRequest {
	pub is_reconnect: bool,
}

impl Default for WatchRequest {
	fn default() -> Self {
		Self {
			is_reconnect: false,
		}
	}
}

/// Server → Client: one message on the watch stream
///
/// Discriminated union; exactly one variant per message. Unknown
/// discriminants deserialize to [`ResourceUpdate::Unsupported`], which the
/// synchronizer treats as a protocol violation and never partially applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceUpdate {
	/// Complete current resource set plus the known type descriptors.
	/// Always the first message of a stream; replaces the mirror wholesale.
	InitialSnapshot {
		resources: Vec<ResourceSnapshot>,
		resource_types: Vec<ResourceTypeDescriptor>,
	},

	/// Ordered batch of incremental mutations, applied in sequence order.
	Changes { changes: Vec<ResourceChange> },

	/// Liveness signal. The server commits to never letting the gap between
	/// two consecutive messages of any kind exceed `interval_ms` under
	/// normal operation.
	Heartbeat { interval_ms: u64 },

	/// Catch-all for message kinds introduced after this client was built.
	#[serde(other)]
	Unsupported,
}

impl ResourceUpdate {
	/// Get a human-readable message kind name
	pub fn kind(&self) -> &'static str {
		match self {
			ResourceUpdate::InitialSnapshot { .. } => "InitialSnapshot",
			ResourceUpdate::Changes { .. } => "Changes",
			ResourceUpdate::Heartbeat { .. } => "Heartbeat",
			ResourceUpdate::Unsupported => "Unsupported",
		}
	}

	/// Check if applying this message mutates the mirror
	pub fn mutates_mirror(&self) -> bool {
		matches!(
			self,
			ResourceUpdate::InitialSnapshot { .. } | ResourceUpdate::Changes { .. }
		)
	}
}

/// One incremental mutation within a change batch
///
/// Upsert carries the full replacement snapshot; Delete carries only the id.
/// Ordering matters per resource id, so batches are never reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ResourceChange {
	Upsert { resource: ResourceSnapshot },
	Delete { id: ResourceId },
}

impl ResourceChange {
	/// Get the id of the resource this change targets
	pub fn resource_id(&self) -> &ResourceId {
		match self {
			ResourceChange::Upsert { resource } => &resource.id,
			ResourceChange::Delete { id } => id,
		}
	}
}
