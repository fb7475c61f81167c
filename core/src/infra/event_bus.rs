//! Dedicated event bus for watch protocol observability
//!
//! Everything externally visible about the watch loop flows through here:
//! connection transitions, stream failures, liveness timeouts, mirror
//! replacement. The mirror itself never exposes partially-applied state, so
//! this bus is the only place recovery activity can be observed.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Events emitted by the synchronizer while a watch is running
///
/// Diagnostic signals only; subscribers cannot influence the protocol.
/// Liveness timeouts in particular are informational and do not imply the
/// stream failed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WatchEvent {
	/// A watch stream was established on a connection.
	Connected { address: String },

	/// An initial snapshot replaced the mirror contents.
	SnapshotApplied { resources: usize },

	/// A change batch was applied in order.
	ChangesApplied { applied: usize },

	/// The mirror was cleared before applying the first message after a
	/// gap, so no stale entry can survive a missed deletion.
	MirrorCleared,

	/// The stream broke or was aborted; the loop will back off and
	/// reconnect. `error_count` is the running count of consecutive
	/// failures feeding the backoff delay.
	StreamFailed { error_count: u32, reason: String },

	/// The watchdog saw no message of any kind within the liveness window.
	LivenessTimeout { silent_for_ms: u64 },

	/// The watch loop exited on cancellation.
	Stopped,
}

impl WatchEvent {
	/// Get a human-readable event type name
	pub fn event_type(&self) -> &str {
		match self {
			WatchEvent::Connected { .. } => "Connected",
			WatchEvent::SnapshotApplied { .. } => "SnapshotApplied",
			WatchEvent::ChangesApplied { .. } => "ChangesApplied",
			WatchEvent::MirrorCleared => "MirrorCleared",
			WatchEvent::StreamFailed { .. } => "StreamFailed",
			WatchEvent::LivenessTimeout { .. } => "LivenessTimeout",
			WatchEvent::Stopped => "Stopped",
		}
	}
}

/// Broadcast bus carrying [`WatchEvent`]s to any number of subscribers
///
/// Subscribing is optional; emitting with no subscribers is not an error.
/// Slow subscribers lag and drop old events rather than stalling the read
/// loop.
#[derive(Debug, Clone)]
pub struct WatchEventBus {
	sender: broadcast::Sender<WatchEvent>,
}

impl WatchEventBus {
	pub fn new() -> Self {
		Self::with_capacity(1024)
	}

	/// Create a bus with custom capacity (mainly for lag tests)
	pub fn with_capacity(capacity: usize) -> Self {
		let (sender, _) = broadcast::channel(capacity);
		Self { sender }
	}

	/// Emit an event to all subscribers
	///
	/// Returns the number of active subscribers that received the event.
	pub fn emit(&self, event: WatchEvent) -> usize {
		let event_type = event.event_type().to_string();
		match self.sender.send(event) {
			Ok(count) => {
				debug!(event_type = %event_type, subscribers = count, "watch event emitted");
				count
			}
			Err(_) => {
				debug!(event_type = %event_type, "watch event emitted but no subscribers");
				0
			}
		}
	}

	/// Subscribe to all future watch events
	pub fn subscribe(&self) -> broadcast::Receiver<WatchEvent> {
		self.sender.subscribe()
	}

	/// Get the number of active subscribers
	pub fn subscriber_count(&self) -> usize {
		self.sender.receiver_count()
	}
}

impl Default for WatchEventBus {
	fn default() -> Self {
		Self::new()
	}
}
