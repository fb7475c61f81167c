//! Watch and publish configuration
//!
//! Plain value structs threaded through constructors as `Arc<_>`. There is
//! no config file; the protocol keeps no persisted state.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// What the watchdog does when the liveness window elapses
///
/// Detecting a broken stream reliably means "a read failed", not "a timer
/// expired", so the default keeps the timeout purely diagnostic. `Reconnect`
/// additionally aborts the stream so the ordinary failure path (error count,
/// backoff, full resync) runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LivenessAction {
	Observe,
	Reconnect,
}

/// Client-side watch loop configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchConfig {
	/// Multiplier applied to the advertised heartbeat interval when deriving
	/// the liveness deadline. Absorbs jitter and one missed beat.
	pub liveness_tolerance: u64,

	/// Liveness window used before the first heartbeat arrives.
	pub initial_liveness_timeout_ms: u64,

	/// How often the watchdog checks the deadline.
	pub watchdog_poll_interval_ms: u64,

	/// Cap on the exponential reconnect backoff.
	pub max_backoff_secs: u64,

	pub liveness_action: LivenessAction,
}

impl Default for WatchConfig {
	fn default() -> Self {
		Self {
			liveness_tolerance: 5,
			initial_liveness_timeout_ms: 30_000,
			watchdog_poll_interval_ms: 1_000,
			max_backoff_secs: 15,
			liveness_action: LivenessAction::Observe,
		}
	}
}

impl WatchConfig {
	pub fn watchdog_poll_interval(&self) -> Duration {
		Duration::from_millis(self.watchdog_poll_interval_ms)
	}

	pub fn max_backoff(&self) -> Duration {
		Duration::from_secs(self.max_backoff_secs)
	}
}

/// Server-side publisher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishConfig {
	/// Interval advertised in heartbeats. The publisher guarantees no gap
	/// between consecutive messages larger than this under normal operation;
	/// the heartbeat producer alone satisfies the bound, independent of
	/// mutation cadence.
	pub heartbeat_interval_ms: u64,

	/// How often the simulated feed emits a mutation batch.
	pub change_interval_ms: u64,

	/// Size of the resource table the feed starts with.
	pub initial_resources: usize,

	/// Bound on the outbound write path. Producers are never blocked by
	/// this; only the drain loop waits on a slow consumer.
	pub outbound_buffer: usize,

	/// Fixed RNG seed for the simulated feed. `None` seeds from entropy.
	pub feed_seed: Option<u64>,
}

impl Default for PublishConfig {
	fn default() -> Self {
		Self {
			heartbeat_interval_ms: 5_000,
			change_interval_ms: 3_000,
			initial_resources: 2,
			outbound_buffer: 16,
			feed_seed: None,
		}
	}
}

impl PublishConfig {
	pub fn heartbeat_interval(&self) -> Duration {
		Duration::from_millis(self.heartbeat_interval_ms)
	}

	pub fn change_interval(&self) -> Duration {
		Duration::from_millis(self.change_interval_ms)
	}
}
