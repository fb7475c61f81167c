//! Watch loop counters for observability

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic counters tracking watch loop activity
///
/// All counters are monotonic over the life of a synchronizer, across
/// reconnects.
#[derive(Debug, Default)]
pub struct WatchMetrics {
	pub connects: AtomicU64,
	pub stream_failures: AtomicU64,
	pub resyncs: AtomicU64,
	pub snapshots_applied: AtomicU64,
	pub changes_applied: AtomicU64,
	pub heartbeats: AtomicU64,
	pub liveness_timeouts: AtomicU64,
}

impl WatchMetrics {
	/// Point-in-time copy of all counters.
	pub fn snapshot(&self) -> WatchMetricsSnapshot {
		WatchMetricsSnapshot {
			connects: self.connects.load(Ordering::Relaxed),
			stream_failures: self.stream_failures.load(Ordering::Relaxed),
			resyncs: self.resyncs.load(Ordering::Relaxed),
			snapshots_applied: self.snapshots_applied.load(Ordering::Relaxed),
			changes_applied: self.changes_applied.load(Ordering::Relaxed),
			heartbeats: self.heartbeats.load(Ordering::Relaxed),
			liveness_timeouts: self.liveness_timeouts.load(Ordering::Relaxed),
		}
	}
}

/// Serializable snapshot of [`WatchMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchMetricsSnapshot {
	pub connects: u64,
	pub stream_failures: u64,
	pub resyncs: u64,
	pub snapshots_applied: u64,
	pub changes_applied: u64,
	pub heartbeats: u64,
	pub liveness_timeouts: u64,
}
