//! Time source abstraction for liveness tracking
//!
//! Provides a trait-based abstraction over time sources, enabling
//! deterministic testing of deadline behavior without relying on system
//! time. Production code uses SystemTimeSource for actual wall-clock time,
//! while tests use FakeTimeSource for controlled, reproducible timing.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Abstracts the clock the liveness deadline is computed against
///
/// All implementations must be thread-safe (Send + Sync) since the deadline
/// is read by the watchdog task while the read loop re-arms it.
pub trait TimeSource: Send + Sync {
	/// Returns current time in milliseconds since Unix epoch
	fn current_time_ms(&self) -> u64;
}

/// Production time source using system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
	fn current_time_ms(&self) -> u64 {
		chrono::Utc::now().timestamp_millis() as u64
	}
}

/// Test time source with manual control
///
/// Provides deterministic time for tests. Uses AtomicU64 for thread-safety,
/// allowing a test to share one FakeTimeSource between the deadline and its
/// assertions while controlling time progression.
#[derive(Debug, Clone)]
pub struct FakeTimeSource {
	time: Arc<AtomicU64>,
}

impl Default for FakeTimeSource {
	fn default() -> Self {
		Self::new(1000)
	}
}

impl FakeTimeSource {
	/// Create new fake time source at specified timestamp
	pub fn new(initial_ms: u64) -> Self {
		Self {
			time: Arc::new(AtomicU64::new(initial_ms)),
		}
	}

	/// Advance time by delta milliseconds
	pub fn advance(&self, delta_ms: u64) {
		self.time.fetch_add(delta_ms, Ordering::SeqCst);
	}

	/// Set time to a specific value
	pub fn set(&self, time_ms: u64) {
		self.time.store(time_ms, Ordering::SeqCst);
	}

	/// Get current fake time
	pub fn get(&self) -> u64 {
		self.time.load(Ordering::SeqCst)
	}
}

impl TimeSource for FakeTimeSource {
	fn current_time_ms(&self) -> u64 {
		self.time.load(Ordering::SeqCst)
	}
}
