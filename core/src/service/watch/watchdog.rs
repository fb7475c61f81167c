//! Liveness watchdog
//!
//! Tracks the deadline by which the next stream message must arrive and
//! watches it from a task running alongside the read loop. The watchdog only
//! ever reads the deadline; it never touches the mirror. A timeout is a
//! diagnostic signal, not a stream failure: broken streams are detected by a
//! failed read, not by an expired timer. The optional reconnect action
//! cancels the epoch token so the normal failure path runs instead of adding
//! a second recovery mechanism.

use crate::config::{LivenessAction, WatchConfig};
use crate::infra::event_bus::{WatchEvent, WatchEventBus};
use crate::infra::time_source::TimeSource;
use crate::service::watch::metrics::WatchMetrics;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::warn;

struct DeadlineState {
	window_ms: AtomicU64,
	deadline_ms: AtomicU64,
	fired: AtomicBool,
}

/// Deadline shared between the read loop (writer) and the watchdog (reader)
///
/// Times are milliseconds on the injected [`TimeSource`] clock, so tests can
/// drive expiry deterministically.
#[derive(Clone)]
pub struct LivenessDeadline {
	state: Arc<DeadlineState>,
	time: Arc<dyn TimeSource>,
}

impl LivenessDeadline {
	/// Arm the deadline with the window used before the first heartbeat.
	pub fn arm(time: Arc<dyn TimeSource>, initial_window_ms: u64) -> Self {
		let deadline_ms = time.current_time_ms() + initial_window_ms;
		Self {
			state: Arc::new(DeadlineState {
				window_ms: AtomicU64::new(initial_window_ms),
				deadline_ms: AtomicU64::new(deadline_ms),
				fired: AtomicBool::new(false),
			}),
			time,
		}
	}

	/// Restart the timer using the current window. Called for every
	/// successfully read message, whatever its kind.
	pub fn rearm(&self) {
		let window = self.state.window_ms.load(Ordering::Acquire);
		self.restart(window);
	}

	/// Adopt a new window and restart the timer from this moment. Called
	/// when a heartbeat advertises an interval.
	pub fn set_window_ms(&self, window_ms: u64) {
		self.state.window_ms.store(window_ms, Ordering::Release);
		self.restart(window_ms);
	}

	pub fn window_ms(&self) -> u64 {
		self.state.window_ms.load(Ordering::Acquire)
	}

	pub fn deadline_ms(&self) -> u64 {
		self.state.deadline_ms.load(Ordering::Acquire)
	}

	fn restart(&self, window_ms: u64) {
		self.state
			.deadline_ms
			.store(self.time.current_time_ms() + window_ms, Ordering::Release);
		self.state.fired.store(false, Ordering::Release);
	}

	/// If the deadline has passed and this silence window has not been
	/// reported yet, returns how long the stream has been silent. At most
	/// one expiry is reported per silence window; re-arming starts a new
	/// window.
	fn take_expiry(&self) -> Option<u64> {
		let now = self.time.current_time_ms();
		let deadline = self.state.deadline_ms.load(Ordering::Acquire);
		if now <= deadline {
			return None;
		}
		if self.state.fired.swap(true, Ordering::AcqRel) {
			return None;
		}
		let window = self.state.window_ms.load(Ordering::Acquire);
		Some(now.saturating_sub(deadline) + window)
	}
}

/// Watchdog task for one watch epoch
pub struct Watchdog {
	handle: JoinHandle<()>,
	stop: CancellationToken,
}

impl Watchdog {
	/// Spawn the watchdog alongside a streaming epoch. `epoch` is the
	/// stream-scoped token cancelled by the reconnect action.
	pub fn spawn(
		deadline: LivenessDeadline,
		config: Arc<WatchConfig>,
		events: WatchEventBus,
		metrics: Arc<WatchMetrics>,
		epoch: CancellationToken,
	) -> Self {
		let stop = CancellationToken::new();
		let stop_child = stop.clone();

		let handle = tokio::spawn(async move {
			let mut poll = tokio::time::interval(config.watchdog_poll_interval());
			poll.set_missed_tick_behavior(MissedTickBehavior::Delay);

			loop {
				tokio::select! {
					() = stop_child.cancelled() => break,
					_ = poll.tick() => {
						let Some(silent_for_ms) = deadline.take_expiry() else {
							continue;
						};

						metrics.liveness_timeouts.fetch_add(1, Ordering::Relaxed);
						warn!(
							silent_for_ms,
							window_ms = deadline.window_ms(),
							"no update within liveness window"
						);
						events.emit(WatchEvent::LivenessTimeout { silent_for_ms });

						if config.liveness_action == LivenessAction::Reconnect {
							epoch.cancel();
						}
					}
				}
			}
		});

		Self { handle, stop }
	}

	/// Stop the watchdog and wait for its task to finish.
	pub async fn stop(self) {
		self.stop.cancel();
		let _ = self.handle.await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::infra::time_source::FakeTimeSource;

	fn deadline(time: &FakeTimeSource, window_ms: u64) -> LivenessDeadline {
		LivenessDeadline::arm(Arc::new(time.clone()), window_ms)
	}

	#[test]
	fn test_heartbeat_sets_deadline_to_tolerated_interval() {
		let time = FakeTimeSource::new(10_000);
		let deadline = deadline(&time, 30_000);

		// Heartbeat advertising 5000ms with tolerance 5 becomes a 25000ms window.
		deadline.set_window_ms(25_000);
		assert_eq!(deadline.deadline_ms(), 35_000);

		time.advance(24_999);
		assert!(deadline.take_expiry().is_none());

		time.advance(2);
		assert!(deadline.take_expiry().is_some());
	}

	#[test]
	fn test_any_message_rearms_with_last_window() {
		let time = FakeTimeSource::new(0);
		let deadline = deadline(&time, 30_000);
		deadline.set_window_ms(25_000);

		time.advance(20_000);
		deadline.rearm();
		assert_eq!(deadline.deadline_ms(), 45_000);
	}

	#[test]
	fn test_expiry_reported_once_per_silence_window() {
		let time = FakeTimeSource::new(0);
		let deadline = deadline(&time, 1_000);

		time.advance(1_500);
		assert_eq!(deadline.take_expiry(), Some(1_500));
		assert_eq!(deadline.take_expiry(), None);

		// New window, new report.
		deadline.rearm();
		time.advance(2_000);
		assert_eq!(deadline.take_expiry(), Some(2_000));
	}

	#[tokio::test]
	#[tracing_test::traced_test]
	async fn test_watchdog_emits_event_without_cancelling_epoch() {
		let time = FakeTimeSource::new(0);
		let deadline = deadline(&time, 50);
		let events = WatchEventBus::new();
		let mut subscriber = events.subscribe();
		let epoch = CancellationToken::new();

		let config = Arc::new(WatchConfig {
			watchdog_poll_interval_ms: 10,
			..WatchConfig::default()
		});

		let watchdog = Watchdog::spawn(
			deadline,
			config,
			events.clone(),
			Arc::new(WatchMetrics::default()),
			epoch.clone(),
		);

		time.advance(100);
		let event = tokio::time::timeout(std::time::Duration::from_secs(2), subscriber.recv())
			.await
			.expect("watchdog did not fire")
			.unwrap();
		assert_eq!(event.event_type(), "LivenessTimeout");
		assert!(!epoch.is_cancelled());
		assert!(logs_contain("no update within liveness window"));

		watchdog.stop().await;
	}

	#[tokio::test]
	async fn test_watchdog_reconnect_action_cancels_epoch() {
		let time = FakeTimeSource::new(0);
		let deadline = deadline(&time, 50);
		let epoch = CancellationToken::new();

		let config = Arc::new(WatchConfig {
			watchdog_poll_interval_ms: 10,
			liveness_action: LivenessAction::Reconnect,
			..WatchConfig::default()
		});

		let watchdog = Watchdog::spawn(
			deadline,
			config,
			WatchEventBus::new(),
			Arc::new(WatchMetrics::default()),
			epoch.clone(),
		);

		time.advance(100);
		tokio::time::timeout(std::time::Duration::from_secs(2), epoch.cancelled())
			.await
			.expect("epoch was not cancelled");

		watchdog.stop().await;
	}
}
