//! Watch stream synchronizer
//!
//! Drives the connect/read/reconnect loop against an update publisher and
//! applies every message to the local [`ResourceMirror`]. The loop never
//! surfaces transport errors to its caller; failures are counted, backed
//! off, and recovered by a full resync, and `run` only returns when the
//! cancellation signal fires.
//!
//! Recovery rule: the most reliable sign that a reconnect actually succeeded
//! is a successfully read message. Until one arrives the error count keeps
//! growing; when one does, the mirror is cleared first so nothing that may
//! have been deleted during the gap survives, and only then is the count
//! reset.

use crate::common::errors::WatchError;
use crate::config::WatchConfig;
use crate::infra::event_bus::{WatchEvent, WatchEventBus};
use crate::infra::time_source::{SystemTimeSource, TimeSource};
use crate::infra::wire::messages::{ResourceUpdate, WatchRequest};
use crate::infra::wire::transport::{ChannelState, ConnectionFactory, UpdateStream, WatchConnection};
use crate::service::watch::backoff::BackoffPolicy;
use crate::service::watch::metrics::WatchMetrics;
use crate::service::watch::mirror::ResourceMirror;
use crate::service::watch::watchdog::{LivenessDeadline, Watchdog};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

/// Client-side owner of the resource mirror
///
/// One synchronizer serves one server address at a time. The mirror has
/// exactly one writer (the read loop inside [`Synchronizer::run`]); external
/// readers go through [`ResourceMirror::snapshot`].
pub struct Synchronizer {
	config: Arc<WatchConfig>,
	factory: Arc<dyn ConnectionFactory>,
	mirror: Arc<ResourceMirror>,
	events: WatchEventBus,
	metrics: Arc<WatchMetrics>,
	time: Arc<dyn TimeSource>,
}

impl Synchronizer {
	pub fn new(factory: Arc<dyn ConnectionFactory>, config: Arc<WatchConfig>) -> Self {
		Self {
			config,
			factory,
			mirror: Arc::new(ResourceMirror::new()),
			events: WatchEventBus::new(),
			metrics: Arc::new(WatchMetrics::default()),
			time: Arc::new(SystemTimeSource),
		}
	}

	/// Replace the clock used for liveness deadlines (deterministic tests).
	pub fn with_time_source(mut self, time: Arc<dyn TimeSource>) -> Self {
		self.time = time;
		self
	}

	pub fn mirror(&self) -> &Arc<ResourceMirror> {
		&self.mirror
	}

	pub fn events(&self) -> &WatchEventBus {
		&self.events
	}

	pub fn metrics(&self) -> &Arc<WatchMetrics> {
		&self.metrics
	}

	/// Watch `address` until `cancel` fires
	///
	/// Side effect is the evolving mirror; there is no return value. Every
	/// transport failure is handled inside the loop with exponential backoff
	/// capped by the config, and every recovery starts with a full resync
	/// (the protocol has no resume cursor).
	pub async fn run(&self, address: &str, cancel: CancellationToken) {
		let backoff = BackoffPolicy::new(self.config.max_backoff());
		let mut error_count: u32 = 0;
		let mut connection: Option<Box<dyn WatchConnection>> = None;

		while !cancel.is_cancelled() {
			// A channel reporting Shutdown can never serve another stream,
			// whatever the last read outcome was.
			if connection
				.as_deref()
				.is_some_and(|conn| conn.state() == ChannelState::Shutdown)
			{
				warn!(address, "channel has shut down, recreating connection");
				if let Some(old) = connection.take() {
					old.close().await;
				}
			}

			if error_count > 0 {
				let delay = backoff.delay(error_count);
				debug!(error_count, delay_ms = delay.as_millis() as u64, "backing off");
				tokio::select! {
					() = cancel.cancelled() => break,
					() = sleep(delay) => {}
				}
			}

			if connection.is_none() {
				match self.factory.connect(address).await {
					Ok(conn) => {
						debug!(address, "connection established");
						connection = Some(conn);
					}
					Err(err) => {
						self.record_failure(&mut error_count, &WatchError::Transport(err));
						continue;
					}
				}
			}
			let Some(conn) = connection.as_deref() else {
				continue;
			};

			debug!(address, "starting watch");
			match conn.open_watch(WatchRequest { is_reconnect: false }).await {
				Ok(stream) => {
					self.metrics.connects.fetch_add(1, Ordering::Relaxed);
					self.events.emit(WatchEvent::Connected {
						address: address.to_string(),
					});

					match self.stream_updates(stream, &mut error_count, &cancel).await {
						// Only cancellation ends a stream without an error.
						Ok(()) => break,
						Err(err) => self.record_failure(&mut error_count, &err),
					}
				}
				Err(err) => {
					self.record_failure(&mut error_count, &WatchError::Transport(err));
				}
			}
		}

		if let Some(conn) = connection.take() {
			conn.close().await;
		}
		info!(address, "stopping resource watch");
		self.events.emit(WatchEvent::Stopped);
	}

	/// Read one stream until it fails, the server ends it, or the caller
	/// cancels. Returns `Ok(())` only on cancellation.
	async fn stream_updates(
		&self,
		mut stream: Box<dyn UpdateStream>,
		error_count: &mut u32,
		cancel: &CancellationToken,
	) -> Result<(), WatchError> {
		// Stream-scoped token: lets the watchdog abort this epoch without
		// touching the outer loop, and follows the caller's cancellation.
		let epoch = cancel.child_token();

		let deadline = LivenessDeadline::arm(
			self.time.clone(),
			self.config.initial_liveness_timeout_ms,
		);
		let watchdog = Watchdog::spawn(
			deadline.clone(),
			self.config.clone(),
			self.events.clone(),
			self.metrics.clone(),
			epoch.clone(),
		);

		let result = loop {
			let read = tokio::select! {
				() = epoch.cancelled() => {
					break if cancel.is_cancelled() {
						Ok(())
					} else {
						Err(WatchError::LivenessAborted)
					};
				}
				read = stream.next_update() => read,
			};

			let update = match read {
				Ok(Some(update)) => update,
				// The publisher contract says a stream never ends on its own.
				Ok(None) => break Err(WatchError::StreamEnded),
				Err(err) => break Err(WatchError::Transport(err)),
			};

			trace!(kind = update.kind(), "update received");
			deadline.rearm();

			if *error_count > 0 {
				// First message after a gap: drop everything learned before
				// it, deletions may have been missed while disconnected.
				self.mirror.clear().await;
				self.metrics.resyncs.fetch_add(1, Ordering::Relaxed);
				self.events.emit(WatchEvent::MirrorCleared);
				*error_count = 0;
				info!("watch stream recovered, mirror cleared for resync");
			}

			if let Err(err) = self.apply_update(update, &deadline).await {
				break Err(err);
			}
		};

		watchdog.stop().await;
		result
	}

	async fn apply_update(
		&self,
		update: ResourceUpdate,
		deadline: &LivenessDeadline,
	) -> Result<(), WatchError> {
		match update {
			ResourceUpdate::InitialSnapshot {
				resources,
				resource_types,
			} => {
				let count = resources.len();
				self.mirror.replace_all(resources, resource_types).await;
				self.metrics.snapshots_applied.fetch_add(1, Ordering::Relaxed);
				debug!(resources = count, "initial snapshot applied");
				self.events.emit(WatchEvent::SnapshotApplied { resources: count });
			}
			ResourceUpdate::Changes { changes } => {
				let applied = self.mirror.apply_changes(changes).await;
				self.metrics
					.changes_applied
					.fetch_add(applied as u64, Ordering::Relaxed);
				debug!(applied, "change batch applied");
				self.events.emit(WatchEvent::ChangesApplied { applied });
			}
			ResourceUpdate::Heartbeat { interval_ms } => {
				self.metrics.heartbeats.fetch_add(1, Ordering::Relaxed);
				let window_ms = interval_ms.saturating_mul(self.config.liveness_tolerance);
				trace!(interval_ms, window_ms, "heartbeat");
				deadline.set_window_ms(window_ms);
			}
			ResourceUpdate::Unsupported => {
				// Never partially interpret a message this client does not
				// understand; abandon the stream instead.
				return Err(WatchError::UnsupportedUpdate);
			}
		}
		Ok(())
	}

	fn record_failure(&self, error_count: &mut u32, err: &WatchError) {
		*error_count += 1;
		self.metrics.stream_failures.fetch_add(1, Ordering::Relaxed);
		warn!(error_count = *error_count, error = %err, "watch stream failure");
		self.events.emit(WatchEvent::StreamFailed {
			error_count: *error_count,
			reason: err.to_string(),
		});
	}
}
