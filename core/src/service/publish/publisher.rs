//! Update publisher - server side of the watch protocol
//!
//! Serves each watcher an infinite snapshot/delta/heartbeat sequence. Two
//! periodic producers (mutation schedule, heartbeat schedule) run on their
//! own timers and enqueue onto an unbounded hand-off queue; one drain loop
//! dequeues and writes to the bounded outbound path in order. A slow
//! consumer can stall the drain loop but never a producer's timer, so the
//! heartbeat cadence guarantee holds independent of consumer speed.

use crate::config::PublishConfig;
use crate::infra::wire::messages::{ResourceUpdate, WatchRequest};
use crate::service::publish::feed::ResourceFeed;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};
use uuid::Uuid;

/// Produces watch streams for any number of independent watchers
///
/// Stateless between watchers: every `watch` call builds its own feed, queue
/// and tasks, so watchers never contend on shared mutable state.
pub struct UpdatePublisher {
	config: Arc<PublishConfig>,
}

impl UpdatePublisher {
	pub fn new(config: Arc<PublishConfig>) -> Self {
		Self { config }
	}

	/// Open one watch stream
	///
	/// The first message is always the initial snapshot; after it the stream
	/// interleaves change batches and heartbeats until `cancel` fires or the
	/// returned stream is dropped. `is_reconnect` is acknowledged but does
	/// not change behavior: the protocol has no resume cursor, so every
	/// watch starts with a full snapshot.
	pub fn watch(
		&self,
		request: WatchRequest,
		cancel: CancellationToken,
	) -> ReceiverStream<ResourceUpdate> {
		let watcher = Uuid::new_v4();
		debug!(watcher = %watcher, is_reconnect = request.is_reconnect, "watch stream opened");

		let (queue_tx, queue_rx) = mpsc::unbounded_channel();
		let (out_tx, out_rx) = mpsc::channel(self.config.outbound_buffer);

		let mut feed = ResourceFeed::new(&self.config);

		// Enqueued before any producer starts, so the snapshot is always
		// the first message a watcher sees.
		let (resources, resource_types) = feed.initial(self.config.initial_resources);
		let _ = queue_tx.send(ResourceUpdate::InitialSnapshot {
			resources,
			resource_types,
		});

		tokio::spawn(run_mutation_producer(
			feed,
			queue_tx.clone(),
			self.config.clone(),
			cancel.clone(),
		));
		tokio::spawn(run_heartbeat_producer(
			queue_tx,
			self.config.clone(),
			cancel.clone(),
		));
		tokio::spawn(run_drain_loop(queue_rx, out_tx, cancel, watcher));

		ReceiverStream::new(out_rx)
	}
}

/// Mutates the feed on its own schedule and enqueues the resulting batches.
async fn run_mutation_producer(
	mut feed: ResourceFeed,
	queue: mpsc::UnboundedSender<ResourceUpdate>,
	config: Arc<PublishConfig>,
	cancel: CancellationToken,
) {
	let period = config.change_interval();
	let mut ticker = interval_at(Instant::now() + period, period);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		tokio::select! {
			() = cancel.cancelled() => break,
			_ = ticker.tick() => {
				let changes = feed.next_batch();
				if changes.is_empty() {
					continue;
				}
				trace!(changes = changes.len(), "mutation tick");
				if queue.send(ResourceUpdate::Changes { changes }).is_err() {
					break;
				}
			}
		}
	}
}

/// Enqueues heartbeats at the advertised interval, independent of mutations.
async fn run_heartbeat_producer(
	queue: mpsc::UnboundedSender<ResourceUpdate>,
	config: Arc<PublishConfig>,
	cancel: CancellationToken,
) {
	let period = config.heartbeat_interval();
	let mut ticker = interval_at(Instant::now() + period, period);
	ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

	loop {
		tokio::select! {
			() = cancel.cancelled() => break,
			_ = ticker.tick() => {
				let heartbeat = ResourceUpdate::Heartbeat {
					interval_ms: config.heartbeat_interval_ms,
				};
				if queue.send(heartbeat).is_err() {
					break;
				}
			}
		}
	}
}

/// Single writer between the hand-off queue and the outbound path.
///
/// Preserves enqueue order across both producers; the only place a slow
/// consumer exerts backpressure.
async fn run_drain_loop(
	mut queue: mpsc::UnboundedReceiver<ResourceUpdate>,
	out: mpsc::Sender<ResourceUpdate>,
	cancel: CancellationToken,
	watcher: Uuid,
) {
	loop {
		let update = tokio::select! {
			() = cancel.cancelled() => break,
			update = queue.recv() => match update {
				Some(update) => update,
				None => break,
			},
		};

		tokio::select! {
			() = cancel.cancelled() => break,
			sent = out.send(update) => {
				if sent.is_err() {
					// Watcher dropped its stream.
					break;
				}
			}
		}
	}

	debug!(watcher = %watcher, "watch stream closed");
}
