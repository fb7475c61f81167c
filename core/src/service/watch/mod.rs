//! Watch service - client side of the resource watch protocol
//!
//! Background service that keeps a local mirror of the server's resource
//! table converged through a long-lived watch stream, surviving transport
//! failures via backoff, reconnect and full-snapshot resync.

pub mod backoff;
pub mod metrics;
pub mod mirror;
pub mod synchronizer;
pub mod watchdog;

pub use backoff::BackoffPolicy;
pub use metrics::{WatchMetrics, WatchMetricsSnapshot};
pub use mirror::ResourceMirror;
pub use synchronizer::Synchronizer;
pub use watchdog::LivenessDeadline;

use crate::config::WatchConfig;
use crate::infra::wire::transport::ConnectionFactory;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Watch service for one server address
///
/// Owns the synchronizer and its task lifetime. Runs for as long as the
/// process wants the mirror kept current.
pub struct WatchService {
	address: String,
	synchronizer: Arc<Synchronizer>,
	is_running: Arc<AtomicBool>,
	cancel: Mutex<Option<CancellationToken>>,
	task: Mutex<Option<JoinHandle<()>>>,
}

impl WatchService {
	pub fn new(
		address: impl Into<String>,
		factory: Arc<dyn ConnectionFactory>,
		config: Arc<WatchConfig>,
	) -> Self {
		Self {
			address: address.into(),
			synchronizer: Arc::new(Synchronizer::new(factory, config)),
			is_running: Arc::new(AtomicBool::new(false)),
			cancel: Mutex::new(None),
			task: Mutex::new(None),
		}
	}

	pub fn synchronizer(&self) -> &Arc<Synchronizer> {
		&self.synchronizer
	}

	/// Read accessor for the mirrored resource table.
	pub fn mirror(&self) -> &Arc<ResourceMirror> {
		self.synchronizer.mirror()
	}
}

#[async_trait]
impl crate::service::Service for WatchService {
	fn name(&self) -> &'static str {
		"watch_service"
	}

	fn is_running(&self) -> bool {
		self.is_running.load(Ordering::SeqCst)
	}

	async fn start(&self) -> Result<()> {
		if self.is_running.swap(true, Ordering::SeqCst) {
			warn!("watch service already running");
			return Ok(());
		}

		info!(address = %self.address, "starting watch service");

		let token = CancellationToken::new();
		*self.cancel.lock().await = Some(token.clone());

		let synchronizer = self.synchronizer.clone();
		let address = self.address.clone();
		let is_running = self.is_running.clone();
		let handle = tokio::spawn(async move {
			synchronizer.run(&address, token).await;
			is_running.store(false, Ordering::SeqCst);
		});
		*self.task.lock().await = Some(handle);

		Ok(())
	}

	async fn stop(&self) -> Result<()> {
		if !self.is_running.load(Ordering::SeqCst) {
			return Ok(());
		}

		info!(address = %self.address, "stopping watch service");

		if let Some(token) = self.cancel.lock().await.take() {
			token.cancel();
		}
		if let Some(handle) = self.task.lock().await.take() {
			let _ = handle.await;
		}

		self.is_running.store(false, Ordering::SeqCst);
		Ok(())
	}
}
