//! In-memory transports for watch protocol integration tests
//!
//! [`TestTransport`] serves scripted streams the test drives message by
//! message, with failure injection for connects, stream opens and mid-stream
//! breaks. [`PublisherBackedFactory`] wires the synchronizer directly to a
//! real [`UpdatePublisher`] for end-to-end runs.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use wd_core::infra::wire::transport::{
	ChannelState, ConnectionFactory, UpdateStream, WatchConnection,
};
use wd_core::{ResourceUpdate, TransportError, UpdatePublisher, WatchRequest};

type EpochMessage = Result<Option<ResourceUpdate>, TransportError>;

fn take_budget(counter: &AtomicU32) -> bool {
	counter
		.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
		.is_ok()
}

/// Test-side handle to one opened watch stream
#[derive(Clone)]
pub struct EpochHandle {
	tx: mpsc::UnboundedSender<EpochMessage>,
}

impl EpochHandle {
	pub fn send(&self, update: ResourceUpdate) {
		let _ = self.tx.send(Ok(Some(update)));
	}

	/// Break the stream with a transport error.
	pub fn fail(&self, reason: &str) {
		let _ = self.tx.send(Err(TransportError::StreamBroken(reason.to_string())));
	}

	/// End the stream cleanly from the server side.
	pub fn end(&self) {
		let _ = self.tx.send(Ok(None));
	}
}

/// Test-side handle to one created connection
#[derive(Clone)]
pub struct ConnectionHandle {
	state: Arc<Mutex<ChannelState>>,
}

impl ConnectionHandle {
	fn new() -> Self {
		Self {
			state: Arc::new(Mutex::new(ChannelState::Ready)),
		}
	}

	pub fn set_state(&self, state: ChannelState) {
		*self.state.lock().unwrap() = state;
	}

	pub fn state(&self) -> ChannelState {
		*self.state.lock().unwrap()
	}
}

struct Shared {
	epochs: Mutex<Vec<EpochHandle>>,
	open_failures: AtomicU32,
	closed: AtomicU32,
}

/// Scripted in-memory transport
///
/// Every `open_watch` registers a new epoch the test can fetch with
/// [`TestTransport::epoch`] and then drive explicitly.
pub struct TestTransport {
	shared: Arc<Shared>,
	connections: Mutex<Vec<ConnectionHandle>>,
	connect_failures: AtomicU32,
}

impl TestTransport {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			shared: Arc::new(Shared {
				epochs: Mutex::new(Vec::new()),
				open_failures: AtomicU32::new(0),
				closed: AtomicU32::new(0),
			}),
			connections: Mutex::new(Vec::new()),
			connect_failures: AtomicU32::new(0),
		})
	}

	/// Make the next `n` `connect` calls fail.
	pub fn fail_next_connects(&self, n: u32) {
		self.connect_failures.store(n, Ordering::SeqCst);
	}

	/// Make the next `n` `open_watch` calls fail.
	pub fn fail_next_opens(&self, n: u32) {
		self.shared.open_failures.store(n, Ordering::SeqCst);
	}

	pub fn connection_count(&self) -> usize {
		self.connections.lock().unwrap().len()
	}

	pub fn connection(&self, index: usize) -> ConnectionHandle {
		self.connections.lock().unwrap()[index].clone()
	}

	pub fn epoch_count(&self) -> usize {
		self.shared.epochs.lock().unwrap().len()
	}

	pub fn closed_count(&self) -> u32 {
		self.shared.closed.load(Ordering::SeqCst)
	}

	/// Wait for the `index`-th watch stream to be opened.
	pub async fn epoch(&self, index: usize) -> EpochHandle {
		tokio::time::timeout(Duration::from_secs(10), async {
			loop {
				let existing = self.shared.epochs.lock().unwrap().get(index).cloned();
				if let Some(handle) = existing {
					return handle;
				}
				tokio::time::sleep(Duration::from_millis(10)).await;
			}
		})
		.await
		.unwrap_or_else(|_| panic!("timed out waiting for watch epoch {index}"))
	}
}

#[async_trait]
impl ConnectionFactory for TestTransport {
	async fn connect(&self, address: &str) -> Result<Box<dyn WatchConnection>, TransportError> {
		if take_budget(&self.connect_failures) {
			return Err(TransportError::ConnectFailed(format!(
				"connection refused: {address}"
			)));
		}
		let handle = ConnectionHandle::new();
		self.connections.lock().unwrap().push(handle.clone());
		Ok(Box::new(TestConnection {
			shared: self.shared.clone(),
			handle,
		}))
	}
}

struct TestConnection {
	shared: Arc<Shared>,
	handle: ConnectionHandle,
}

#[async_trait]
impl WatchConnection for TestConnection {
	fn state(&self) -> ChannelState {
		self.handle.state()
	}

	async fn open_watch(
		&self,
		_request: WatchRequest,
	) -> Result<Box<dyn UpdateStream>, TransportError> {
		if take_budget(&self.shared.open_failures) {
			return Err(TransportError::StreamBroken("watch refused".to_string()));
		}
		let (tx, rx) = mpsc::unbounded_channel();
		self.shared.epochs.lock().unwrap().push(EpochHandle { tx });
		Ok(Box::new(ScriptedStream { rx }))
	}

	async fn close(&self) {
		self.shared.closed.fetch_add(1, Ordering::SeqCst);
	}
}

struct ScriptedStream {
	rx: mpsc::UnboundedReceiver<EpochMessage>,
}

#[async_trait]
impl UpdateStream for ScriptedStream {
	async fn next_update(&mut self) -> Result<Option<ResourceUpdate>, TransportError> {
		match self.rx.recv().await {
			Some(message) => message,
			None => Ok(None),
		}
	}
}

/// Connection factory backed by a real [`UpdatePublisher`]
pub struct PublisherBackedFactory {
	publisher: Arc<UpdatePublisher>,
	serve_cancel: CancellationToken,
}

impl PublisherBackedFactory {
	pub fn new(publisher: Arc<UpdatePublisher>) -> Self {
		Self {
			publisher,
			serve_cancel: CancellationToken::new(),
		}
	}

	/// Tear the server down; existing connections report `Shutdown`.
	pub fn shutdown(&self) {
		self.serve_cancel.cancel();
	}
}

#[async_trait]
impl ConnectionFactory for PublisherBackedFactory {
	async fn connect(&self, _address: &str) -> Result<Box<dyn WatchConnection>, TransportError> {
		if self.serve_cancel.is_cancelled() {
			return Err(TransportError::ConnectFailed("server stopped".to_string()));
		}
		Ok(Box::new(PublisherConnection {
			publisher: self.publisher.clone(),
			serve_cancel: self.serve_cancel.clone(),
		}))
	}
}

struct PublisherConnection {
	publisher: Arc<UpdatePublisher>,
	serve_cancel: CancellationToken,
}

#[async_trait]
impl WatchConnection for PublisherConnection {
	fn state(&self) -> ChannelState {
		if self.serve_cancel.is_cancelled() {
			ChannelState::Shutdown
		} else {
			ChannelState::Ready
		}
	}

	async fn open_watch(
		&self,
		request: WatchRequest,
	) -> Result<Box<dyn UpdateStream>, TransportError> {
		if self.serve_cancel.is_cancelled() {
			return Err(TransportError::ChannelShutdown);
		}
		let stream = self
			.publisher
			.watch(request, self.serve_cancel.child_token());
		Ok(Box::new(PublisherStream { inner: stream }))
	}

	async fn close(&self) {}
}

struct PublisherStream {
	inner: ReceiverStream<ResourceUpdate>,
}

#[async_trait]
impl UpdateStream for PublisherStream {
	async fn next_update(&mut self) -> Result<Option<ResourceUpdate>, TransportError> {
		Ok(self.inner.next().await)
	}
}
