//! Transport abstraction for the watch stream
//!
//! Provides a trait-based seam between the synchronizer and whatever
//! streaming channel actually carries the messages, keeping reconnection
//! policy independent of any concrete transport.
//!
//! The split matters for recovery: a channel that reports
//! [`ChannelState::Shutdown`] can never serve another stream, so the
//! synchronizer discards it and asks the [`ConnectionFactory`] for a fresh
//! one instead of retrying a dead channel forever. There is no in-place
//! channel revival.

use crate::common::errors::TransportError;
use crate::infra::wire::messages::{ResourceUpdate, WatchRequest};
use serde::{Deserialize, Serialize};

/// Observable connectivity state of a channel
///
/// Only `Shutdown` is load-bearing for the protocol: it is terminal and
/// forces connection replacement at the top of the watch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChannelState {
	Ready,
	Idle,
	Shutdown,
}

/// Creates connections on demand
///
/// Called once at startup and again whenever the synchronizer must replace
/// a shut-down channel. Implementations decide what "connect" means; the
/// synchronizer only requires that each call yields a channel capable of
/// serving new streams.
#[async_trait::async_trait]
pub trait ConnectionFactory: Send + Sync {
	async fn connect(
		&self,
		address: &str,
	) -> Result<Box<dyn WatchConnection>, TransportError>;
}

/// One established channel to the update publisher
#[async_trait::async_trait]
pub trait WatchConnection: Send + Sync {
	/// Current connectivity state. Must be cheap; the watch loop polls it
	/// on every iteration.
	fn state(&self) -> ChannelState;

	/// Open a server-streaming watch call on this channel.
	async fn open_watch(
		&self,
		request: WatchRequest,
	) -> Result<Box<dyn UpdateStream>, TransportError>;

	/// Release the underlying channel resource.
	async fn close(&self);
}

/// Server-to-client message stream of one watch call
///
/// `Ok(None)` means the server ended the stream. Implementations must make
/// `next_update` cancellation-safe: the synchronizer races it against its
/// cancellation signal and expects a dropped future to leave the transport
/// in a releasable state.
#[async_trait::async_trait]
pub trait UpdateStream: Send {
	async fn next_update(&mut self) -> Result<Option<ResourceUpdate>, TransportError>;
}
