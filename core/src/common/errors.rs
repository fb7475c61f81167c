//! Unified error handling for the core

use thiserror::Error;

/// Errors reported by a transport implementation
///
/// These are the only errors a [`crate::infra::wire`] implementation may
/// surface to the synchronizer. All of them are recoverable: the watch loop
/// counts them, backs off, and reconnects with a full resync.
#[derive(Error, Debug)]
pub enum TransportError {
	#[error("connect failed: {0}")]
	ConnectFailed(String),

	#[error("stream broken: {0}")]
	StreamBroken(String),

	#[error("decode error: {0}")]
	Decode(String),

	#[error("channel has shut down")]
	ChannelShutdown,
}

impl From<serde_json::Error> for TransportError {
	fn from(err: serde_json::Error) -> Self {
		TransportError::Decode(err.to_string())
	}
}

/// Errors that end a single watch epoch
///
/// None of these propagate out of the watch loop. Every variant increments
/// the running error count and routes through backoff plus reconnect; the
/// caller of [`crate::Synchronizer::run`] only ever sees a normal return on
/// cancellation.
#[derive(Error, Debug)]
pub enum WatchError {
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// The server sent an update variant this client does not understand.
	/// Never partially applied; the stream is abandoned instead.
	#[error("unsupported update kind")]
	UnsupportedUpdate,

	/// The server closed the stream cleanly. The publisher contract says a
	/// watch stream never ends on its own, so this is a failure.
	#[error("stream ended unexpectedly")]
	StreamEnded,

	/// The liveness watchdog cancelled the stream (reconnect action only).
	#[error("stream aborted after liveness timeout")]
	LivenessAborted,
}

/// Result type alias for watch protocol operations
pub type Result<T> = std::result::Result<T, WatchError>;
