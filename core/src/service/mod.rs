//! Long-running background services
//!
//! [`watch`] is the client side of the protocol: it owns the resource mirror
//! and drives the connect/read/reconnect loop. [`publish`] is the server
//! side: it assembles the snapshot/delta/heartbeat sequence each watcher
//! consumes.

use anyhow::Result;
use async_trait::async_trait;

pub mod publish;
pub mod watch;

/// Lifecycle contract for background services
#[async_trait]
pub trait Service: Send + Sync {
	fn name(&self) -> &'static str;

	fn is_running(&self) -> bool;

	async fn start(&self) -> Result<()>;

	async fn stop(&self) -> Result<()>;
}
