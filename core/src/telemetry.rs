//! Logging initialization for binaries and tests

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize structured logging to stderr
///
/// Filter comes from `RUST_LOG`, defaulting to `info` for this crate.
/// Safe to call once per process; later calls are ignored.
pub fn init_logging() {
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new("info,wd_core=debug"));

	let _ = tracing_subscriber::registry()
		.with(fmt::layer().with_writer(std::io::stderr))
		.with(filter)
		.try_init();
}
