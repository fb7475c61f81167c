//! Reconnect backoff policy

use std::time::Duration;

/// Exponential backoff with a hard cap
///
/// The delay for the n-th consecutive failure is `min(2^(n-1), cap)`
/// seconds. The counter feeding this is reset by the first successfully
/// read message of a recovered stream, never decayed gradually.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
	max: Duration,
}

impl BackoffPolicy {
	pub fn new(max: Duration) -> Self {
		Self { max }
	}

	/// Delay before the next connection attempt, given the running count of
	/// consecutive failures. `error_count` of zero means no delay.
	pub fn delay(&self, error_count: u32) -> Duration {
		if error_count == 0 {
			return Duration::ZERO;
		}
		let exponent = (error_count - 1).min(32);
		Duration::from_secs(2u64.saturating_pow(exponent)).min(self.max)
	}
}

impl Default for BackoffPolicy {
	fn default() -> Self {
		Self::new(Duration::from_secs(15))
	}
}
