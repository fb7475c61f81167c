//! Wire contract and transport seam
//!
//! [`messages`] defines the language-neutral message shapes exchanged on a
//! watch stream. [`transport`] defines the traits a concrete streaming
//! channel implementation must provide; this crate ships no transport of its
//! own, only the contract the synchronizer drives.

pub mod messages;
pub mod transport;

pub use messages::{ResourceChange, ResourceUpdate, WatchRequest};
pub use transport::{ChannelState, ConnectionFactory, UpdateStream, WatchConnection};
