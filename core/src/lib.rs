//! Watchdeck core
//!
//! Mirrors the dynamic resource set of a locally-orchestrated distributed
//! application over a long-lived streaming watch connection. The client side
//! (`service::watch`) maintains a local mirror of the server's resource
//! table and keeps it converged across disconnects via full-snapshot resync.
//! The server side (`service::publish`) emits the snapshot/delta/heartbeat
//! stream each watcher consumes.
//!
//! Transport is abstracted behind traits in [`infra::wire`]; this crate ships
//! no concrete network transport.

pub mod common;
pub mod config;
pub mod domain;
pub mod infra;
pub mod service;
pub mod telemetry;

pub use common::errors::{TransportError, WatchError};
pub use config::{LivenessAction, PublishConfig, WatchConfig};
pub use domain::resource::{ResourceId, ResourceSnapshot, ResourceTypeDescriptor};
pub use infra::event_bus::{WatchEvent, WatchEventBus};
pub use infra::wire::{ResourceChange, ResourceUpdate, WatchRequest};
pub use service::publish::UpdatePublisher;
pub use service::watch::{ResourceMirror, Synchronizer, WatchService};
