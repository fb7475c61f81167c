//! Publish service - server side of the resource watch protocol

pub mod feed;
pub mod publisher;

pub use feed::ResourceFeed;
pub use publisher::UpdatePublisher;
