//! Messaging between the pipeline and its host
//!
//! Hosts receive progress through a channel instead of registering listeners.

pub mod messages;

pub use messages::PipelineEvent;
