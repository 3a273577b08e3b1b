//! Core shared types for the Parley conversation broker.

#![warn(missing_docs, clippy::pedantic)]

mod agent;
mod error;
mod ids;
mod message;
mod thread;

/// Registered agent descriptor.
pub use agent::Agent;
/// Error type and result alias shared across the SDK.
pub use error::{Error, Result};
/// Identifier newtypes for agents, threads, and messages.
pub use ids::{AgentId, MessageId, ThreadId};
/// Immutable conversation message.
pub use message::Message;
/// Thread status and read-only snapshots.
pub use thread::{ThreadSnapshot, ThreadStatus};
