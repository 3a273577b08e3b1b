//! Broker error taxonomy.

use parley_primitives::{AgentId, ThreadId};
use thiserror::Error;

/// Result alias used for broker operations.
pub type BrokerResult<T> = Result<T, BrokerError>;

/// Errors returned by broker operations.
///
/// Every variant is recoverable: a failed call leaves the registry, thread
/// store, and mention queues exactly as they were.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BrokerError {
    /// The referenced agent is not registered.
    #[error("agent {0} is not registered")]
    AgentNotFound(AgentId),

    /// An agent with this identifier is already registered.
    #[error("agent {0} is already registered")]
    AgentAlreadyRegistered(AgentId),

    /// The referenced thread does not exist.
    #[error("thread {0} not found")]
    ThreadNotFound(ThreadId),

    /// The thread exists but has been closed.
    #[error("thread {0} is closed")]
    ThreadClosed(ThreadId),

    /// The agent is not a participant of the thread.
    #[error("agent {agent_id} is not a participant of thread {thread_id}")]
    NotParticipant {
        /// Thread whose participant set was consulted.
        thread_id: ThreadId,
        /// Agent missing from the participant set.
        agent_id: AgentId,
    },

    /// The agent is already a participant of the thread.
    #[error("agent {agent_id} is already a participant of thread {thread_id}")]
    AlreadyParticipant {
        /// Thread whose participant set was consulted.
        thread_id: ThreadId,
        /// Agent already present in the participant set.
        agent_id: AgentId,
    },

    /// A request failed validation before touching any state.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The agent already has an outstanding wait.
    #[error("agent {0} already has a wait in progress")]
    WaitAlreadyInProgress(AgentId),
}

impl BrokerError {
    /// Creates a validation error from a string-like reason.
    #[must_use]
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation(reason.into())
    }
}

impl From<parley_primitives::Error> for BrokerError {
    fn from(value: parley_primitives::Error) -> Self {
        Self::Validation(value.to_string())
    }
}
