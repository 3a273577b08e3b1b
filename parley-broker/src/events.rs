//! Broadcast stream of broker state changes.

use std::num::NonZeroUsize;

use parley_primitives::{Agent, AgentId, Message, ThreadId};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// State change announced to event subscribers.
///
/// Events are advisory: slow or absent subscribers never affect the outcome
/// of the operation that produced the event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum BrokerEvent {
    /// A new agent joined the registry.
    AgentRegistered {
        /// The registered agent.
        agent: Agent,
    },
    /// A thread was created.
    ThreadCreated {
        /// Identifier of the new thread.
        thread_id: ThreadId,
        /// Thread name.
        name: String,
        /// The creating agent.
        creator: AgentId,
    },
    /// An agent was added to a thread.
    ParticipantAdded {
        /// The affected thread.
        thread_id: ThreadId,
        /// The added agent.
        agent_id: AgentId,
    },
    /// An agent was removed from a thread.
    ParticipantRemoved {
        /// The affected thread.
        thread_id: ThreadId,
        /// The removed agent.
        agent_id: AgentId,
    },
    /// A message was appended to a thread.
    MessageSent {
        /// The appended message.
        message: Message,
    },
    /// A thread was closed.
    ThreadClosed {
        /// The closed thread.
        thread_id: ThreadId,
        /// Closing summary.
        summary: String,
    },
}

/// Fan-out channel for [`BrokerEvent`]s.
#[derive(Debug)]
pub(crate) struct EventBus {
    tx: broadcast::Sender<BrokerEvent>,
}

impl EventBus {
    pub(crate) fn new(capacity: NonZeroUsize) -> Self {
        let (tx, _) = broadcast::channel(capacity.get());
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<BrokerEvent> {
        self.tx.subscribe()
    }

    pub(crate) fn publish(&self, event: BrokerEvent) {
        // Send fails only when there are no subscribers, which is fine.
        let _ = self.tx.send(event);
    }
}
