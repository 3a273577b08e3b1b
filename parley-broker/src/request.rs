//! Closed request and response types for the broker's call surface.
//!
//! These are the stable cross-transport schemas: an external bridge maps its
//! wire format onto [`BrokerRequest`] and dispatches through
//! [`ThreadBroker::dispatch`](crate::ThreadBroker::dispatch). Field names are
//! part of the contract.

use std::collections::BTreeSet;

use parley_primitives::{Agent, AgentId, MessageId, ThreadId};
use serde::{Deserialize, Serialize};

use crate::notify::WaitOutcome;

const fn default_true() -> bool {
    true
}

/// One operation request, discriminated by the `op` tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum BrokerRequest {
    /// Register a new agent.
    RegisterAgent {
        /// Unique identifier for the agent.
        agent_id: AgentId,
        /// Display name.
        agent_name: String,
    },
    /// Create a new conversation thread.
    CreateThread {
        /// Thread name; must be non-empty.
        thread_name: String,
        /// The creating agent, always included as a participant.
        creator_id: AgentId,
        /// Additional participants.
        #[serde(default)]
        participant_ids: Vec<AgentId>,
    },
    /// Add a participant to an open thread.
    AddParticipant {
        /// The target thread.
        thread_id: ThreadId,
        /// The agent to add.
        participant_id: AgentId,
    },
    /// Remove a participant from an open thread.
    RemoveParticipant {
        /// The target thread.
        thread_id: ThreadId,
        /// The agent to remove.
        participant_id: AgentId,
    },
    /// Close a thread with a summary.
    CloseThread {
        /// The target thread.
        thread_id: ThreadId,
        /// Closing summary stored on the thread.
        summary: String,
    },
    /// Append a message to an open thread.
    SendMessage {
        /// The target thread.
        thread_id: ThreadId,
        /// The sending agent; must be a participant.
        sender_id: AgentId,
        /// Message body.
        content: String,
        /// Mentioned agents; need not be participants.
        #[serde(default)]
        mentions: BTreeSet<AgentId>,
    },
    /// Block until the agent is mentioned or the timeout elapses.
    WaitForMentions {
        /// The waiting agent.
        agent_id: AgentId,
        /// Timeout in milliseconds; must be non-negative. When omitted, the
        /// broker's configured default wait timeout applies.
        #[serde(default)]
        timeout_ms: Option<i64>,
    },
    /// List all registered agents.
    ListAgents {
        /// When false, display names are omitted.
        #[serde(default = "default_true")]
        include_details: bool,
    },
}

/// Successful result of a dispatched request, discriminated by the `result`
/// tag.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum BrokerResponse {
    /// Agent registered.
    Registered,
    /// Thread created.
    ThreadCreated {
        /// Identifier of the new thread.
        thread_id: ThreadId,
    },
    /// Participant added.
    ParticipantAdded,
    /// Participant removed.
    ParticipantRemoved,
    /// Thread closed.
    ThreadClosed,
    /// Message appended.
    MessageSent {
        /// Identifier of the appended message.
        message_id: MessageId,
    },
    /// Wait resolved with one of its three outcomes.
    Wait {
        /// The wait outcome.
        outcome: WaitOutcome,
    },
    /// Registry listing.
    Agents {
        /// Registered agents, sorted by identifier.
        agents: Vec<Agent>,
    },
}
