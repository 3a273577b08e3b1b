//! Immutable conversation messages.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{AgentId, MessageId, ThreadId};

/// A single message appended to a thread.
///
/// Messages are immutable once created and are never removed from their
/// thread's log. The `seq` field is the per-thread sequence number: strictly
/// increasing, gap-free, starting at zero.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    thread_id: ThreadId,
    sender: AgentId,
    content: String,
    mentions: BTreeSet<AgentId>,
    seq: u64,
    sent_at: DateTime<Utc>,
}

impl Message {
    /// Creates a message with a fresh identifier and the current timestamp.
    #[must_use]
    pub fn new(
        thread_id: ThreadId,
        sender: AgentId,
        content: impl Into<String>,
        mentions: BTreeSet<AgentId>,
        seq: u64,
    ) -> Self {
        Self {
            id: MessageId::random(),
            thread_id,
            sender,
            content: content.into(),
            mentions,
            seq,
            sent_at: Utc::now(),
        }
    }

    /// Returns the unique message identifier.
    #[must_use]
    pub const fn id(&self) -> MessageId {
        self.id
    }

    /// Returns the identifier of the owning thread.
    #[must_use]
    pub const fn thread_id(&self) -> ThreadId {
        self.thread_id
    }

    /// Returns the sending agent's identifier.
    #[must_use]
    pub fn sender(&self) -> &AgentId {
        &self.sender
    }

    /// Returns the message body.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Agents explicitly mentioned by this message.
    #[must_use]
    pub fn mentions(&self) -> &BTreeSet<AgentId> {
        &self.mentions
    }

    /// Returns `true` when the given agent is mentioned.
    #[must_use]
    pub fn mentions_agent(&self, agent: &AgentId) -> bool {
        self.mentions.contains(agent)
    }

    /// Per-thread sequence number.
    #[must_use]
    pub const fn seq(&self) -> u64 {
        self.seq
    }

    /// Time the message was appended.
    #[must_use]
    pub const fn sent_at(&self) -> DateTime<Utc> {
        self.sent_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: &str) -> AgentId {
        AgentId::new(id).unwrap()
    }

    #[test]
    fn mention_lookup() {
        let mentions: BTreeSet<AgentId> = [agent("a2"), agent("a3")].into_iter().collect();
        let message = Message::new(ThreadId::random(), agent("a1"), "hello", mentions, 0);

        assert!(message.mentions_agent(&agent("a2")));
        assert!(!message.mentions_agent(&agent("a1")));
        assert_eq!(message.seq(), 0);
    }

    #[test]
    fn serde_round_trip() {
        let message = Message::new(
            ThreadId::random(),
            agent("a1"),
            "ping",
            BTreeSet::new(),
            7,
        );
        let json = serde_json::to_string(&message).unwrap();
        let back: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(back, message);
    }
}
