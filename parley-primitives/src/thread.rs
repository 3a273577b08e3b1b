//! Thread status and read-only snapshots.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ids::{AgentId, ThreadId};
use crate::message::Message;

/// Lifecycle status of a conversation thread.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum ThreadStatus {
    /// Thread accepts participant changes and new messages.
    Open,
    /// Thread is sealed; no further mutation is permitted.
    Closed,
}

impl ThreadStatus {
    /// Returns `true` once the thread has been closed.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }
}

/// Owned, point-in-time copy of a thread's state.
///
/// Snapshots are detached from the broker: holding one never blocks broker
/// operations, and later mutations are not reflected.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ThreadSnapshot {
    id: ThreadId,
    name: String,
    creator: AgentId,
    participants: BTreeSet<AgentId>,
    messages: Vec<Message>,
    status: ThreadStatus,
    summary: Option<String>,
}

impl ThreadSnapshot {
    /// Assembles a snapshot from its parts.
    ///
    /// The `summary` must be present exactly when `status` is
    /// [`ThreadStatus::Closed`]; callers own that pairing.
    #[must_use]
    pub fn new(
        id: ThreadId,
        name: impl Into<String>,
        creator: AgentId,
        participants: BTreeSet<AgentId>,
        messages: Vec<Message>,
        status: ThreadStatus,
        summary: Option<String>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            creator,
            participants,
            messages,
            status,
            summary,
        }
    }

    /// Returns the thread identifier.
    #[must_use]
    pub const fn id(&self) -> ThreadId {
        self.id
    }

    /// Returns the thread name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of the creating agent.
    #[must_use]
    pub fn creator(&self) -> &AgentId {
        &self.creator
    }

    /// Current participant set.
    #[must_use]
    pub fn participants(&self) -> &BTreeSet<AgentId> {
        &self.participants
    }

    /// Ordered message log.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Returns the thread status.
    #[must_use]
    pub const fn status(&self) -> ThreadStatus {
        self.status
    }

    /// Closing summary, present only once the thread is closed.
    #[must_use]
    pub fn summary(&self) -> Option<&str> {
        self.summary.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_snapshot_has_no_summary() {
        let creator = AgentId::new("a1").unwrap();
        let snapshot = ThreadSnapshot::new(
            ThreadId::random(),
            "general",
            creator.clone(),
            [creator].into_iter().collect(),
            Vec::new(),
            ThreadStatus::Open,
            None,
        );

        assert!(!snapshot.status().is_closed());
        assert!(snapshot.summary().is_none());
        assert_eq!(snapshot.participants().len(), 1);
    }
}
