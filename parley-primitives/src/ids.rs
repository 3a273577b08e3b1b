//! Identifier types for agents, threads, and messages.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

const MAX_AGENT_ID_LEN: usize = 128;

/// Caller-supplied unique identifier for an agent.
///
/// Unlike thread and message identifiers, agent identifiers are chosen by the
/// registering party and validated rather than generated.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AgentId(String);

impl AgentId {
    /// Creates a new agent identifier after validating its format.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidAgentId`] if the identifier is empty, longer
    /// than 128 bytes, or contains whitespace or control characters.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        validate_agent_id(&id)?;
        Ok(Self(id))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<AgentId> for String {
    fn from(value: AgentId) -> Self {
        value.0
    }
}

impl Display for AgentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for AgentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

fn validate_agent_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(Error::InvalidAgentId {
            id: String::new(),
            reason: "identifier cannot be empty".into(),
        });
    }

    if id.len() > MAX_AGENT_ID_LEN {
        return Err(Error::InvalidAgentId {
            id: id.into(),
            reason: format!("identifier length must be <= {MAX_AGENT_ID_LEN}"),
        });
    }

    if id.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(Error::InvalidAgentId {
            id: id.into(),
            reason: "identifier must not contain whitespace or control characters".into(),
        });
    }

    Ok(())
}

/// Unique identifier for a conversation thread.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(Uuid);

impl ThreadId {
    /// Generates a random thread identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl Display for ThreadId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for ThreadId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let uuid = Uuid::parse_str(s).map_err(Error::from)?;
        Ok(Self::from_uuid(uuid))
    }
}

/// Unique identifier for a message within the broker.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Generates a random message identifier.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an identifier from an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(self) -> Uuid {
        self.0
    }
}

impl Display for MessageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl FromStr for MessageId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let uuid = Uuid::parse_str(s).map_err(Error::from)?;
        Ok(Self::from_uuid(uuid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_reasonable_agent_ids() {
        for id in ["a1", "planner", "agent-7", "review.bot_2"] {
            AgentId::new(id).expect("valid id");
        }
    }

    #[test]
    fn rejects_empty_and_whitespace_agent_ids() {
        assert!(AgentId::new("").is_err());
        assert!(AgentId::new("two words").is_err());
        assert!(AgentId::new("tab\there").is_err());
        assert!(AgentId::new("x".repeat(129)).is_err());
    }

    #[test]
    fn round_trip_thread_id() {
        let id = ThreadId::random();
        let parsed = id.to_string().parse::<ThreadId>().expect("parse");
        assert_eq!(id, parsed);
    }

    #[test]
    fn round_trip_message_id() {
        let id = MessageId::random();
        let parsed = id.to_string().parse::<MessageId>().expect("parse");
        assert_eq!(id, parsed);
    }
}
