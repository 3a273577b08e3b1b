//! Registered agent descriptor.

use serde::{Deserialize, Serialize};

use crate::ids::AgentId;

/// An independent actor known to the broker.
///
/// Agents are immutable after registration and live for the lifetime of the
/// registry.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    id: AgentId,
    name: String,
}

impl Agent {
    /// Creates a new agent descriptor.
    #[must_use]
    pub fn new(id: AgentId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }

    /// Returns the unique agent identifier.
    #[must_use]
    pub fn id(&self) -> &AgentId {
        &self.id
    }

    /// Human-friendly display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns a copy with the display name blanked, for listings that omit
    /// details.
    #[must_use]
    pub fn without_details(&self) -> Self {
        Self {
            id: self.id.clone(),
            name: String::new(),
        }
    }
}
