//! Agent registry: who is known to the broker.

use std::collections::HashMap;
use std::time::Duration;

use parley_primitives::{Agent, AgentId};
use tokio::sync::{RwLock, watch};
use tracing::{debug, info};

use crate::error::{BrokerError, BrokerResult};

/// Tracks registered agents and their display names.
///
/// The registry has its own synchronization scope, independent of thread and
/// mention state: registration and lookup never contend with thread
/// operations.
#[derive(Debug)]
pub struct AgentRegistry {
    agents: RwLock<HashMap<AgentId, Agent>>,
    count_tx: watch::Sender<usize>,
}

impl AgentRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        let (count_tx, _) = watch::channel(0);
        Self {
            agents: RwLock::new(HashMap::new()),
            count_tx,
        }
    }

    /// Registers a new agent.
    ///
    /// Registration is deliberately not idempotent: a second registration
    /// under the same identifier is an error, and the first registration's
    /// name persists.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::AgentAlreadyRegistered`] when the identifier is
    /// already present.
    pub async fn register(&self, agent: Agent) -> BrokerResult<()> {
        let mut agents = self.agents.write().await;
        if agents.contains_key(agent.id()) {
            return Err(BrokerError::AgentAlreadyRegistered(agent.id().clone()));
        }

        info!(agent_id = %agent.id(), name = agent.name(), "agent registered");
        agents.insert(agent.id().clone(), agent);
        self.count_tx.send_replace(agents.len());
        Ok(())
    }

    /// Looks up a registered agent.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::AgentNotFound`] when the identifier is unknown.
    pub async fn get(&self, id: &AgentId) -> BrokerResult<Agent> {
        self.agents
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| BrokerError::AgentNotFound(id.clone()))
    }

    /// Returns `true` when the agent is registered.
    pub async fn contains(&self, id: &AgentId) -> bool {
        self.agents.read().await.contains_key(id)
    }

    /// Fails with [`BrokerError::AgentNotFound`] unless the agent is
    /// registered.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::AgentNotFound`] when the identifier is unknown.
    pub async fn ensure_registered(&self, id: &AgentId) -> BrokerResult<()> {
        if self.contains(id).await {
            Ok(())
        } else {
            Err(BrokerError::AgentNotFound(id.clone()))
        }
    }

    /// Returns a snapshot of all registered agents, sorted by identifier.
    ///
    /// When `include_details` is false the display names are blanked and only
    /// identifiers carry information.
    pub async fn list(&self, include_details: bool) -> Vec<Agent> {
        let agents = self.agents.read().await;
        let mut listing: Vec<Agent> = if include_details {
            agents.values().cloned().collect()
        } else {
            agents.values().map(Agent::without_details).collect()
        };
        listing.sort_by(|a, b| a.id().cmp(b.id()));
        listing
    }

    /// Returns the number of registered agents.
    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    /// Returns `true` when no agents are registered.
    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }

    /// Blocks until at least `target` agents are registered, or the timeout
    /// elapses.
    ///
    /// Returns `true` once the target count is reached and `false` on
    /// timeout. Registration happening before the call is counted; this is
    /// not edge-triggered.
    pub async fn wait_for_agent_count(&self, target: usize, timeout: Duration) -> bool {
        let mut count_rx = self.count_tx.subscribe();
        if *count_rx.borrow() >= target {
            return true;
        }

        debug!(target_count = target, ?timeout, "waiting for agent count");
        let reached = tokio::time::timeout(timeout, async {
            while count_rx.changed().await.is_ok() {
                if *count_rx.borrow() >= target {
                    return true;
                }
            }
            false
        })
        .await;

        matches!(reached, Ok(true))
    }
}

impl Default for AgentRegistry {
    fn default() -> Self {
        Self::new()
    }
}
