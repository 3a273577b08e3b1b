//! In-process coordination broker for multi-agent conversations.
//!
//! Independent agents register themselves, organize into named threads,
//! exchange ordered messages, and block until a message mentioning them
//! arrives. [`ThreadBroker`] is the façade composing the registry, thread
//! store, and mention notifier; everything else in a larger system (wire
//! transports, remote bridges, tool dispatchers) consumes its operations.

#![warn(missing_docs, clippy::pedantic)]

mod config;
mod error;
mod events;
mod notify;
mod registry;
mod request;
mod store;

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use parley_primitives::{Agent, AgentId, MessageId, ThreadId, ThreadSnapshot};
use tokio::sync::broadcast;

pub use config::BrokerConfig;
pub use error::{BrokerError, BrokerResult};
pub use events::BrokerEvent;
pub use notify::{MentionNotifier, WaitOutcome};
pub use registry::AgentRegistry;
pub use request::{BrokerRequest, BrokerResponse};
pub use store::ThreadStore;

use events::EventBus;

/// Façade composing the agent registry, thread store, and mention notifier.
///
/// Every operation validates its inputs before touching state, so a failed
/// call never leaves a partial mutation behind. Operations on different
/// threads proceed independently; only
/// [`wait_for_mentions`](ThreadBroker::wait_for_mentions) suspends, and only
/// for the calling agent.
#[derive(Debug)]
pub struct ThreadBroker {
    config: BrokerConfig,
    registry: Arc<AgentRegistry>,
    notifier: Arc<MentionNotifier>,
    store: ThreadStore,
    events: EventBus,
}

impl ThreadBroker {
    /// Creates a broker with the supplied configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Validation`] when the configuration is
    /// inconsistent.
    pub fn new(config: BrokerConfig) -> BrokerResult<Self> {
        config.validate()?;
        let registry = Arc::new(AgentRegistry::new());
        let notifier = Arc::new(MentionNotifier::new());
        let store = ThreadStore::new(Arc::clone(&registry), Arc::clone(&notifier));
        Ok(Self {
            config,
            registry,
            notifier,
            store,
            events: EventBus::new(config.event_capacity()),
        })
    }

    /// Returns the broker configuration.
    #[must_use]
    pub const fn config(&self) -> BrokerConfig {
        self.config
    }

    /// Subscribes to the broker's event stream.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BrokerEvent> {
        self.events.subscribe()
    }

    /// Registers a new agent under a caller-chosen identifier.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::AgentAlreadyRegistered`] for duplicate
    /// identifiers; the original registration is untouched.
    pub async fn register_agent(
        &self,
        agent_id: AgentId,
        name: impl Into<String>,
    ) -> BrokerResult<()> {
        let agent = Agent::new(agent_id, name);
        self.registry.register(agent.clone()).await?;
        self.notifier.register_agent(agent.id()).await;
        self.events.publish(BrokerEvent::AgentRegistered { agent });
        Ok(())
    }

    /// Creates a thread; the creator is always part of the participant set.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Validation`] for an empty name, or
    /// [`BrokerError::AgentNotFound`] when the creator or a listed
    /// participant is unregistered.
    pub async fn create_thread(
        &self,
        name: &str,
        creator: &AgentId,
        participants: &[AgentId],
    ) -> BrokerResult<ThreadId> {
        let thread_id = self.store.create_thread(name, creator, participants).await?;
        self.events.publish(BrokerEvent::ThreadCreated {
            thread_id,
            name: name.to_owned(),
            creator: creator.clone(),
        });
        Ok(thread_id)
    }

    /// Adds a participant to an open thread.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::ThreadNotFound`], [`BrokerError::ThreadClosed`],
    /// [`BrokerError::AgentNotFound`], or [`BrokerError::AlreadyParticipant`].
    pub async fn add_participant(
        &self,
        thread_id: ThreadId,
        participant: &AgentId,
    ) -> BrokerResult<()> {
        self.store.add_participant(thread_id, participant).await?;
        self.events.publish(BrokerEvent::ParticipantAdded {
            thread_id,
            agent_id: participant.clone(),
        });
        Ok(())
    }

    /// Removes a participant from an open thread.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::ThreadNotFound`], [`BrokerError::ThreadClosed`],
    /// or [`BrokerError::NotParticipant`].
    pub async fn remove_participant(
        &self,
        thread_id: ThreadId,
        participant: &AgentId,
    ) -> BrokerResult<()> {
        self.store.remove_participant(thread_id, participant).await?;
        self.events.publish(BrokerEvent::ParticipantRemoved {
            thread_id,
            agent_id: participant.clone(),
        });
        Ok(())
    }

    /// Closes a thread, storing the summary and releasing any participant
    /// blocked in a wait.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::ThreadNotFound`], or
    /// [`BrokerError::ThreadClosed`] on double close.
    pub async fn close_thread(&self, thread_id: ThreadId, summary: &str) -> BrokerResult<()> {
        self.store.close_thread(thread_id, summary).await?;
        self.events.publish(BrokerEvent::ThreadClosed {
            thread_id,
            summary: summary.to_owned(),
        });
        Ok(())
    }

    /// Appends a message and fans mention notifications out to the mentioned
    /// agents, participants or not.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::ThreadNotFound`], [`BrokerError::ThreadClosed`],
    /// or [`BrokerError::NotParticipant`] when the sender is not a
    /// participant.
    pub async fn send_message(
        &self,
        thread_id: ThreadId,
        sender: &AgentId,
        content: &str,
        mentions: BTreeSet<AgentId>,
    ) -> BrokerResult<MessageId> {
        let message = self
            .store
            .send_message(thread_id, sender, content, mentions)
            .await?;
        let message_id = message.id();
        self.events.publish(BrokerEvent::MessageSent { message });
        Ok(message_id)
    }

    /// Blocks the calling agent until it is mentioned, a thread it
    /// participates in closes, or the timeout elapses.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Validation`] when the timeout exceeds the
    /// configured maximum, [`BrokerError::AgentNotFound`] for unregistered
    /// agents, or [`BrokerError::WaitAlreadyInProgress`] when the agent
    /// already has an outstanding wait.
    pub async fn wait_for_mentions(
        &self,
        agent_id: &AgentId,
        timeout: Duration,
    ) -> BrokerResult<WaitOutcome> {
        if timeout > self.config.max_wait_timeout() {
            return Err(BrokerError::validation(format!(
                "timeout must not exceed {} ms",
                self.config.max_wait_timeout().as_millis()
            )));
        }
        self.notifier.wait_for_mentions(agent_id, timeout).await
    }

    /// Returns a snapshot of all registered agents.
    pub async fn list_agents(&self, include_details: bool) -> Vec<Agent> {
        self.registry.list(include_details).await
    }

    /// Blocks until at least `target` agents are registered or the timeout
    /// elapses; returns whether the target was reached.
    pub async fn wait_for_agent_count(&self, target: usize, timeout: Duration) -> bool {
        self.registry.wait_for_agent_count(target, timeout).await
    }

    /// Returns a point-in-time copy of a thread.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::ThreadNotFound`] for unknown identifiers.
    pub async fn thread(&self, thread_id: ThreadId) -> BrokerResult<ThreadSnapshot> {
        self.store.snapshot(thread_id).await
    }

    /// Returns snapshots of every thread the agent participates in.
    pub async fn threads_for_agent(&self, agent_id: &AgentId) -> Vec<ThreadSnapshot> {
        self.store.threads_for_agent(agent_id).await
    }

    /// Dispatches a request to the matching operation.
    ///
    /// This is the single entry point for transport bridges: exhaustive over
    /// [`BrokerRequest`], so adding an operation is a compile error until it
    /// is routed here.
    ///
    /// # Errors
    ///
    /// Propagates the dispatched operation's error; additionally returns
    /// [`BrokerError::Validation`] for a negative `timeout_ms`.
    pub async fn dispatch(&self, request: BrokerRequest) -> BrokerResult<BrokerResponse> {
        match request {
            BrokerRequest::RegisterAgent {
                agent_id,
                agent_name,
            } => {
                self.register_agent(agent_id, agent_name).await?;
                Ok(BrokerResponse::Registered)
            }
            BrokerRequest::CreateThread {
                thread_name,
                creator_id,
                participant_ids,
            } => {
                let thread_id = self
                    .create_thread(&thread_name, &creator_id, &participant_ids)
                    .await?;
                Ok(BrokerResponse::ThreadCreated { thread_id })
            }
            BrokerRequest::AddParticipant {
                thread_id,
                participant_id,
            } => {
                self.add_participant(thread_id, &participant_id).await?;
                Ok(BrokerResponse::ParticipantAdded)
            }
            BrokerRequest::RemoveParticipant {
                thread_id,
                participant_id,
            } => {
                self.remove_participant(thread_id, &participant_id).await?;
                Ok(BrokerResponse::ParticipantRemoved)
            }
            BrokerRequest::CloseThread { thread_id, summary } => {
                self.close_thread(thread_id, &summary).await?;
                Ok(BrokerResponse::ThreadClosed)
            }
            BrokerRequest::SendMessage {
                thread_id,
                sender_id,
                content,
                mentions,
            } => {
                let message_id = self
                    .send_message(thread_id, &sender_id, &content, mentions)
                    .await?;
                Ok(BrokerResponse::MessageSent { message_id })
            }
            BrokerRequest::WaitForMentions {
                agent_id,
                timeout_ms,
            } => {
                let timeout = match timeout_ms {
                    None => self.config.default_wait_timeout(),
                    Some(ms) => {
                        let Ok(millis) = u64::try_from(ms) else {
                            return Err(BrokerError::validation("timeout must be non-negative"));
                        };
                        Duration::from_millis(millis)
                    }
                };
                let outcome = self.wait_for_mentions(&agent_id, timeout).await?;
                Ok(BrokerResponse::Wait { outcome })
            }
            BrokerRequest::ListAgents { include_details } => Ok(BrokerResponse::Agents {
                agents: self.list_agents(include_details).await,
            }),
        }
    }
}

impl Default for ThreadBroker {
    fn default() -> Self {
        Self::new(BrokerConfig::default()).expect("default config is valid")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(id: &str) -> AgentId {
        AgentId::new(id).unwrap()
    }

    #[tokio::test]
    async fn dispatch_covers_the_full_surface() {
        let broker = ThreadBroker::default();

        let response = broker
            .dispatch(BrokerRequest::RegisterAgent {
                agent_id: agent("a1"),
                agent_name: "Planner".into(),
            })
            .await
            .unwrap();
        assert_eq!(response, BrokerResponse::Registered);
        broker
            .dispatch(BrokerRequest::RegisterAgent {
                agent_id: agent("a2"),
                agent_name: "Reviewer".into(),
            })
            .await
            .unwrap();

        let response = broker
            .dispatch(BrokerRequest::CreateThread {
                thread_name: "general".into(),
                creator_id: agent("a1"),
                participant_ids: vec![agent("a2")],
            })
            .await
            .unwrap();
        let BrokerResponse::ThreadCreated { thread_id } = response else {
            panic!("expected thread id");
        };

        let response = broker
            .dispatch(BrokerRequest::SendMessage {
                thread_id,
                sender_id: agent("a1"),
                content: "hello".into(),
                mentions: [agent("a2")].into_iter().collect(),
            })
            .await
            .unwrap();
        assert!(matches!(response, BrokerResponse::MessageSent { .. }));

        let response = broker
            .dispatch(BrokerRequest::WaitForMentions {
                agent_id: agent("a2"),
                timeout_ms: Some(1_000),
            })
            .await
            .unwrap();
        let BrokerResponse::Wait {
            outcome: WaitOutcome::Mentions { messages },
        } = response
        else {
            panic!("expected mentions");
        };
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content(), "hello");

        let response = broker
            .dispatch(BrokerRequest::ListAgents {
                include_details: false,
            })
            .await
            .unwrap();
        let BrokerResponse::Agents { agents } = response else {
            panic!("expected agents");
        };
        assert_eq!(agents.len(), 2);
        assert!(agents.iter().all(|a| a.name().is_empty()));

        broker
            .dispatch(BrokerRequest::CloseThread {
                thread_id,
                summary: "done".into(),
            })
            .await
            .unwrap();
        let err = broker
            .dispatch(BrokerRequest::SendMessage {
                thread_id,
                sender_id: agent("a1"),
                content: "late".into(),
                mentions: BTreeSet::new(),
            })
            .await
            .expect_err("closed thread");
        assert!(matches!(err, BrokerError::ThreadClosed(_)));
    }

    #[tokio::test]
    async fn negative_timeout_is_rejected_before_any_wait() {
        let broker = ThreadBroker::default();
        broker.register_agent(agent("a1"), "one").await.unwrap();

        let err = broker
            .dispatch(BrokerRequest::WaitForMentions {
                agent_id: agent("a1"),
                timeout_ms: Some(-1),
            })
            .await
            .expect_err("negative timeout");
        assert!(matches!(err, BrokerError::Validation(_)));
    }

    #[tokio::test]
    async fn omitted_timeout_falls_back_to_configured_default() {
        let config = BrokerConfig::new(Duration::from_millis(50), Duration::from_secs(5));
        let broker = ThreadBroker::new(config).unwrap();
        broker.register_agent(agent("a1"), "one").await.unwrap();

        // With nothing queued the wait must resolve on the configured
        // 50 ms default, well inside the guard below.
        let response = tokio::time::timeout(
            Duration::from_secs(1),
            broker.dispatch(BrokerRequest::WaitForMentions {
                agent_id: agent("a1"),
                timeout_ms: None,
            }),
        )
        .await
        .expect("wait must use the configured default timeout")
        .unwrap();
        assert_eq!(
            response,
            BrokerResponse::Wait {
                outcome: WaitOutcome::TimedOut
            }
        );
    }

    #[tokio::test]
    async fn oversized_timeout_is_rejected() {
        let broker = ThreadBroker::default();
        broker.register_agent(agent("a1"), "one").await.unwrap();

        let beyond = broker.config().max_wait_timeout() + Duration::from_millis(1);
        let err = broker
            .wait_for_mentions(&agent("a1"), beyond)
            .await
            .expect_err("oversized timeout");
        assert!(matches!(err, BrokerError::Validation(_)));
    }

    #[tokio::test]
    async fn events_follow_operations() {
        let broker = ThreadBroker::default();
        let mut events = broker.subscribe();

        broker.register_agent(agent("a1"), "one").await.unwrap();
        let thread_id = broker
            .create_thread("general", &agent("a1"), &[])
            .await
            .unwrap();
        broker
            .send_message(thread_id, &agent("a1"), "hello", BTreeSet::new())
            .await
            .unwrap();
        broker.close_thread(thread_id, "done").await.unwrap();

        assert!(matches!(
            events.recv().await.unwrap(),
            BrokerEvent::AgentRegistered { .. }
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            BrokerEvent::ThreadCreated { .. }
        ));
        let BrokerEvent::MessageSent { message } = events.recv().await.unwrap() else {
            panic!("expected message event");
        };
        assert_eq!(message.content(), "hello");
        assert!(matches!(
            events.recv().await.unwrap(),
            BrokerEvent::ThreadClosed { .. }
        ));
    }

    #[tokio::test]
    async fn failed_calls_leave_no_partial_state() {
        let broker = ThreadBroker::default();
        broker.register_agent(agent("a1"), "one").await.unwrap();

        // Participant validation fails after the creator check; no thread
        // must exist afterwards.
        let err = broker
            .create_thread("general", &agent("a1"), &[agent("ghost")])
            .await
            .expect_err("ghost participant");
        assert!(matches!(err, BrokerError::AgentNotFound(_)));
        assert!(broker.threads_for_agent(&agent("a1")).await.is_empty());
    }
}
