//! Thread entities: participants, message logs, and lifecycle.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use parley_primitives::{AgentId, Message, ThreadId, ThreadSnapshot, ThreadStatus};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::error::{BrokerError, BrokerResult};
use crate::notify::MentionNotifier;
use crate::registry::AgentRegistry;

/// Mutable state of a single thread, guarded by its own mutex.
#[derive(Debug)]
struct ThreadState {
    id: ThreadId,
    name: String,
    creator: AgentId,
    participants: BTreeSet<AgentId>,
    messages: Vec<Message>,
    status: ThreadStatus,
    summary: Option<String>,
}

impl ThreadState {
    fn snapshot(&self) -> ThreadSnapshot {
        ThreadSnapshot::new(
            self.id,
            self.name.clone(),
            self.creator.clone(),
            self.participants.clone(),
            self.messages.clone(),
            self.status,
            self.summary.clone(),
        )
    }

    fn ensure_open(&self) -> BrokerResult<()> {
        if self.status.is_closed() {
            Err(BrokerError::ThreadClosed(self.id))
        } else {
            Ok(())
        }
    }
}

/// Owns every thread as an independently locked entity.
///
/// The outer map is only held long enough to resolve a thread identifier to
/// its entity; all mutation happens under the per-thread mutex, so operations
/// on different threads never serialize against each other.
#[derive(Debug)]
pub struct ThreadStore {
    registry: Arc<AgentRegistry>,
    notifier: Arc<MentionNotifier>,
    threads: RwLock<HashMap<ThreadId, Arc<Mutex<ThreadState>>>>,
}

impl ThreadStore {
    /// Creates a store validating participants against `registry` and fanning
    /// mention notifications out to `notifier`.
    #[must_use]
    pub fn new(registry: Arc<AgentRegistry>, notifier: Arc<MentionNotifier>) -> Self {
        Self {
            registry,
            notifier,
            threads: RwLock::new(HashMap::new()),
        }
    }

    async fn entry(&self, thread_id: ThreadId) -> BrokerResult<Arc<Mutex<ThreadState>>> {
        self.threads
            .read()
            .await
            .get(&thread_id)
            .cloned()
            .ok_or(BrokerError::ThreadNotFound(thread_id))
    }

    /// Creates a new open thread.
    ///
    /// The creator is always part of the participant set, whether or not it
    /// appears in `participants`.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::Validation`] for an empty name and
    /// [`BrokerError::AgentNotFound`] when the creator or any listed
    /// participant is unregistered. Nothing is created on failure.
    pub async fn create_thread(
        &self,
        name: &str,
        creator: &AgentId,
        participants: &[AgentId],
    ) -> BrokerResult<ThreadId> {
        if name.trim().is_empty() {
            return Err(BrokerError::validation("thread name cannot be empty"));
        }
        self.registry.ensure_registered(creator).await?;
        for participant in participants {
            self.registry.ensure_registered(participant).await?;
        }

        let mut members: BTreeSet<AgentId> = participants.iter().cloned().collect();
        members.insert(creator.clone());

        let thread_id = ThreadId::random();
        let state = ThreadState {
            id: thread_id,
            name: name.to_owned(),
            creator: creator.clone(),
            participants: members,
            messages: Vec::new(),
            status: ThreadStatus::Open,
            summary: None,
        };

        self.threads
            .write()
            .await
            .insert(thread_id, Arc::new(Mutex::new(state)));
        info!(thread_id = %thread_id, name, creator = %creator, "thread created");
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
        let entry = self.entry(thread_id).await?;
        let mut thread = entry.lock().await;
        thread.ensure_open()?;
        self.registry.ensure_registered(participant).await?;
        if thread.participants.contains(participant) {
            return Err(BrokerError::AlreadyParticipant {
                thread_id,
                agent_id: participant.clone(),
            });
        }

        thread.participants.insert(participant.clone());
        debug!(thread_id = %thread_id, agent_id = %participant, "participant added");
        Ok(())
    }

    /// Removes a participant from an open thread.
    ///
    /// Removing the last participant is permitted and does not close the
    /// thread; closing is an explicit act.
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
        let entry = self.entry(thread_id).await?;
        let mut thread = entry.lock().await;
        thread.ensure_open()?;
        if !thread.participants.remove(participant) {
            return Err(BrokerError::NotParticipant {
                thread_id,
                agent_id: participant.clone(),
            });
        }

        debug!(thread_id = %thread_id, agent_id = %participant, "participant removed");
        Ok(())
    }

    /// Closes a thread, storing the summary and releasing any participant
    /// currently blocked in a wait with a closed-thread notice.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::ThreadNotFound`], or
    /// [`BrokerError::ThreadClosed`] when the thread was already closed.
    pub async fn close_thread(&self, thread_id: ThreadId, summary: &str) -> BrokerResult<()> {
        let entry = self.entry(thread_id).await?;
        let mut thread = entry.lock().await;
        thread.ensure_open()?;

        thread.status = ThreadStatus::Closed;
        thread.summary = Some(summary.to_owned());
        info!(thread_id = %thread_id, "thread closed");

        for participant in &thread.participants {
            self.notifier
                .notify_thread_closed(participant, thread_id)
                .await;
        }
        Ok(())
    }

    /// Appends a message to an open thread and enqueues it for every
    /// mentioned agent.
    ///
    /// Mentioned agents need not be participants. The notifier enqueue
    /// happens under the thread lock, so two sends to the same thread deliver
    /// their mentions in sequence order.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::ThreadNotFound`], [`BrokerError::ThreadClosed`],
    /// or [`BrokerError::NotParticipant`] when the sender is not in the
    /// participant set.
    pub async fn send_message(
        &self,
        thread_id: ThreadId,
        sender: &AgentId,
        content: &str,
        mentions: BTreeSet<AgentId>,
    ) -> BrokerResult<Message> {
        let entry = self.entry(thread_id).await?;
        let mut thread = entry.lock().await;
        thread.ensure_open()?;
        if !thread.participants.contains(sender) {
            return Err(BrokerError::NotParticipant {
                thread_id,
                agent_id: sender.clone(),
            });
        }

        let seq = thread.messages.len() as u64;
        let message = Message::new(thread_id, sender.clone(), content, mentions, seq);
        thread.messages.push(message.clone());
        debug!(
            thread_id = %thread_id,
            message_id = %message.id(),
            sender = %sender,
            seq,
            mentions = message.mentions().len(),
            "message appended"
        );

        for mentioned in message.mentions() {
            self.notifier.enqueue(mentioned, message.clone()).await;
        }
        Ok(message)
    }

    /// Returns a point-in-time copy of the thread.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::ThreadNotFound`] for unknown identifiers.
    pub async fn snapshot(&self, thread_id: ThreadId) -> BrokerResult<ThreadSnapshot> {
        let entry = self.entry(thread_id).await?;
        let thread = entry.lock().await;
        Ok(thread.snapshot())
    }

    /// Returns snapshots of every thread the agent currently participates in.
    pub async fn threads_for_agent(&self, agent_id: &AgentId) -> Vec<ThreadSnapshot> {
        let entries: Vec<Arc<Mutex<ThreadState>>> =
            self.threads.read().await.values().cloned().collect();

        let mut snapshots = Vec::new();
        for entry in entries {
            let thread = entry.lock().await;
            if thread.participants.contains(agent_id) {
                snapshots.push(thread.snapshot());
            }
        }
        snapshots.sort_by_key(ThreadSnapshot::id);
        snapshots
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_primitives::Agent;

    fn agent_id(id: &str) -> AgentId {
        AgentId::new(id).unwrap()
    }

    async fn store_with(agents: &[&str]) -> ThreadStore {
        let registry = Arc::new(AgentRegistry::new());
        let notifier = Arc::new(MentionNotifier::new());
        for id in agents {
            registry
                .register(Agent::new(agent_id(id), *id))
                .await
                .unwrap();
            notifier.register_agent(&agent_id(id)).await;
        }
        ThreadStore::new(registry, notifier)
    }

    #[tokio::test]
    async fn creator_is_always_a_participant() {
        let store = store_with(&["a1", "a2"]).await;
        let thread_id = store
            .create_thread("general", &agent_id("a1"), &[agent_id("a2")])
            .await
            .unwrap();

        let snapshot = store.snapshot(thread_id).await.unwrap();
        assert!(snapshot.participants().contains(&agent_id("a1")));
        assert!(snapshot.participants().contains(&agent_id("a2")));

        // Creator omitted from the explicit list is still forced in.
        let thread_id = store
            .create_thread("side", &agent_id("a1"), &[])
            .await
            .unwrap();
        let snapshot = store.snapshot(thread_id).await.unwrap();
        assert_eq!(snapshot.participants().len(), 1);
    }

    #[tokio::test]
    async fn create_thread_validates_inputs() {
        let store = store_with(&["a1"]).await;

        let err = store
            .create_thread("  ", &agent_id("a1"), &[])
            .await
            .expect_err("empty name");
        assert!(matches!(err, BrokerError::Validation(_)));

        let err = store
            .create_thread("general", &agent_id("ghost"), &[])
            .await
            .expect_err("unregistered creator");
        assert!(matches!(err, BrokerError::AgentNotFound(_)));

        let err = store
            .create_thread("general", &agent_id("a1"), &[agent_id("ghost")])
            .await
            .expect_err("unregistered participant");
        assert!(matches!(err, BrokerError::AgentNotFound(_)));
    }

    #[tokio::test]
    async fn participant_membership_errors() {
        let store = store_with(&["a1", "a2"]).await;
        let thread_id = store
            .create_thread("general", &agent_id("a1"), &[])
            .await
            .unwrap();

        store
            .add_participant(thread_id, &agent_id("a2"))
            .await
            .unwrap();
        let err = store
            .add_participant(thread_id, &agent_id("a2"))
            .await
            .expect_err("duplicate participant");
        assert!(matches!(err, BrokerError::AlreadyParticipant { .. }));

        let err = store
            .add_participant(thread_id, &agent_id("ghost"))
            .await
            .expect_err("unregistered participant");
        assert!(matches!(err, BrokerError::AgentNotFound(_)));

        store
            .remove_participant(thread_id, &agent_id("a2"))
            .await
            .unwrap();
        let err = store
            .remove_participant(thread_id, &agent_id("a2"))
            .await
            .expect_err("not a participant");
        assert!(matches!(err, BrokerError::NotParticipant { .. }));
    }

    #[tokio::test]
    async fn removing_last_participant_leaves_thread_open() {
        let store = store_with(&["a1"]).await;
        let thread_id = store
            .create_thread("solo", &agent_id("a1"), &[])
            .await
            .unwrap();

        store
            .remove_participant(thread_id, &agent_id("a1"))
            .await
            .unwrap();
        let snapshot = store.snapshot(thread_id).await.unwrap();
        assert!(snapshot.participants().is_empty());
        assert!(!snapshot.status().is_closed());
    }

    #[tokio::test]
    async fn closed_thread_rejects_all_mutation() {
        let store = store_with(&["a1", "a2"]).await;
        let thread_id = store
            .create_thread("general", &agent_id("a1"), &[])
            .await
            .unwrap();
        store.close_thread(thread_id, "done").await.unwrap();

        let err = store
            .send_message(thread_id, &agent_id("a1"), "late", BTreeSet::new())
            .await
            .expect_err("creator send after close");
        assert!(matches!(err, BrokerError::ThreadClosed(_)));

        let err = store
            .add_participant(thread_id, &agent_id("a2"))
            .await
            .expect_err("add after close");
        assert!(matches!(err, BrokerError::ThreadClosed(_)));

        let err = store
            .remove_participant(thread_id, &agent_id("a1"))
            .await
            .expect_err("remove after close");
        assert!(matches!(err, BrokerError::ThreadClosed(_)));

        let err = store
            .close_thread(thread_id, "again")
            .await
            .expect_err("double close");
        assert!(matches!(err, BrokerError::ThreadClosed(_)));

        let snapshot = store.snapshot(thread_id).await.unwrap();
        assert!(snapshot.messages().is_empty());
        assert_eq!(snapshot.summary(), Some("done"));
    }

    #[tokio::test]
    async fn sender_must_be_a_participant() {
        let store = store_with(&["a1", "a2"]).await;
        let thread_id = store
            .create_thread("general", &agent_id("a1"), &[])
            .await
            .unwrap();

        let err = store
            .send_message(thread_id, &agent_id("a2"), "hi", BTreeSet::new())
            .await
            .expect_err("non-participant send");
        assert!(matches!(err, BrokerError::NotParticipant { .. }));

        // A removed participant loses send rights too.
        store
            .add_participant(thread_id, &agent_id("a2"))
            .await
            .unwrap();
        store
            .send_message(thread_id, &agent_id("a2"), "hi", BTreeSet::new())
            .await
            .unwrap();
        store
            .remove_participant(thread_id, &agent_id("a2"))
            .await
            .unwrap();
        let err = store
            .send_message(thread_id, &agent_id("a2"), "hi again", BTreeSet::new())
            .await
            .expect_err("removed participant send");
        assert!(matches!(err, BrokerError::NotParticipant { .. }));
    }

    #[tokio::test]
    async fn sequence_numbers_are_gap_free() {
        let store = store_with(&["a1"]).await;
        let thread_id = store
            .create_thread("general", &agent_id("a1"), &[])
            .await
            .unwrap();

        for expected in 0..5 {
            let message = store
                .send_message(thread_id, &agent_id("a1"), "tick", BTreeSet::new())
                .await
                .unwrap();
            assert_eq!(message.seq(), expected);
        }

        let snapshot = store.snapshot(thread_id).await.unwrap();
        let seqs: Vec<u64> = snapshot.messages().iter().map(Message::seq).collect();
        assert_eq!(seqs, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn threads_for_agent_tracks_membership() {
        let store = store_with(&["a1", "a2"]).await;
        let first = store
            .create_thread("one", &agent_id("a1"), &[agent_id("a2")])
            .await
            .unwrap();
        store
            .create_thread("two", &agent_id("a1"), &[])
            .await
            .unwrap();

        let threads = store.threads_for_agent(&agent_id("a2")).await;
        assert_eq!(threads.len(), 1);
        assert_eq!(threads[0].id(), first);

        assert_eq!(store.threads_for_agent(&agent_id("a1")).await.len(), 2);
    }
}
