//! Per-agent mention queues and the blocking wait primitive.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parley_primitives::{AgentId, Message, ThreadId};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock, oneshot};
use tracing::{debug, trace};

use crate::error::{BrokerError, BrokerResult};

/// Outcome of a single bounded wait for mentions.
///
/// Timeouts and close notices are normal protocol outcomes, not errors: the
/// agent returns to its idle state and may wait again.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum WaitOutcome {
    /// The pending queue was drained; every message mentions the waiter.
    Mentions {
        /// Drained mentions, in enqueue order.
        messages: Vec<Message>,
    },
    /// The timeout elapsed with nothing to deliver. No messages were
    /// consumed.
    TimedOut,
    /// A thread the agent participates in closed while the agent was
    /// blocked.
    ThreadClosed {
        /// The thread whose closure released the wait.
        thread_id: ThreadId,
    },
}

/// Reason a parked waiter is released.
#[derive(Debug, Clone, Copy)]
enum WakeReason {
    Mention,
    ThreadClosed(ThreadId),
}

/// Queue and wait slot for one agent.
///
/// Both live under a single mutex so that enqueue-then-signal is atomic with
/// respect to a concurrent wait registering its slot: a signal can never be
/// lost between the queue check and the park.
#[derive(Debug, Default)]
struct MentionSlot {
    queue: VecDeque<Message>,
    waiter: Option<oneshot::Sender<WakeReason>>,
}

impl MentionSlot {
    fn drain(&mut self) -> Vec<Message> {
        self.queue.drain(..).collect()
    }

    fn wake(&mut self, reason: WakeReason) {
        if let Some(tx) = self.waiter.take() {
            // The receiver may already have given up; that is fine, the
            // queue still holds anything enqueued.
            let _ = tx.send(reason);
        }
    }
}

/// Routes mention notifications to blocked agents.
///
/// One pending-mention queue and at most one outstanding wait per agent.
#[derive(Debug, Default)]
pub struct MentionNotifier {
    slots: RwLock<HashMap<AgentId, Arc<Mutex<MentionSlot>>>>,
}

impl MentionNotifier {
    /// Creates a notifier with no registered agents.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates the mention slot for a newly registered agent.
    ///
    /// Idempotent: re-registering an existing slot keeps its queue.
    pub async fn register_agent(&self, agent_id: &AgentId) {
        let mut slots = self.slots.write().await;
        slots
            .entry(agent_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(MentionSlot::default())));
    }

    async fn slot(&self, agent_id: &AgentId) -> BrokerResult<Arc<Mutex<MentionSlot>>> {
        self.slots
            .read()
            .await
            .get(agent_id)
            .cloned()
            .ok_or_else(|| BrokerError::AgentNotFound(agent_id.clone()))
    }

    /// Enqueues a message for a mentioned agent and wakes its waiter, if any.
    ///
    /// Mentions addressed to identifiers with no registered slot are dropped;
    /// there is no queue to hold them and no agent that could ever drain it.
    pub async fn enqueue(&self, agent_id: &AgentId, message: Message) {
        let Ok(slot) = self.slot(agent_id).await else {
            debug!(
                agent_id = %agent_id,
                message_id = %message.id(),
                "dropping mention for unregistered agent"
            );
            return;
        };

        let mut guard = slot.lock().await;
        trace!(
            agent_id = %agent_id,
            message_id = %message.id(),
            queued = guard.queue.len() + 1,
            "mention enqueued"
        );
        guard.queue.push_back(message);
        guard.wake(WakeReason::Mention);
    }

    /// Releases the agent's outstanding wait with a closed-thread notice.
    ///
    /// No-op when the agent is not currently blocked; close notices are not
    /// queued.
    pub async fn notify_thread_closed(&self, agent_id: &AgentId, thread_id: ThreadId) {
        if let Ok(slot) = self.slot(agent_id).await {
            let mut guard = slot.lock().await;
            guard.wake(WakeReason::ThreadClosed(thread_id));
        }
    }

    /// Blocks until the agent is mentioned, a thread it participates in
    /// closes, or the timeout elapses.
    ///
    /// A non-empty pending queue is drained and returned immediately without
    /// blocking, which also closes the race against mentions enqueued before
    /// the wait began. On timeout no messages are consumed; anything that
    /// arrives late stays queued for the next wait.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::AgentNotFound`] for unregistered agents and
    /// [`BrokerError::WaitAlreadyInProgress`] when the agent already has an
    /// outstanding wait.
    pub async fn wait_for_mentions(
        &self,
        agent_id: &AgentId,
        timeout: Duration,
    ) -> BrokerResult<WaitOutcome> {
        let slot = self.slot(agent_id).await?;

        let rx = {
            let mut guard = slot.lock().await;
            if !guard.queue.is_empty() {
                return Ok(WaitOutcome::Mentions {
                    messages: guard.drain(),
                });
            }
            // A sender whose receiver is gone belongs to a wait that was
            // cancelled by dropping its future; it no longer counts as
            // outstanding.
            if guard.waiter.as_ref().is_some_and(|tx| !tx.is_closed()) {
                return Err(BrokerError::WaitAlreadyInProgress(agent_id.clone()));
            }
            let (tx, rx) = oneshot::channel();
            guard.waiter = Some(tx);
            rx
        };

        debug!(agent_id = %agent_id, ?timeout, "agent parked waiting for mentions");
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(WakeReason::Mention)) => {
                let mut guard = slot.lock().await;
                Ok(WaitOutcome::Mentions {
                    messages: guard.drain(),
                })
            }
            Ok(Ok(WakeReason::ThreadClosed(thread_id))) => {
                let mut guard = slot.lock().await;
                if guard.queue.is_empty() {
                    Ok(WaitOutcome::ThreadClosed { thread_id })
                } else {
                    // A mention can land in the same instant as the close
                    // wake; deliver it instead of the notice.
                    Ok(WaitOutcome::Mentions {
                        messages: guard.drain(),
                    })
                }
            }
            // Sender dropped without a wake, or the timer fired. Clear the
            // slot so the agent may wait again; a wake that raced the timer
            // has already left its messages queued. A successor wait may have
            // installed a live sender between the timer firing and this lock,
            // so only a closed sender (this wait's own, orphaned by the
            // receiver drop above) is removed.
            Ok(Err(_)) | Err(_) => {
                let mut guard = slot.lock().await;
                if guard.waiter.as_ref().is_some_and(oneshot::Sender::is_closed) {
                    guard.waiter = None;
                }
                Ok(WaitOutcome::TimedOut)
            }
        }
    }
}
