// SPDX-FileCopyrightText: 2026 Flatrelay Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Yes/no confirmation prompts.
//!
//! A handler registers interest in the next message from one author in one
//! conversation, sends its question, then waits. The inbound pump offers
//! every message to the waiter first; a message that answers a pending
//! prompt is consumed and not treated as a command.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use flatrelay_core::{ChannelId, InboundMessage, UserId};
use tokio::sync::oneshot;
use tracing::debug;

type Key = (UserId, ChannelId);

/// Outcome of a confirmation prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Confirmation {
    /// The author answered `Y`.
    Accepted,
    /// The author answered anything else, or a newer prompt replaced this one.
    Declined,
    /// No answer within the timeout.
    TimedOut,
}

/// A registered prompt awaiting its answer.
#[derive(Debug)]
pub struct PendingReply {
    key: Key,
    seq: u64,
    rx: oneshot::Receiver<String>,
}

/// Routes replies to pending confirmation prompts.
#[derive(Clone)]
pub struct ConfirmationWaiter {
    pending: Arc<DashMap<Key, (u64, oneshot::Sender<String>)>>,
    seq: Arc<AtomicU64>,
    timeout: Duration,
}

impl ConfirmationWaiter {
    pub fn new(timeout: Duration) -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            seq: Arc::new(AtomicU64::new(0)),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Registers a prompt for the next message from `author` in `conversation`.
    ///
    /// Must be called before the question is sent. An earlier prompt for the
    /// same pair is dropped and resolves as declined.
    pub fn expect_reply(&self, author: UserId, conversation: ChannelId) -> PendingReply {
        let (tx, rx) = oneshot::channel();
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let key = (author, conversation);
        self.pending.insert(key, (seq, tx));
        PendingReply { key, seq, rx }
    }

    /// Waits for the answer to `pending`.
    pub async fn wait(&self, pending: PendingReply) -> Confirmation {
        let PendingReply { key, seq, rx } = pending;
        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(reply)) if reply.trim().eq_ignore_ascii_case("y") => Confirmation::Accepted,
            Ok(_) => Confirmation::Declined,
            Err(_) => {
                self.pending.remove_if(&key, |_, (s, _)| *s == seq);
                debug!(user_id = %key.0, "confirmation timed out");
                Confirmation::TimedOut
            }
        }
    }

    /// Drops a prompt whose question could not be sent.
    pub fn abandon(&self, pending: PendingReply) {
        self.pending.remove_if(&pending.key, |_, (s, _)| *s == pending.seq);
    }

    /// Hands `msg` to a pending prompt. Returns true when it was consumed.
    pub fn offer(&self, msg: &InboundMessage) -> bool {
        match self.pending.remove(&(msg.author, msg.conversation)) {
            Some((_, (_, tx))) => tx.send(msg.content.clone()).is_ok(),
            None => false,
        }
    }

    /// Number of prompts awaiting an answer.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
