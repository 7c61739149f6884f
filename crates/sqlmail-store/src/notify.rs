//! Commit-time update notification
//!
//! Mutating operations buffer events in memory and hand them to the
//! sink strictly after their transaction commits; nothing is ever
//! published for a rolled-back operation. The sink is an explicitly
//! owned value injected at store construction, not process-wide
//! state; its lifecycle belongs to the embedding server.

use tokio::sync::mpsc;
use tracing::debug;

/// A committed mutation, delivered to other interested sessions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateEvent {
    /// Message/recent counts of a mailbox changed.
    MailboxStatus {
        account: String,
        mailbox: String,
        messages: u32,
        recent: u32,
    },
    /// The flag set of one message changed.
    MessageFlags {
        account: String,
        mailbox: String,
        seqnum: u32,
        flags: Vec<String>,
    },
    /// The message at `seqnum` was expunged. Events from one operation
    /// arrive in descending seqnum order so earlier notifications do
    /// not invalidate later positions.
    Expunge {
        account: String,
        mailbox: String,
        seqnum: u32,
    },
}

/// Delivery channel for [`UpdateEvent`]s.
///
/// `publish` is an awaiting send on a bounded channel: a slow or
/// absent consumer backpressures the committing writer. Size the
/// buffer accordingly. A sink without a channel (headless mode) drops
/// events without error.
#[derive(Clone)]
pub struct UpdateSink {
    tx: Option<mpsc::Sender<UpdateEvent>>,
}

impl UpdateSink {
    /// A sink delivering into a bounded channel, plus the receiving
    /// end for the notification consumer.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<UpdateEvent>) {
        let (tx, rx) = mpsc::channel(buffer);
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that discards all events.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    /// Deliver events in the order they were buffered. Called only
    /// after a successful commit.
    pub async fn publish(&self, events: Vec<UpdateEvent>) {
        let Some(tx) = &self.tx else {
            return;
        };
        for event in events {
            if tx.send(event).await.is_err() {
                // Receiver is gone; remaining events have nowhere to go.
                debug!("update receiver dropped, discarding events");
                return;
            }
        }
    }
}
