//! Hub identity and event types

use bytes::Bytes;
use tokio::sync::{mpsc, oneshot};

/// Opaque identity of a hub subscriber
///
/// Only the hub hands these out, through
/// [`HubHandle::next_subscriber_id`](super::HubHandle::next_subscriber_id),
/// so two live connections can never share one:
///
/// ```compile_fail
/// let id = telemetry_relay::SubscriberId(1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub(crate) u64);

impl SubscriberId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Sending side of a subscriber's mailbox, held by the hub
pub type MailboxSender = mpsc::Sender<Bytes>;

/// Receiving side of a subscriber's mailbox, held by the connection's writer half
pub type Mailbox = mpsc::Receiver<Bytes>;

/// Events processed by the hub task, one at a time, in arrival order
#[derive(Debug)]
pub(crate) enum HubEvent {
    Join {
        id: SubscriberId,
        mailbox: MailboxSender,
    },
    Leave {
        id: SubscriberId,
    },
    Broadcast {
        payload: Bytes,
        /// Completed with the number of mailboxes the payload reached
        done: oneshot::Sender<usize>,
    },
}
