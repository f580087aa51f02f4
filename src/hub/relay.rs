//! Relay hub implementation
//!
//! A single task owns the subscriber set. Join, leave and broadcast requests
//! arrive as tagged events on one multi-producer queue and are processed
//! strictly one at a time, which gives every caller the same total order
//! without a lock on the set.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::config::{HubConfig, SlowSubscriberPolicy};
use super::event::{HubEvent, Mailbox, MailboxSender, SubscriberId};
use super::stats::{HubStats, HubStatsSnapshot};

/// The hub task state
pub struct Hub {
    subscribers: HashMap<SubscriberId, MailboxSender>,
    events: mpsc::Receiver<HubEvent>,
    policy: SlowSubscriberPolicy,
    stats: Arc<HubStats>,
}

impl Hub {
    /// Spawn the hub task
    ///
    /// Returns a cloneable handle for producers and connections, and the
    /// task's join handle. The task runs until [`HubHandle::shutdown`] is
    /// called or every handle has been dropped.
    pub fn start(config: HubConfig) -> (HubHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(config.event_capacity);
        let (stop_tx, stop_rx) = watch::channel(false);
        let stats = Arc::new(HubStats::new());

        let hub = Hub {
            subscribers: HashMap::new(),
            events: rx,
            policy: config.slow_subscriber_policy,
            stats: Arc::clone(&stats),
        };

        let handle = HubHandle {
            events: tx,
            stop: Arc::new(stop_tx),
            stats,
            mailbox_capacity: config.mailbox_capacity,
            next_id: Arc::new(AtomicU64::new(1)),
        };

        tracing::info!(
            mailbox_capacity = config.mailbox_capacity,
            policy = ?config.slow_subscriber_policy,
            "Hub started"
        );

        (handle, tokio::spawn(hub.run(stop_rx)))
    }

    async fn run(mut self, mut stop: watch::Receiver<bool>) {
        // A stop request also interrupts a broadcast stalled on a full mailbox
        tokio::select! {
            _ = self.process() => {}
            _ = stop.wait_for(|stopped| *stopped) => {}
        }

        // Dropping the senders closes every mailbox
        let remaining = self.subscribers.len();
        self.subscribers.clear();
        self.stats.reset_active();

        tracing::info!(subscribers = remaining, "Hub stopped");
    }

    async fn process(&mut self) {
        while let Some(event) = self.events.recv().await {
            match event {
                HubEvent::Join { id, mailbox } => self.join(id, mailbox),
                HubEvent::Leave { id } => self.leave(id),
                HubEvent::Broadcast { payload, done } => {
                    let delivered = self.broadcast(payload).await;
                    // Producer may have given up waiting
                    let _ = done.send(delivered);
                }
            }
        }
    }

    fn join(&mut self, id: SubscriberId, mailbox: MailboxSender) {
        let replaced = self.subscribers.insert(id, mailbox).is_some();
        self.stats.record_join(replaced);

        tracing::debug!(
            subscriber = %id,
            replaced = replaced,
            subscribers = self.subscribers.len(),
            "Subscriber joined"
        );
    }

    fn leave(&mut self, id: SubscriberId) {
        if self.subscribers.remove(&id).is_some() {
            self.stats.record_leave();
            tracing::debug!(
                subscriber = %id,
                subscribers = self.subscribers.len(),
                "Subscriber left"
            );
        }
    }

    async fn broadcast(&mut self, payload: Bytes) -> usize {
        let mut delivered = 0;
        let mut dead = Vec::new();

        for (id, mailbox) in &self.subscribers {
            match self.policy {
                SlowSubscriberPolicy::Block => {
                    if mailbox.send(payload.clone()).await.is_ok() {
                        delivered += 1;
                    } else {
                        dead.push(*id);
                    }
                }
                SlowSubscriberPolicy::Disconnect => match mailbox.try_send(payload.clone()) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        tracing::warn!(subscriber = %id, "Mailbox full, dropping subscriber");
                        dead.push(*id);
                    }
                    Err(TrySendError::Closed(_)) => dead.push(*id),
                },
            }
        }

        for id in dead {
            self.subscribers.remove(&id);
            self.stats.record_pruned();
            tracing::debug!(subscriber = %id, "Subscriber pruned");
        }

        self.stats.record_broadcast(delivered);
        delivered
    }
}

/// Handle to a running hub
///
/// Cheap to clone; every clone feeds the same event queue.
#[derive(Clone)]
pub struct HubHandle {
    events: mpsc::Sender<HubEvent>,
    stop: Arc<watch::Sender<bool>>,
    stats: Arc<HubStats>,
    mailbox_capacity: usize,
    next_id: Arc<AtomicU64>,
}

impl HubHandle {
    /// Allocate a fresh subscriber identity
    pub fn next_subscriber_id(&self) -> SubscriberId {
        SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Create a mailbox with the configured capacity
    pub fn mailbox(&self) -> (MailboxSender, Mailbox) {
        mpsc::channel(self.mailbox_capacity)
    }

    /// Register a subscriber
    ///
    /// Registering an id that is already present replaces its mailbox.
    /// Every broadcast submitted after this returns is delivered to it.
    pub async fn join(&self, id: SubscriberId, mailbox: MailboxSender) {
        if self.events.send(HubEvent::Join { id, mailbox }).await.is_err() {
            tracing::debug!(subscriber = %id, "Join after hub stopped");
        }
    }

    /// Create a mailbox, register it under `id` and return its receiving side
    pub async fn subscribe(&self, id: SubscriberId) -> Mailbox {
        let (tx, rx) = self.mailbox();
        self.join(id, tx).await;
        rx
    }

    /// Deregister a subscriber; a no-op if it is not registered
    pub async fn leave(&self, id: SubscriberId) {
        if self.events.send(HubEvent::Leave { id }).await.is_err() {
            tracing::debug!(subscriber = %id, "Leave after hub stopped");
        }
    }

    /// Deliver `payload` to every registered subscriber's mailbox
    ///
    /// Waits until the hub has attempted delivery to all of them and returns
    /// how many mailboxes accepted it. Returns 0 if the hub has stopped.
    pub async fn broadcast(&self, payload: Bytes) -> usize {
        let (done, wait) = oneshot::channel();

        if self
            .events
            .send(HubEvent::Broadcast { payload, done })
            .await
            .is_err()
        {
            tracing::debug!("Broadcast after hub stopped");
            return 0;
        }

        wait.await.unwrap_or(0)
    }

    /// Stop the hub task, closing every mailbox
    ///
    /// Takes effect immediately, without queueing behind pending events: a
    /// broadcast in progress is abandoned and queued ones report 0
    /// deliveries. Returns once the hub task has released its queue.
    pub async fn shutdown(&self) {
        self.stop.send_replace(true);
        self.events.closed().await;
    }

    /// Whether the hub task is still accepting events
    pub fn is_running(&self) -> bool {
        !self.events.is_closed()
    }

    /// Current hub counters
    pub fn stats(&self) -> HubStatsSnapshot {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use std::task::Poll;
    use std::time::Duration;

    use tokio_test::assert_pending;

    use super::*;

    fn payload(n: u8) -> Bytes {
        Bytes::from(vec![n])
    }

    #[tokio::test]
    async fn test_broadcast_reaches_joined_subscribers_in_order() {
        let (hub, _task) = Hub::start(HubConfig::default());
        let mut a = hub.subscribe(SubscriberId(1)).await;
        let mut b = hub.subscribe(SubscriberId(2)).await;

        for n in 0..3 {
            assert_eq!(hub.broadcast(payload(n)).await, 2);
        }

        for n in 0..3 {
            assert_eq!(a.recv().await.unwrap(), payload(n));
            assert_eq!(b.recv().await.unwrap(), payload(n));
        }
    }

    #[tokio::test]
    async fn test_late_joiner_misses_earlier_broadcasts() {
        let (hub, _task) = Hub::start(HubConfig::default());
        let mut early = hub.subscribe(SubscriberId(1)).await;

        hub.broadcast(payload(1)).await;
        let mut late = hub.subscribe(SubscriberId(2)).await;
        hub.broadcast(payload(2)).await;

        assert_eq!(early.recv().await.unwrap(), payload(1));
        assert_eq!(early.recv().await.unwrap(), payload(2));
        assert_eq!(late.recv().await.unwrap(), payload(2));
        assert!(late.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_leave_stops_delivery_and_is_idempotent() {
        let (hub, _task) = Hub::start(HubConfig::default());
        let id = SubscriberId(7);
        let mut rx = hub.subscribe(id).await;

        hub.broadcast(payload(1)).await;
        hub.leave(id).await;
        hub.leave(id).await;
        assert_eq!(hub.broadcast(payload(2)).await, 0);

        assert_eq!(rx.recv().await.unwrap(), payload(1));
        // Hub dropped its sender on leave
        assert!(rx.recv().await.is_none());

        let stats = hub.stats();
        assert_eq!(stats.leaves, 1);
        assert_eq!(stats.active_subscribers, 0);
    }

    #[tokio::test]
    async fn test_duplicate_join_overwrites() {
        let (hub, _task) = Hub::start(HubConfig::default());
        let id = SubscriberId(3);
        let mut first = hub.subscribe(id).await;
        let mut second = hub.subscribe(id).await;

        assert_eq!(hub.broadcast(payload(9)).await, 1);

        assert!(first.recv().await.is_none());
        assert_eq!(second.recv().await.unwrap(), payload(9));
        assert_eq!(hub.stats().active_subscribers, 1);
    }

    #[tokio::test]
    async fn test_closed_mailbox_is_pruned() {
        let (hub, _task) = Hub::start(HubConfig::default());
        let gone = hub.subscribe(SubscriberId(1)).await;
        let mut alive = hub.subscribe(SubscriberId(2)).await;
        drop(gone);

        assert_eq!(hub.broadcast(payload(1)).await, 1);
        assert_eq!(alive.recv().await.unwrap(), payload(1));

        let stats = hub.stats();
        assert_eq!(stats.pruned, 1);
        assert_eq!(stats.active_subscribers, 1);

        // Leaving a pruned subscriber is a no-op
        hub.leave(SubscriberId(1)).await;
        assert_eq!(hub.broadcast(payload(2)).await, 1);
        assert_eq!(hub.stats().leaves, 0);
    }

    #[tokio::test]
    async fn test_full_mailbox_blocks_broadcast() {
        let (hub, _task) = Hub::start(HubConfig::default().mailbox_capacity(1));
        let mut rx = hub.subscribe(SubscriberId(1)).await;

        assert_eq!(hub.broadcast(payload(1)).await, 1);

        let mut pending = tokio_test::task::spawn(hub.broadcast(payload(2)));
        assert_pending!(pending.poll());
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_pending!(pending.poll());

        // A third producer queues up behind the stalled delivery
        let third = tokio::time::timeout(Duration::from_millis(20), hub.broadcast(payload(3))).await;
        assert!(third.is_err());

        assert_eq!(rx.recv().await.unwrap(), payload(1));

        let delivered = loop {
            if let Poll::Ready(n) = pending.poll() {
                break n;
            }
            tokio::task::yield_now().await;
        };
        assert_eq!(delivered, 1);
        assert_eq!(rx.recv().await.unwrap(), payload(2));
        assert_eq!(rx.recv().await.unwrap(), payload(3));
    }

    #[tokio::test]
    async fn test_disconnect_policy_drops_slow_subscriber() {
        let config = HubConfig::default()
            .mailbox_capacity(1)
            .slow_subscriber_policy(SlowSubscriberPolicy::Disconnect);
        let (hub, _task) = Hub::start(config);
        let mut slow = hub.subscribe(SubscriberId(1)).await;
        let mut fast = hub.subscribe(SubscriberId(2)).await;

        assert_eq!(hub.broadcast(payload(1)).await, 2);
        assert_eq!(fast.recv().await.unwrap(), payload(1));

        // slow never drained its single slot
        assert_eq!(hub.broadcast(payload(2)).await, 1);
        assert_eq!(fast.recv().await.unwrap(), payload(2));

        assert_eq!(slow.recv().await.unwrap(), payload(1));
        assert!(slow.recv().await.is_none());
        assert_eq!(hub.stats().pruned, 1);
    }

    #[tokio::test]
    async fn test_shutdown_closes_mailboxes() {
        let (hub, task) = Hub::start(HubConfig::default());
        let mut rx = hub.subscribe(SubscriberId(1)).await;

        hub.shutdown().await;
        task.await.unwrap();

        assert!(rx.recv().await.is_none());
        assert!(!hub.is_running());
        assert_eq!(hub.broadcast(payload(1)).await, 0);
        assert_eq!(hub.stats().active_subscribers, 0);
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_stalled_broadcast() {
        let (hub, task) = Hub::start(HubConfig::default().mailbox_capacity(1));
        let mut rx = hub.subscribe(SubscriberId(1)).await;

        assert_eq!(hub.broadcast(payload(1)).await, 1);
        let stalled = {
            let hub = hub.clone();
            tokio::spawn(async move { hub.broadcast(payload(2)).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!stalled.is_finished());

        tokio::time::timeout(Duration::from_secs(1), hub.shutdown())
            .await
            .expect("shutdown queued behind stalled broadcast");
        task.await.unwrap();

        assert_eq!(stalled.await.unwrap(), 0);
        assert_eq!(rx.recv().await.unwrap(), payload(1));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_subscriber_ids_are_unique() {
        let (hub, _task) = Hub::start(HubConfig::default());
        let other = hub.clone();

        let a = hub.next_subscriber_id();
        let b = other.next_subscriber_id();
        assert_ne!(a, b);
        assert_eq!(b.as_u64(), a.as_u64() + 1);
    }
}
