//! Hub counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Counters updated by the hub task, readable from anywhere
#[derive(Debug, Default)]
pub struct HubStats {
    active_subscribers: AtomicU64,
    joins: AtomicU64,
    leaves: AtomicU64,
    broadcasts: AtomicU64,
    deliveries: AtomicU64,
    pruned: AtomicU64,
}

impl HubStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_join(&self, replaced: bool) {
        self.joins.fetch_add(1, Ordering::Relaxed);
        if !replaced {
            self.active_subscribers.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_leave(&self) {
        self.leaves.fetch_add(1, Ordering::Relaxed);
        self.active_subscribers.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record_pruned(&self) {
        self.pruned.fetch_add(1, Ordering::Relaxed);
        self.active_subscribers.fetch_sub(1, Ordering::Relaxed);
    }

    pub(crate) fn record_broadcast(&self, delivered: usize) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.deliveries.fetch_add(delivered as u64, Ordering::Relaxed);
    }

    pub(crate) fn reset_active(&self) {
        self.active_subscribers.store(0, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> HubStatsSnapshot {
        HubStatsSnapshot {
            active_subscribers: self.active_subscribers.load(Ordering::Relaxed),
            joins: self.joins.load(Ordering::Relaxed),
            leaves: self.leaves.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            pruned: self.pruned.load(Ordering::Relaxed),
        }
    }
}

/// Serializable copy of [`HubStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HubStatsSnapshot {
    /// Subscribers currently in the set
    pub active_subscribers: u64,
    /// Join events processed (including overwrites)
    pub joins: u64,
    /// Leave events that removed a subscriber
    pub leaves: u64,
    /// Broadcast events processed
    pub broadcasts: u64,
    /// Envelopes enqueued into mailboxes
    pub deliveries: u64,
    /// Subscribers removed because their mailbox was closed or full
    pub pruned: u64,
}
