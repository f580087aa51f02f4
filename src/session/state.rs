//! Connection state machine
//!
//! Tracks a subscriber connection from transport upgrade to teardown:
//! `Upgrading → Active → Closing → Closed`. Transitions only move forward,
//! so repeated teardown requests are harmless.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::hub::SubscriberId;

/// Connection lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionPhase {
    /// Transport handshake in progress, not yet registered with the hub
    Upgrading,
    /// Registered with the hub, both halves running
    Active,
    /// A half has stopped, teardown in progress
    Closing,
    /// Deregistered and released
    Closed,
}

/// Why a connection was torn down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Peer closed the transport
    PeerClosed,
    /// Reading from the peer failed
    ReadFault(String),
    /// The hub closed this subscriber's mailbox
    MailboxClosed,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::PeerClosed => write!(f, "peer closed"),
            CloseReason::ReadFault(e) => write!(f, "read fault: {}", e),
            CloseReason::MailboxClosed => write!(f, "mailbox closed"),
        }
    }
}

/// Lifecycle state of one connection
#[derive(Debug)]
pub struct ConnectionState {
    /// Hub identity of this connection
    pub id: SubscriberId,

    /// Current phase
    pub phase: ConnectionPhase,

    /// When the connection object was created
    pub created_at: Instant,

    /// When the connection became active
    pub activated_at: Option<Instant>,

    /// Why the connection is closing, once known
    pub close_reason: Option<CloseReason>,
}

impl ConnectionState {
    pub fn new(id: SubscriberId) -> Self {
        Self {
            id,
            phase: ConnectionPhase::Upgrading,
            created_at: Instant::now(),
            activated_at: None,
            close_reason: None,
        }
    }

    /// Upgrade finished and subscriber registered
    pub fn activate(&mut self) {
        if self.phase == ConnectionPhase::Upgrading {
            self.phase = ConnectionPhase::Active;
            self.activated_at = Some(Instant::now());
        }
    }

    /// Start teardown. Returns `false` if teardown had already started.
    pub fn begin_close(&mut self, reason: CloseReason) -> bool {
        if self.phase >= ConnectionPhase::Closing {
            return false;
        }
        self.phase = ConnectionPhase::Closing;
        self.close_reason = Some(reason);
        true
    }

    /// Teardown complete
    pub fn finish_close(&mut self) {
        self.phase = ConnectionPhase::Closed;
    }

    pub fn is_active(&self) -> bool {
        self.phase == ConnectionPhase::Active
    }

    /// Time spent active so far
    pub fn active_duration(&self) -> Duration {
        self.activated_at
            .map(|t| t.elapsed())
            .unwrap_or(Duration::ZERO)
    }
}

/// Counters shared by a connection's two halves
#[derive(Debug, Default)]
pub struct ConnectionStats {
    forwarded: AtomicU64,
    filtered: AtomicU64,
    undecodable: AtomicU64,
    write_failures: AtomicU64,
    filter_updates: AtomicU64,
    malformed_controls: AtomicU64,
}

impl ConnectionStats {
    pub(crate) fn inc_forwarded(&self) {
        self.forwarded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_filtered(&self) {
        self.filtered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_undecodable(&self) {
        self.undecodable.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_write_failures(&self) {
        self.write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_filter_updates(&self) {
        self.filter_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn inc_malformed_controls(&self) {
        self.malformed_controls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ConnectionStatsSnapshot {
        ConnectionStatsSnapshot {
            forwarded: self.forwarded.load(Ordering::Relaxed),
            filtered: self.filtered.load(Ordering::Relaxed),
            undecodable: self.undecodable.load(Ordering::Relaxed),
            write_failures: self.write_failures.load(Ordering::Relaxed),
            filter_updates: self.filter_updates.load(Ordering::Relaxed),
            malformed_controls: self.malformed_controls.load(Ordering::Relaxed),
        }
    }
}

/// Copy of [`ConnectionStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStatsSnapshot {
    /// Envelopes sent to the peer
    pub forwarded: u64,
    /// Envelopes discarded by the filter
    pub filtered: u64,
    /// Envelopes whose header could not be decoded
    pub undecodable: u64,
    /// Sends that failed (envelope dropped)
    pub write_failures: u64,
    /// Control frames applied
    pub filter_updates: u64,
    /// Control frames ignored
    pub malformed_controls: u64,
}
