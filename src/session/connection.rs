//! Subscriber connection
//!
//! Bridges one duplex peer transport to the hub. The control reader applies
//! filter updates sent by the peer; the forwarder drains the hub mailbox and
//! sends the peer every envelope that matches the filter at the moment it
//! is evaluated.
//!
//! ```text
//!   peer ──frames──► read_control ──replace──► SharedFilter
//!                                                   │ matches
//!   hub ──mailbox──► forward ───────────────────────┴──send──► peer
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use crate::envelope::EnvelopeHeader;
use crate::hub::{HubHandle, Mailbox, SubscriberId};

use super::filter::{Filter, SharedFilter};
use super::state::{CloseReason, ConnectionState, ConnectionStats, ConnectionStatsSnapshot};
use super::transport::{PeerReader, PeerWriter};

/// Upper bound on the closing handshake with a peer that stopped reading
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Outcome of a finished connection
#[derive(Debug, Clone)]
pub struct ConnectionSummary {
    pub id: SubscriberId,
    pub reason: CloseReason,
    pub active_for: Duration,
    pub stats: ConnectionStatsSnapshot,
}

/// One live subscriber
pub struct Connection<R, W> {
    state: ConnectionState,
    hub: HubHandle,
    filter: SharedFilter,
    reader: R,
    writer: W,
    stats: Arc<ConnectionStats>,
}

impl<R: PeerReader, W: PeerWriter> Connection<R, W> {
    /// Create a connection for an upgraded transport
    ///
    /// `filter` is the initial selection from the upgrade request.
    pub fn new(hub: HubHandle, filter: Filter, reader: R, writer: W) -> Self {
        let id = hub.next_subscriber_id();

        Self {
            state: ConnectionState::new(id),
            hub,
            filter: SharedFilter::new(filter),
            reader,
            writer,
            stats: Arc::new(ConnectionStats::default()),
        }
    }

    pub fn id(&self) -> SubscriberId {
        self.state.id
    }

    /// Handle to this connection's filter
    pub fn filter(&self) -> SharedFilter {
        self.filter.clone()
    }

    /// Handle to this connection's counters
    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Register with the hub and run both halves until either stops
    pub async fn run(self) -> ConnectionSummary {
        let Connection {
            mut state,
            hub,
            filter,
            mut reader,
            writer,
            stats,
        } = self;
        let id = state.id;

        let mailbox = hub.subscribe(id).await;
        state.activate();

        tracing::info!(subscriber = %id, filter = %filter.snapshot(), "Subscriber connected");

        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let mut forwarder = tokio::spawn({
            let filter = filter.clone();
            let stats = Arc::clone(&stats);
            async move {
                let mut writer = writer;
                tokio::select! {
                    _ = forward(id, mailbox, &mut writer, filter, stats) => {}
                    _ = stop_rx => {}
                }
                writer
            }
        });

        let (reason, stopped) = tokio::select! {
            reason = read_control(id, &mut reader, &filter, &stats) => (reason, None),
            stopped = &mut forwarder => (CloseReason::MailboxClosed, Some(stopped)),
        };

        state.begin_close(reason.clone());
        tracing::debug!(subscriber = %id, reason = %reason, "Connection closing");

        // Stopping the forwarder drops the mailbox before leaving, so a hub
        // blocked on this mailbox is released instead of deadlocking.
        let stopped = match stopped {
            Some(stopped) => stopped,
            None => {
                let _ = stop_tx.send(());
                forwarder.await
            }
        };
        hub.leave(id).await;

        match stopped {
            Ok(mut writer) => {
                if tokio::time::timeout(CLOSE_TIMEOUT, writer.close()).await.is_err() {
                    tracing::debug!(subscriber = %id, "Timed out closing transport");
                }
            }
            Err(e) => tracing::warn!(subscriber = %id, error = %e, "Forwarder task failed"),
        }
        drop(reader);
        state.finish_close();

        let summary = ConnectionSummary {
            id,
            reason,
            active_for: state.active_duration(),
            stats: stats.snapshot(),
        };

        tracing::info!(
            subscriber = %id,
            reason = %summary.reason,
            forwarded = summary.stats.forwarded,
            filtered = summary.stats.filtered,
            active_secs = summary.active_for.as_secs(),
            "Subscriber disconnected"
        );

        summary
    }
}

/// Apply filter updates from the peer until the transport closes or faults
async fn read_control<R: PeerReader>(
    id: SubscriberId,
    reader: &mut R,
    filter: &SharedFilter,
    stats: &ConnectionStats,
) -> CloseReason {
    loop {
        match reader.recv().await {
            Ok(Some(frame)) => match Filter::decode(&frame) {
                Ok(update) => {
                    tracing::info!(subscriber = %id, filter = %update, "Filter updated");
                    filter.replace(update);
                    stats.inc_filter_updates();
                }
                Err(e) => {
                    stats.inc_malformed_controls();
                    tracing::warn!(subscriber = %id, error = %e, "Ignoring malformed control frame");
                }
            },
            Ok(None) => return CloseReason::PeerClosed,
            Err(e) => {
                tracing::debug!(subscriber = %id, error = %e, "Socket read error");
                return CloseReason::ReadFault(e.to_string());
            }
        }
    }
}

/// Drain the mailbox, sending matching envelopes to the peer
///
/// Send failures drop the envelope and carry on. Returns once the hub
/// closes the mailbox; the mailbox is dropped with this future.
async fn forward<W: PeerWriter>(
    id: SubscriberId,
    mut mailbox: Mailbox,
    writer: &mut W,
    filter: SharedFilter,
    stats: Arc<ConnectionStats>,
) {
    while let Some(payload) = mailbox.recv().await {
        let header = match EnvelopeHeader::decode(&payload) {
            Ok(header) => header,
            Err(e) => {
                stats.inc_undecodable();
                tracing::debug!(subscriber = %id, error = %e, "Undecodable envelope");
                continue;
            }
        };

        if !filter.matches(&header) {
            stats.inc_filtered();
            tracing::trace!(subscriber = %id, envelope = %header, "Envelope filtered");
            continue;
        }

        match writer.send(payload).await {
            Ok(()) => {
                stats.inc_forwarded();
                tracing::trace!(subscriber = %id, envelope = %header, "Envelope forwarded");
            }
            Err(e) => {
                stats.inc_write_failures();
                tracing::warn!(subscriber = %id, error = %e, "Socket write error, envelope dropped");
            }
        }
    }
}
