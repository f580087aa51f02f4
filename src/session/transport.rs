//! Peer transport seam
//!
//! A subscriber connection drives two independent halves of a duplex
//! transport. The transport layer must guarantee that closing (or dropping)
//! the writer unblocks a pending [`PeerReader::recv`].

use std::future::Future;

use bytes::Bytes;

use crate::error::TransportError;

/// Inbound half: control frames from the peer
pub trait PeerReader: Send + 'static {
    /// Next data frame from the peer
    ///
    /// `Ok(None)` means the peer closed the connection cleanly.
    fn recv(&mut self) -> impl Future<Output = Result<Option<Bytes>, TransportError>> + Send;
}

/// Outbound half: envelopes to the peer
pub trait PeerWriter: Send + 'static {
    /// Send one frame carrying `payload` verbatim
    fn send(&mut self, payload: Bytes) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Close the outbound side
    fn close(&mut self) -> impl Future<Output = ()> + Send;
}
