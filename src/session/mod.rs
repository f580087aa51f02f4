//! Subscriber connections
//!
//! Each connected client gets one [`Connection`]: an inbound control half
//! that rewrites the connection's [`Filter`], and an outbound half that
//! evaluates every hub broadcast against it. Filtering happens here, at the
//! edge, so a client can change what it receives without the hub knowing.

pub mod connection;
pub mod filter;
pub mod state;
pub mod transport;

pub use connection::{Connection, ConnectionSummary};
pub use filter::{Filter, SharedFilter};
pub use state::{
    CloseReason, ConnectionPhase, ConnectionState, ConnectionStats, ConnectionStatsSnapshot,
};
pub use transport::{PeerReader, PeerWriter};
