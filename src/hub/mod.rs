//! Relay hub: the single serialization point for fan-out
//!
//! # Architecture
//!
//! ```text
//!   [Producer]   [Producer]   [Connection]   [Connection]
//!       │ broadcast  │             │ join/leave   │
//!       └────────────┴──────┬──────┴──────────────┘
//!                           ▼
//!                 mpsc<HubEvent> (FIFO)
//!                           │
//!                           ▼
//!                ┌─────────────────────┐
//!                │ Hub task            │
//!                │  subscribers:       │
//!                │   HashMap<Id, Tx>   │
//!                └──────────┬──────────┘
//!            ┌──────────────┼──────────────┐
//!            ▼              ▼              ▼
//!        mailbox        mailbox        mailbox
//! ```
//!
//! The hub never inspects payloads and knows nothing about subscriber
//! filters. `bytes::Bytes` is reference counted, so each mailbox receives a
//! handle to the same allocation.

pub mod config;
pub mod event;
pub mod relay;
pub mod stats;

pub use config::{HubConfig, SlowSubscriberPolicy};
pub use event::{Mailbox, MailboxSender, SubscriberId};
pub use relay::{Hub, HubHandle};
pub use stats::{HubStats, HubStatsSnapshot};
