//! Telemetry fan-out relay
//!
//! Producers publish small JSON telemetry envelopes; every connected
//! subscriber receives the ones matching its own type/sensor/channel filter,
//! which it can change at any time over the same connection.
//!
//! ```text
//!   POST /data ──► TypeRegistry ──► HubHandle::broadcast
//!                                         │
//!                                    Hub task (single owner of the set)
//!                                         │ mailbox per subscriber
//!                                         ▼
//!                      Connection { read_control │ forward } ──► WebSocket
//! ```
//!
//! # Example
//! ```no_run
//! use telemetry_relay::hub::{Hub, HubConfig};
//! use telemetry_relay::server::{RelayServer, ServerConfig};
//!
//! # async fn example() -> telemetry_relay::error::Result<()> {
//! let (hub, hub_task) = Hub::start(HubConfig::default());
//! let server = RelayServer::new(ServerConfig::default(), hub)?;
//!
//! server
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await?;
//! let _ = hub_task.await;
//! # Ok(())
//! # }
//! ```

pub mod envelope;
pub mod error;
pub mod hub;
pub mod server;
pub mod session;

pub use envelope::{Envelope, EnvelopeHeader, TypeRegistry};
pub use error::{Error, Result};
pub use hub::{Hub, HubConfig, HubHandle, SlowSubscriberPolicy, SubscriberId};
pub use server::{RelayServer, ServerConfig};
pub use session::{Connection, Filter};
