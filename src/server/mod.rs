//! HTTP and WebSocket front end

pub mod config;
pub mod listener;
pub mod ws;

pub use config::{parse_bind_addr, ServerConfig};
pub use listener::{RelayServer, SubscribeParams};
