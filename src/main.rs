//! Telemetry relay server
//!
//! Run with: telemetry-relay [--http ADDR] [--static DIR]
//!
//! Publish:
//!   curl -X POST localhost:5100/data \
//!     -d '{"name":"mic0","type":"octavebands","sensor":0,"channel":0,"values":[1,2,3]}'
//!
//! Subscribe:
//!   websocat 'ws://localhost:5100/data?type=octavebands&sensor=0&channel=0'
//!   then send {"type":"frequencybins","sensor":0,"channel":0} to switch streams

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use telemetry_relay::hub::{Hub, HubConfig, SlowSubscriberPolicy};
use telemetry_relay::server::{parse_bind_addr, RelayServer, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "telemetry-relay", version, about)]
struct Args {
    /// Listen address: PORT, IP, IP:PORT or localhost[:PORT]
    #[arg(long = "http", default_value = "0.0.0.0:5100")]
    http: String,

    /// Directory containing `index.html` to serve at /
    #[arg(long = "static")]
    static_dir: Option<PathBuf>,

    /// Accepted envelope types
    #[arg(long, value_delimiter = ',', default_value = "octavebands,frequencybins")]
    types: Vec<String>,

    /// Subscription type used when a client asks for none or an unknown one
    #[arg(long, default_value = "octavebands")]
    default_type: String,

    /// Envelopes buffered per subscriber
    #[arg(long, default_value_t = 256)]
    mailbox_capacity: usize,

    /// Disconnect subscribers whose mailbox is full instead of waiting for them
    #[arg(long)]
    drop_slow_subscribers: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("telemetry_relay=info")),
        )
        .init();

    let mut config = ServerConfig::default()
        .bind(parse_bind_addr(&args.http)?)
        .types(args.types)
        .default_type(args.default_type);
    if let Some(dir) = args.static_dir {
        config = config.static_dir(dir);
    }

    let policy = if args.drop_slow_subscribers {
        SlowSubscriberPolicy::Disconnect
    } else {
        SlowSubscriberPolicy::Block
    };
    let hub_config = HubConfig::default()
        .mailbox_capacity(args.mailbox_capacity)
        .slow_subscriber_policy(policy);

    let (hub, hub_task) = Hub::start(hub_config);
    let server = RelayServer::new(config, hub)?;

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    let _ = hub_task.await;
    Ok(())
}
