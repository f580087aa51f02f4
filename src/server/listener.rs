//! Relay HTTP server
//!
//! Exposes the hub over HTTP:
//! - `GET /data?type=&sensor=&channel=`: upgrade to a WebSocket subscriber
//! - `POST /data`: publish a JSON envelope
//! - `GET /stats`: hub counters
//! - `GET /`: optional static files

use std::future::Future;
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use bytes::Bytes;
use serde::Deserialize;
use tokio::net::TcpListener;
use tower_http::services::ServeDir;

use crate::envelope::TypeRegistry;
use crate::error::Result;
use crate::hub::{HubHandle, HubStatsSnapshot};
use crate::server::config::ServerConfig;
use crate::server::ws;
use crate::session::{Connection, Filter};

/// Shared state for request handlers
struct AppState {
    hub: HubHandle,
    registry: TypeRegistry,
    default_type: String,
    max_message_size: usize,
}

/// Query parameters of a subscribe request
///
/// Sensor and channel are kept as strings so that unparseable values fall
/// back to 0 instead of rejecting the upgrade.
#[derive(Debug, Default, Deserialize)]
pub struct SubscribeParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub sensor: Option<String>,
    pub channel: Option<String>,
}

impl SubscribeParams {
    /// Resolve the initial filter for a new subscriber
    pub fn into_filter(self, registry: &TypeRegistry, default_type: &str) -> Filter {
        let kind = registry.resolve_or(self.kind.as_deref().filter(|k| !k.is_empty()), default_type);

        Filter::new(
            kind,
            int_param("sensor", self.sensor.as_deref()),
            int_param("channel", self.channel.as_deref()),
        )
    }
}

fn int_param(key: &str, value: Option<&str>) -> i64 {
    match value.filter(|v| !v.is_empty()) {
        Some(v) => v.parse().unwrap_or_else(|_| {
            tracing::debug!(param = key, value = v, "Unparseable query parameter, using 0");
            0
        }),
        None => 0,
    }
}

/// Relay server
pub struct RelayServer {
    config: ServerConfig,
    hub: HubHandle,
}

impl RelayServer {
    /// Create a server publishing into `hub`
    pub fn new(config: ServerConfig, hub: HubHandle) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, hub })
    }

    /// Get a reference to the hub handle
    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// Build the HTTP router
    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            hub: self.hub.clone(),
            registry: self.config.type_registry(),
            default_type: self.config.default_type.clone(),
            max_message_size: self.config.max_message_size,
        });

        let mut app = Router::new()
            .route("/data", get(subscribe).post(publish))
            .route("/stats", get(stats))
            .layer(DefaultBodyLimit::max(self.config.max_body_size))
            .with_state(state);

        if let Some(ref dir) = self.config.static_dir {
            if dir.exists() {
                tracing::info!(dir = ?dir, "Serving static files");
                app = app.fallback_service(ServeDir::new(dir));
            } else {
                tracing::warn!(dir = ?dir, "Static directory does not exist, skipping");
            }
        }

        app
    }

    /// Run the server until `shutdown` resolves
    ///
    /// On shutdown the hub is stopped, which closes every subscriber.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "Relay server listening");

        let hub = self.hub.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.await;
                tracing::info!("Shutdown signal received");
                hub.shutdown().await;
            })
            .await?;

        Ok(())
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> std::net::SocketAddr {
        self.config.bind_addr
    }
}

/// GET /data: WebSocket subscriber
async fn subscribe(
    upgrade: WebSocketUpgrade,
    Query(params): Query<SubscribeParams>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let filter = params.into_filter(&state.registry, &state.default_type);
    tracing::debug!(filter = %filter, "Subscribe request");

    let hub = state.hub.clone();
    upgrade
        .max_message_size(state.max_message_size)
        .on_upgrade(move |socket| async move {
            let (reader, writer) = ws::split(socket);
            Connection::new(hub, filter, reader, writer).run().await;
        })
}

/// POST /data: publish an envelope
async fn publish(State(state): State<Arc<AppState>>, body: Bytes) -> StatusCode {
    match state.registry.validate(body) {
        Ok(payload) => {
            let delivered = state.hub.broadcast(payload).await;
            tracing::debug!(delivered = delivered, "Envelope published");
            StatusCode::ACCEPTED
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rejected submission");
            StatusCode::BAD_REQUEST
        }
    }
}

/// GET /stats: hub counters
async fn stats(State(state): State<Arc<AppState>>) -> Json<HubStatsSnapshot> {
    Json(state.hub.stats())
}
