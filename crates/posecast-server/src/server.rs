//! `PoseServer`: Axum HTTP + WebSocket server.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::get;
use metrics_exporter_prometheus::PrometheusHandle;
use posecast_core::{Clock, ConnectionId};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::health::{self, HealthResponse, StatusResponse};
use crate::registry::ConnectionRegistry;
use crate::relay::PoseRelay;
use crate::shutdown::ShutdownCoordinator;
use crate::websocket::session::{SessionLimits, run_ws_session};

/// Startup failures.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listener could not bind.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested `host:port`.
        addr: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// The bound listener has no local address.
    #[error("failed to read local address: {0}")]
    LocalAddr(std::io::Error),
}

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Connection lifecycle and message pipeline.
    pub relay: Arc<PoseRelay>,
    /// Per-session timing and buffering.
    pub limits: SessionLimits,
    /// Largest inbound WebSocket message, in bytes.
    pub max_message_size: usize,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle for `/metrics`, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The pose relay server.
pub struct PoseServer {
    config: ServerConfig,
    registry: Arc<ConnectionRegistry>,
    relay: Arc<PoseRelay>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
}

impl PoseServer {
    /// Create a new server with a fresh registry and the system clock.
    pub fn new(config: ServerConfig) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let relay = Arc::new(PoseRelay::new(registry.clone()));
        Self::assemble(config, registry, relay)
    }

    /// Create a new server with an explicit time source.
    pub fn with_clock(config: ServerConfig, clock: Arc<dyn Clock>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let relay = Arc::new(PoseRelay::with_clock(registry.clone(), clock));
        Self::assemble(config, registry, relay)
    }

    fn assemble(
        config: ServerConfig,
        registry: Arc<ConnectionRegistry>,
        relay: Arc<PoseRelay>,
    ) -> Self {
        Self {
            config,
            registry,
            relay,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics: None,
        }
    }

    /// Serve `/metrics` from `handle`.
    #[must_use]
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            relay: self.relay.clone(),
            limits: SessionLimits::from(&self.config),
            max_message_size: self.config.max_message_size,
            shutdown: self.shutdown.clone(),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/ws", get(ws_handler))
            .route("/healthz", get(health_handler))
            .route("/status", get(status_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Bind the configured address and serve until shutdown.
    ///
    /// Returns the bound address (useful with port `0`) and the serve task.
    pub async fn listen(&self) -> Result<(SocketAddr, JoinHandle<()>), ServerError> {
        let addr = self.config.bind_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr().map_err(ServerError::LocalAddr)?;

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        let token = self.shutdown.token();
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await;
            if let Err(e) = result {
                error!(error = %e, "server terminated with error");
            }
        });

        info!(%local_addr, "posecast relay listening");
        Ok((local_addr, handle))
    }

    /// Get the connection registry.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Get the relay.
    pub fn relay(&self) -> &Arc<PoseRelay> {
        &self.relay
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// Label a peer by the first `X-Forwarded-For` entry, else the socket address.
pub fn peer_label(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map_or_else(|| addr.to_string(), str::to_owned)
}

/// GET /ws
async fn ws_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    State(state): State<AppState>,
) -> Response {
    let peer = peer_label(&headers, addr);
    let token = state.shutdown.token();
    ws.max_message_size(state.max_message_size)
        .on_upgrade(move |socket| {
            run_ws_session(
                socket,
                ConnectionId::new(),
                peer,
                state.relay,
                state.limits,
                token,
            )
        })
}

/// GET /healthz
async fn health_handler() -> Json<HealthResponse> {
    Json(health::health_check())
}

/// GET /status
async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    let clients = state.relay.registry().open_connection_count().await;
    Json(health::status(state.start_time, clients))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            crate::metrics::render(handle),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
