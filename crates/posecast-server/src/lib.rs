//! # posecast-server
//!
//! Axum HTTP + `WebSocket` relay for pose samples.
//!
//! - `WebSocket` gateway at `/ws`: one session per client, heartbeat, bounded send queue
//! - [`relay::PoseRelay`]: parse, velocity, per-connection last sample, fan-out
//! - [`registry::ConnectionRegistry`]: live connections behind a `tokio::sync::RwLock`
//! - Operational endpoints: `/healthz`, `/status`, `/metrics`
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod config;
pub mod health;
pub mod metrics;
pub mod registry;
pub mod relay;
pub mod server;
pub mod shutdown;
pub mod websocket;

pub use config::ServerConfig;
pub use registry::{ConnectionHandle, ConnectionRegistry};
pub use relay::PoseRelay;
pub use server::{PoseServer, ServerError};
pub use websocket::broadcast::{BroadcastReport, Broadcaster};
