//! `/healthz` and `/status` response bodies.

use std::time::Instant;

use serde::Serialize;

/// Liveness response body.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HealthResponse {
    /// Always `true` while the server is running.
    pub ok: bool,
}

/// Build a liveness response.
pub fn health_check() -> HealthResponse {
    HealthResponse { ok: true }
}

/// Relay status response body.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusResponse {
    /// Open WebSocket connections.
    pub clients: usize,
    /// Seconds since the server started.
    pub uptime_secs: u64,
}

/// Build a status response from live counters.
pub fn status(start_time: Instant, clients: usize) -> StatusResponse {
    StatusResponse {
        clients,
        uptime_secs: start_time.elapsed().as_secs(),
    }
}
