//! WebSocket client connection state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::Mutex;
use posecast_core::{ConnectionId, DeliveryError};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendTimeoutError;

use crate::registry::ConnectionHandle;

/// A connected WebSocket client.
///
/// Outbound payloads go through a bounded queue drained by the session's
/// writer task. The connection counts as open until that task drops the
/// receiving end.
pub struct ClientConnection {
    id: ConnectionId,
    peer: String,
    tx: mpsc::Sender<Arc<str>>,
    delivery_timeout: Duration,
    /// When this connection was established.
    pub connected_at: Instant,
    last_seen: Mutex<Instant>,
    dropped_messages: AtomicU64,
}

impl ClientConnection {
    /// Create a new connection.
    pub fn new(
        id: ConnectionId,
        peer: impl Into<String>,
        tx: mpsc::Sender<Arc<str>>,
        delivery_timeout: Duration,
    ) -> Self {
        let now = Instant::now();
        Self {
            id,
            peer: peer.into(),
            tx,
            delivery_timeout,
            connected_at: now,
            last_seen: Mutex::new(now),
            dropped_messages: AtomicU64::new(0),
        }
    }

    /// Record inbound activity (any frame, including Pong).
    pub fn mark_alive(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    /// Time since the last inbound activity (or connection establishment).
    pub fn last_seen_elapsed(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }

    /// Connection age.
    pub fn age(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

#[async_trait]
impl ConnectionHandle for ClientConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    fn peer(&self) -> &str {
        &self.peer
    }

    fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    async fn deliver(&self, payload: Arc<str>) -> Result<(), DeliveryError> {
        let result = self
            .tx
            .send_timeout(payload, self.delivery_timeout)
            .await
            .map_err(|err| match err {
                SendTimeoutError::Closed(_) => DeliveryError::Closed,
                SendTimeoutError::Timeout(_) => DeliveryError::TimedOut(self.delivery_timeout),
            });
        if result.is_err() {
            let _ = self.dropped_messages.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    fn drop_count(&self) -> u64 {
        self.dropped_messages.load(Ordering::Relaxed)
    }
}
