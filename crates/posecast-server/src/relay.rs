//! Per-connection lifecycle: open, inbound message pipeline, close.
//!
//! Every accepted message flows through the same pipeline:
//! parse → estimate velocity against the stored sample → store → broadcast.
//! A rejected message changes nothing and the connection stays open.

use std::sync::Arc;

use metrics::{counter, gauge};
use posecast_core::parse::parse_pose;
use posecast_core::velocity;
use posecast_core::{Clock, ConnectionId, EnrichedUpdate, SystemClock};
use tracing::{debug, info, warn};

use crate::metrics::{
    POSES_ACCEPTED_TOTAL, POSES_DROPPED_TOTAL, WS_CONNECTIONS_ACTIVE, WS_CONNECTIONS_TOTAL,
    WS_DISCONNECTIONS_TOTAL,
};
use crate::registry::{ConnectionHandle, ConnectionRegistry};
use crate::websocket::broadcast::{BroadcastReport, Broadcaster};

/// Drives connections through `Connecting → Open → Closed`.
pub struct PoseRelay {
    registry: Arc<ConnectionRegistry>,
    broadcaster: Broadcaster,
    clock: Arc<dyn Clock>,
}

impl PoseRelay {
    /// Create a relay over `registry` using the system clock.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self::with_clock(registry, Arc::new(SystemClock))
    }

    /// Create a relay with an explicit time source.
    pub fn with_clock(registry: Arc<ConnectionRegistry>, clock: Arc<dyn Clock>) -> Self {
        Self {
            broadcaster: Broadcaster::new(registry.clone()),
            registry,
            clock,
        }
    }

    /// The registry this relay mutates.
    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Register a newly accepted connection. Returns the live total.
    pub async fn open(&self, handle: Arc<dyn ConnectionHandle>) -> usize {
        let conn_id = handle.id().clone();
        let peer = handle.peer().to_owned();
        let clients = self.registry.register(handle).await;
        counter!(WS_CONNECTIONS_TOTAL).increment(1);
        gauge!(WS_CONNECTIONS_ACTIVE).increment(1.0);
        info!(%conn_id, peer = %peer, clients, "client connected");
        clients
    }

    /// Process one inbound text message from `id`.
    ///
    /// Returns the broadcast outcome, or `None` if the message was dropped.
    pub async fn handle_message(
        &self,
        id: &ConnectionId,
        peer: &str,
        text: &str,
    ) -> Option<BroadcastReport> {
        let now = self.clock.now_secs();
        let sample = match parse_pose(text, now) {
            Ok(sample) => sample,
            Err(rejection) => {
                counter!(POSES_DROPPED_TOTAL, "reason" => rejection.reason()).increment(1);
                if rejection.is_reportable() {
                    warn!(conn_id = %id, peer, error = %rejection, "dropping malformed message");
                } else {
                    debug!(conn_id = %id, reason = rejection.reason(), "dropping message");
                }
                return None;
            }
        };

        let previous = self.registry.replace_last(id, sample.clone()).await;
        let velocity = velocity::estimate(previous.as_ref(), &sample, now);
        counter!(POSES_ACCEPTED_TOTAL).increment(1);

        let update = EnrichedUpdate::new(sample, velocity);
        Some(self.broadcaster.broadcast(&update).await)
    }

    /// Unregister a connection. Closing twice is a no-op.
    pub async fn close(&self, id: &ConnectionId, peer: &str) {
        if !self.registry.unregister(id).await {
            return;
        }
        let clients = self.registry.connection_count().await;
        counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
        gauge!(WS_CONNECTIONS_ACTIVE).decrement(1.0);
        info!(conn_id = %id, peer, clients, "client disconnected");
    }
}
