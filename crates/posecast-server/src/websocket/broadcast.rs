//! Fan-out of enriched pose updates to every live connection.

use std::sync::Arc;

use futures::future::join_all;
use metrics::counter;
use posecast_core::logging::UPDATES_TARGET;
use posecast_core::{ConnectionId, DeliveryError, EnrichedUpdate};
use tracing::{error, info, warn};

use crate::metrics::{BROADCAST_DELIVERIES_TOTAL, BROADCAST_FAILURES_TOTAL};
use crate::registry::{ConnectionHandle, ConnectionRegistry};

/// Outcome of one broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Connections the payload was addressed to.
    pub recipients: usize,
    /// Deliveries that succeeded.
    pub delivered: usize,
    /// Connections whose delivery failed.
    pub failed: Vec<ConnectionId>,
}

/// Serializes an update once and delivers it to a registry snapshot.
pub struct Broadcaster {
    registry: Arc<ConnectionRegistry>,
}

impl Broadcaster {
    /// Create a broadcaster over `registry`.
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    /// Deliver `update` to every open connection.
    ///
    /// Deliveries run concurrently and are all awaited; one recipient's
    /// failure never affects another's. No retries.
    pub async fn broadcast(&self, update: &EnrichedUpdate) -> BroadcastReport {
        let payload: Arc<str> = match update.to_pretty_json() {
            Ok(json) => Arc::from(json),
            Err(e) => {
                error!(error = %e, "failed to serialize pose update");
                return BroadcastReport::default();
            }
        };
        info!(target: UPDATES_TARGET, "{payload}");

        let recipients: Vec<Arc<dyn ConnectionHandle>> = self
            .registry
            .live_connections()
            .await
            .into_iter()
            .filter(|conn| conn.is_open())
            .collect();

        let results = join_all(recipients.iter().map(|conn| {
            let payload = payload.clone();
            async move { conn.deliver(payload).await }
        }))
        .await;

        let mut report = BroadcastReport {
            recipients: recipients.len(),
            ..BroadcastReport::default()
        };
        for (conn, result) in recipients.iter().zip(results) {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!(
                        conn_id = %conn.id(),
                        peer = conn.peer(),
                        error = %e,
                        dropped = conn.drop_count(),
                        "broadcast delivery failed"
                    );
                    counter!(BROADCAST_FAILURES_TOTAL, "error" => failure_label(&e)).increment(1);
                    report.failed.push(conn.id().clone());
                }
            }
        }
        counter!(BROADCAST_DELIVERIES_TOTAL).increment(report.delivered as u64);
        report
    }
}

fn failure_label(err: &DeliveryError) -> &'static str {
    match err {
        DeliveryError::Closed => "closed",
        DeliveryError::TimedOut(_) => "timed_out",
    }
}
