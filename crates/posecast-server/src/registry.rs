//! Live connections and their last accepted pose.
//!
//! The registry is the single owner of per-connection state. It is built once
//! per [`crate::server::PoseServer`] and shared by `Arc`; nothing else keeps a
//! connection's state alive after [`ConnectionRegistry::unregister`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use posecast_core::{ConnectionId, DeliveryError, PoseSample};
use tokio::sync::RwLock;

/// Send capability for one connection.
///
/// The relay never looks past this trait at the underlying transport.
#[async_trait]
pub trait ConnectionHandle: Send + Sync {
    /// Identity assigned when the connection was accepted.
    fn id(&self) -> &ConnectionId;

    /// Remote peer label for diagnostics.
    fn peer(&self) -> &str;

    /// Whether the transport can still accept outbound messages.
    fn is_open(&self) -> bool;

    /// Deliver one serialized payload.
    async fn deliver(&self, payload: Arc<str>) -> Result<(), DeliveryError>;

    /// Payloads this connection has failed to accept so far.
    fn drop_count(&self) -> u64 {
        0
    }
}

#[derive(Default)]
struct ConnectionState {
    /// `None` only for state created implicitly by `set_last`.
    handle: Option<Arc<dyn ConnectionHandle>>,
    last_sample: Option<PoseSample>,
}

/// Concurrency-safe map from connection identity to its state.
pub struct ConnectionRegistry {
    connections: RwLock<HashMap<ConnectionId, ConnectionState>>,
}

impl ConnectionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection with no last sample.
    ///
    /// Re-registering an identity replaces its state. Returns the number of
    /// registered connections afterwards.
    pub async fn register(&self, handle: Arc<dyn ConnectionHandle>) -> usize {
        let mut conns = self.connections.write().await;
        let _ = conns.insert(
            handle.id().clone(),
            ConnectionState {
                handle: Some(handle),
                last_sample: None,
            },
        );
        conns.len()
    }

    /// Remove all state for `id`. Returns whether it was registered.
    pub async fn unregister(&self, id: &ConnectionId) -> bool {
        self.connections.write().await.remove(id).is_some()
    }

    /// Last accepted sample for `id`.
    pub async fn get_last(&self, id: &ConnectionId) -> Option<PoseSample> {
        self.connections
            .read()
            .await
            .get(id)
            .and_then(|s| s.last_sample.clone())
    }

    /// Overwrite the last sample for `id`.
    ///
    /// An unknown identity gets implicit state with no send handle, so it
    /// never shows up in [`Self::live_connections`].
    pub async fn set_last(&self, id: &ConnectionId, sample: PoseSample) {
        let _ = self.replace_last(id, sample).await;
    }

    /// Store `sample` as the last sample for `id` and return the previous one.
    pub async fn replace_last(&self, id: &ConnectionId, sample: PoseSample) -> Option<PoseSample> {
        let mut conns = self.connections.write().await;
        conns
            .entry(id.clone())
            .or_default()
            .last_sample
            .replace(sample)
    }

    /// Snapshot of every registered send handle.
    ///
    /// The returned vector is an independent copy; registry changes made
    /// while it is iterated do not affect it.
    pub async fn live_connections(&self) -> Vec<Arc<dyn ConnectionHandle>> {
        self.connections
            .read()
            .await
            .values()
            .filter_map(|s| s.handle.clone())
            .collect()
    }

    /// Number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.connections
            .read()
            .await
            .values()
            .filter(|s| s.handle.is_some())
            .count()
    }

    /// Number of registered connections whose transport is still open.
    pub async fn open_connection_count(&self) -> usize {
        self.connections
            .read()
            .await
            .values()
            .filter_map(|s| s.handle.as_ref())
            .filter(|h| h.is_open())
            .count()
    }

    /// Whether `id` currently has state.
    pub async fn is_registered(&self, id: &ConnectionId) -> bool {
        self.connections.read().await.contains_key(id)
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
