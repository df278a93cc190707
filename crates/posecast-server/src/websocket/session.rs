//! WebSocket session lifecycle: handles a single connected client from
//! upgrade through disconnect.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use metrics::histogram;
use posecast_core::ConnectionId;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::connection::ClientConnection;
use crate::config::ServerConfig;
use crate::metrics::WS_CONNECTION_DURATION_SECONDS;
use crate::relay::PoseRelay;

const CLOSE_FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

/// Timing and buffering knobs for one session.
#[derive(Clone, Copy, Debug)]
pub struct SessionLimits {
    /// Interval between server-initiated Ping frames.
    pub heartbeat_interval: Duration,
    /// Close the connection after this long without inbound traffic.
    pub heartbeat_timeout: Duration,
    /// Outbound queue capacity.
    pub send_queue_capacity: usize,
    /// Per-delivery wait for queue space.
    pub delivery_timeout: Duration,
}

impl From<&ServerConfig> for SessionLimits {
    fn from(config: &ServerConfig) -> Self {
        Self {
            heartbeat_interval: config.heartbeat_interval(),
            heartbeat_timeout: config.heartbeat_timeout(),
            send_queue_capacity: config.send_queue_capacity,
            delivery_timeout: config.delivery_timeout(),
        }
    }
}

/// Run a WebSocket session for a connected client.
///
/// 1. Registers the connection with the relay
/// 2. Hands text (and UTF-8 binary) frames to the relay in arrival order
/// 3. Forwards queued broadcasts via a writer task that also sends Pings
/// 4. Closes on client close, transport error, heartbeat timeout or shutdown
/// 5. Unregisters on the way out
#[instrument(skip_all, fields(conn_id = %conn_id, peer = %peer))]
pub async fn run_ws_session(
    ws: WebSocket,
    conn_id: ConnectionId,
    peer: String,
    relay: Arc<PoseRelay>,
    limits: SessionLimits,
    shutdown: CancellationToken,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();

    let (send_tx, mut send_rx) = mpsc::channel::<Arc<str>>(limits.send_queue_capacity);
    let connection = Arc::new(ClientConnection::new(
        conn_id.clone(),
        peer.clone(),
        send_tx,
        limits.delivery_timeout,
    ));
    let _ = relay.open(connection.clone()).await;

    // Outbound forwarder with periodic Ping frames.
    let outbound_conn = connection.clone();
    let outbound_shutdown = shutdown.clone();
    let mut outbound = tokio::spawn(async move {
        let mut ping_interval = tokio::time::interval(limits.heartbeat_interval);
        // Skip the immediate first tick
        let _ = ping_interval.tick().await;

        loop {
            tokio::select! {
                msg = send_rx.recv() => {
                    let Some(text) = msg else { break };
                    if ws_tx.send(Message::Text(text.as_ref().into())).await.is_err() {
                        break;
                    }
                }
                _ = ping_interval.tick() => {
                    let silent_for = outbound_conn.last_seen_elapsed();
                    if silent_for > limits.heartbeat_timeout {
                        warn!(?silent_for, "client unresponsive, disconnecting");
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                    if ws_tx.send(Message::Ping(Vec::<u8>::new().into())).await.is_err() {
                        break;
                    }
                }
                () = outbound_shutdown.cancelled() => {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            }
        }
    });

    loop {
        let frame = tokio::select! {
            frame = ws_rx.next() => frame,
            _ = &mut outbound => {
                debug!("writer finished");
                break;
            }
            () = shutdown.cancelled() => {
                debug!("server shutting down");
                // Let the writer flush its Close frame.
                let _ = tokio::time::timeout(CLOSE_FLUSH_TIMEOUT, &mut outbound).await;
                break;
            }
        };

        let msg = match frame {
            Some(Ok(msg)) => msg,
            Some(Err(e)) => {
                info!(error = %e, "transport error");
                break;
            }
            None => break,
        };
        connection.mark_alive();

        match msg {
            Message::Text(text) => {
                let _ = relay.handle_message(&conn_id, &peer, text.as_str()).await;
            }
            Message::Binary(data) => match std::str::from_utf8(&data) {
                Ok(text) => {
                    let _ = relay.handle_message(&conn_id, &peer, text).await;
                }
                Err(_) => debug!(len = data.len(), "ignoring non-UTF8 binary frame"),
            },
            Message::Close(_) => {
                debug!("client sent close frame");
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    // Clean up
    outbound.abort();
    relay.close(&conn_id, &peer).await;
    histogram!(WS_CONNECTION_DURATION_SECONDS).record(connection.age().as_secs_f64());
}

#[cfg(test)]
mod tests {
    use super::*;

    // Full sessions need a real socket; see tests/relay.rs.

    #[test]
    fn limits_from_config() {
        let config = ServerConfig {
            heartbeat_interval_secs: 2,
            heartbeat_timeout_secs: 6,
            send_queue_capacity: 16,
            delivery_timeout_ms: 250,
            ..ServerConfig::default()
        };
        let limits = SessionLimits::from(&config);
        assert_eq!(limits.heartbeat_interval, Duration::from_secs(2));
        assert_eq!(limits.heartbeat_timeout, Duration::from_secs(6));
        assert_eq!(limits.send_queue_capacity, 16);
        assert_eq!(limits.delivery_timeout, Duration::from_millis(250));
    }
}
