use std::collections::HashMap;

use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use plotterd_axicli::events::PlotEvent;
use plotterd_core::types::Timestamp;

/// A frame queued for delivery on one SSE connection.
///
/// Heartbeats travel as comment frames (`:`), which keep the transport
/// alive through intermediaries without producing client-visible messages.
#[derive(Debug, Clone)]
pub enum SseFrame {
    /// A serialized `{event_type, payload}` data frame.
    Data(String),
    /// A no-op comment frame.
    Comment,
}

/// Channel sender half for pushing frames to an SSE connection.
pub type SseSender = mpsc::UnboundedSender<SseFrame>;

/// Metadata for a single SSE connection.
pub struct SseConnection {
    /// Channel sender for outbound frames to this connection.
    pub sender: SseSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// Manages all active SSE connections.
///
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application.
pub struct SseManager {
    connections: RwLock<HashMap<String, SseConnection>>,
    /// Keep-alive token driving every connection's heartbeat loop.
    /// Cancelled on `stop_plot`, swapped fresh when a new plot starts.
    keepalive: RwLock<CancellationToken>,
}

impl SseManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            keepalive: RwLock::new(CancellationToken::new()),
        }
    }

    /// Register a new connection.
    ///
    /// The first frame queued is a heartbeat, so a subscriber always
    /// receives it before any job-originated event. Returns the receiver
    /// half the caller turns into the response stream.
    pub async fn add(&self, conn_id: String) -> mpsc::UnboundedReceiver<SseFrame> {
        let (tx, rx) = mpsc::unbounded_channel();
        // The receiver is still in hand, so this cannot fail.
        let _ = tx.send(SseFrame::Comment);
        let conn = SseConnection {
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    /// Remove a connection by its ID.
    pub async fn remove(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
    }

    /// Broadcast an event to all connected clients.
    ///
    /// The event is serialized once; any connection whose channel is closed
    /// is removed from the registry as part of the same call. Best effort,
    /// self-healing -- a dead client never blocks the broadcast.
    pub async fn broadcast(&self, event: &PlotEvent) {
        let frame = match event {
            PlotEvent::Heartbeat => SseFrame::Comment,
            other => match serde_json::to_string(other) {
                Ok(json) => SseFrame::Data(json),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize progress event");
                    return;
                }
            },
        };

        let mut dead = Vec::new();
        {
            let conns = self.connections.read().await;
            for (id, conn) in conns.iter() {
                if conn.sender.send(frame.clone()).is_err() {
                    dead.push(id.clone());
                }
            }
        }
        if !dead.is_empty() {
            let mut conns = self.connections.write().await;
            for id in &dead {
                conns.remove(id);
            }
            tracing::debug!(count = dead.len(), "Pruned disconnected SSE clients");
        }
    }

    /// Send a heartbeat frame to one connection.
    ///
    /// Returns `false` (and removes the connection) when the client is gone.
    pub async fn send_heartbeat(&self, conn_id: &str) -> bool {
        let alive = {
            let conns = self.connections.read().await;
            match conns.get(conn_id) {
                Some(conn) => conn.sender.send(SseFrame::Comment).is_ok(),
                None => false,
            }
        };
        if !alive {
            self.remove(conn_id).await;
        }
        alive
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// A clone of the current keep-alive token for a heartbeat loop.
    pub async fn heartbeat_token(&self) -> CancellationToken {
        self.keepalive.read().await.clone()
    }

    /// Stop all heartbeat loops on their next tick.
    ///
    /// Does not close any sockets; clients still observe frames already
    /// queued.
    pub async fn suspend_heartbeats(&self) {
        self.keepalive.read().await.cancel();
    }

    /// Re-arm the keep-alive token so new and existing subscriptions get
    /// heartbeats again. Called when a plot starts.
    pub async fn resume_heartbeats(&self) {
        let mut token = self.keepalive.write().await;
        if token.is_cancelled() {
            *token = CancellationToken::new();
        }
    }

    /// Cancel heartbeats and drop every connection; used during graceful
    /// shutdown.
    pub async fn shutdown_all(&self) {
        self.keepalive.read().await.cancel();
        let mut conns = self.connections.write().await;
        let count = conns.len();
        conns.clear();
        tracing::info!(count, "Closed all SSE connections");
    }
}

impl Default for SseManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_frame_is_a_heartbeat() {
        let manager = SseManager::new();
        let mut rx = manager.add("conn-1".to_string()).await;

        let first = rx.recv().await.expect("initial frame");
        assert!(matches!(first, SseFrame::Comment));
    }

    #[tokio::test]
    async fn broadcast_reaches_all_subscribers_in_order() {
        let manager = SseManager::new();
        let mut rx1 = manager.add("conn-1".to_string()).await;
        let mut rx2 = manager.add("conn-2".to_string()).await;
        // Drain the initial heartbeats.
        rx1.recv().await.expect("heartbeat");
        rx2.recv().await.expect("heartbeat");

        manager
            .broadcast(&PlotEvent::CliProgressBar {
                status: "Plot Progress: 1%".to_string(),
            })
            .await;
        manager.broadcast(&PlotEvent::PlotComplete).await;

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.expect("frame") {
                SseFrame::Data(json) => assert!(json.contains("CLI_PROGRESS_BAR")),
                other => panic!("expected data frame, got {other:?}"),
            }
            match rx.recv().await.expect("frame") {
                SseFrame::Data(json) => assert!(json.contains("PLOT_COMPLETE")),
                other => panic!("expected data frame, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn broadcast_prunes_dead_connections() {
        let manager = SseManager::new();
        let rx = manager.add("dead".to_string()).await;
        let _live = manager.add("live".to_string()).await;
        drop(rx);

        assert_eq!(manager.connection_count().await, 2);
        manager.broadcast(&PlotEvent::Heartbeat).await;
        assert_eq!(manager.connection_count().await, 1);
    }

    #[tokio::test]
    async fn heartbeat_to_a_gone_client_removes_it() {
        let manager = SseManager::new();
        let rx = manager.add("conn".to_string()).await;
        drop(rx);

        assert!(!manager.send_heartbeat("conn").await);
        assert_eq!(manager.connection_count().await, 0);
        // Unknown IDs are not an error either.
        assert!(!manager.send_heartbeat("ghost").await);
    }

    #[tokio::test]
    async fn keepalive_token_cycles_with_plot_lifecycle() {
        let manager = SseManager::new();
        let token = manager.heartbeat_token().await;
        assert!(!token.is_cancelled());

        manager.suspend_heartbeats().await;
        assert!(token.is_cancelled());

        manager.resume_heartbeats().await;
        let fresh = manager.heartbeat_token().await;
        assert!(!fresh.is_cancelled());
        // The old loop's token stays cancelled.
        assert!(token.is_cancelled());
    }
}
