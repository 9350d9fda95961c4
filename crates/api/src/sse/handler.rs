use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, Sse};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::sse::manager::{SseFrame, SseManager};
use crate::state::AppState;

/// Interval between heartbeat comment frames (in milliseconds).
const HEARTBEAT_INTERVAL_MS: u64 = 100;

/// GET /plot-progress -- the live progress event stream.
///
/// Registers the connection with [`SseManager`] (which queues an initial
/// heartbeat as the first frame on the wire) and spawns a per-connection
/// heartbeat loop that runs until the keep-alive token is cancelled or the
/// client disconnects, whichever comes first.
pub async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, "SSE client connected");

    let rx = state.sse_manager.add(conn_id.clone()).await;
    let token = state.sse_manager.heartbeat_token().await;

    spawn_heartbeat(Arc::clone(&state.sse_manager), conn_id, token);

    let stream = UnboundedReceiverStream::new(rx).map(|frame| {
        Ok(match frame {
            SseFrame::Data(json) => Event::default().data(json),
            SseFrame::Comment => Event::default().comment(""),
        })
    });
    Sse::new(stream)
}

/// Per-connection heartbeat loop.
///
/// Cancellation is cooperative: the token is checked every tick, so
/// clearing it never forcibly closes the socket -- the client may still
/// observe frames already queued.
fn spawn_heartbeat(manager: Arc<SseManager>, conn_id: String, token: CancellationToken) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(HEARTBEAT_INTERVAL_MS));
        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::debug!(conn_id = %conn_id, "Heartbeat loop stopped");
                    break;
                }
                _ = interval.tick() => {
                    if !manager.send_heartbeat(&conn_id).await {
                        tracing::info!(conn_id = %conn_id, "SSE client disconnected");
                        break;
                    }
                }
            }
        }
    });
}
