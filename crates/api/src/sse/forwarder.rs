use std::sync::Arc;

use tokio::sync::broadcast;

use plotterd_axicli::manager::PlotterManager;

use crate::sse::manager::SseManager;

/// Spawn the task that bridges plotter progress events into the SSE hub.
///
/// Events broadcast by a single job reach each subscriber in emission
/// order; the forwarder is the only producer feeding the hub, so no
/// reordering can occur across the stream. Runs until the manager's event
/// channel closes. The returned `JoinHandle` can be used to abort the task
/// explicitly during shutdown.
pub fn start_event_forwarder(
    plotter: Arc<PlotterManager>,
    sse_manager: Arc<SseManager>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut events = plotter.subscribe();
        loop {
            match events.recv().await {
                Ok(event) => sse_manager.broadcast(&event).await,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "SSE forwarder lagged behind the event channel");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Progress event channel closed, stopping forwarder");
                    break;
                }
            }
        }
    })
}
