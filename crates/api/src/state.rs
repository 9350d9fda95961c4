use std::sync::Arc;

use plotterd_axicli::manager::PlotterManager;

use crate::config::ServerConfig;
use crate::sse::SseManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Plot job orchestrator (owns the process supervisor and resume store).
    pub plotter: Arc<PlotterManager>,
    /// SSE connection registry (browser clients).
    pub sse_manager: Arc<SseManager>,
}
