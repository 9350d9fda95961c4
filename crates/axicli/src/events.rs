//! Progress events emitted by a running plot job.
//!
//! These are produced by [`crate::progress::ProgressParser`] and the job
//! runner, published on the manager's broadcast channel, and serialized to
//! SSE subscribers as `{event_type, payload}` frames. They are ephemeral --
//! nothing here is ever persisted.

use serde::Serialize;

/// A progress event originating from the plotting tool or the job runner.
///
/// `PlotComplete` and `PlotError` are the two terminal sentinels: they are
/// the only way a subscriber learns that the job has ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event_type", content = "payload")]
pub enum PlotEvent {
    /// A textual progress-bar or informational line from the tool.
    #[serde(rename = "CLI_PROGRESS_BAR")]
    CliProgressBar { status: String },

    /// A structured progress report with a 0.0-1.0 completion fraction.
    #[serde(rename = "CLI_PROGRESS")]
    CliProgress { status: String, progress: f64 },

    /// The plot finished with exit code zero.
    #[serde(rename = "PLOT_COMPLETE")]
    PlotComplete,

    /// The plot failed or was interrupted.
    #[serde(rename = "PLOT_ERROR")]
    PlotError { detail: String },

    /// Keep-alive marker. Sent on the wire as an SSE comment frame rather
    /// than a data frame.
    #[serde(rename = "HEARTBEAT")]
    Heartbeat,
}
