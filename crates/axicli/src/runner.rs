//! The per-job execution task.
//!
//! Spawned by the manager once the subprocess is launched. Reads stdout and
//! stderr line by line, feeds each through the progress parser, publishes
//! the resulting events, and drives the job to its terminal state when the
//! process exits.
//!
//! State machine: `Streaming -> Completed` on exit code zero,
//! `Streaming -> Failed` on a non-zero code or any internal fault. A
//! `stop_plot` mid-run is observed here as an ordinary process exit; the
//! stop path adds no distinct terminal broadcast of its own.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout};

use plotterd_core::error::CoreError;

use crate::artifact;
use crate::events::PlotEvent;
use crate::manager::{JobState, PlotterManager};
use crate::progress::{OutputStream, ProgressParser};

/// Everything the execution task needs to finalize a job.
pub(crate) struct JobContext {
    pub layer: Option<u32>,
    pub layer_label: Option<String>,
    pub temp_svg: Option<PathBuf>,
}

/// Run one plot job to its terminal state.
pub(crate) async fn run_plot_job(
    manager: Arc<PlotterManager>,
    job: JobContext,
    stdout: ChildStdout,
    stderr: ChildStderr,
) {
    match stream_output(&manager, stdout, stderr).await {
        Ok(0) => {
            manager.publish(PlotEvent::CliProgressBar {
                status: "Plot completed successfully".to_string(),
            });
            manager.publish(PlotEvent::PlotComplete);
            manager.resume().clear(true).await;
            tracing::info!("Plot job completed");
        }
        Ok(code) => {
            finalize_failed(&manager, &job, format!("Plot process exited with code {code}")).await;
        }
        Err(e) => {
            finalize_failed(&manager, &job, e.to_string()).await;
        }
    }

    if let Some(path) = &job.temp_svg {
        artifact::remove_temp_svg(path);
    }
    manager.set_job_state(JobState::Idle).await;
}

/// Failed terminal transition: error message, `PLOT_ERROR` sentinel, and
/// resume metadata (gated on the marker file actually existing) so the
/// interrupted point stays resumable.
async fn finalize_failed(manager: &PlotterManager, job: &JobContext, detail: String) {
    tracing::error!(error = %detail, "Plot job failed");
    manager.publish(PlotEvent::CliProgressBar {
        status: format!("Error: {detail}"),
    });
    manager.publish(PlotEvent::PlotError { detail });
    manager
        .resume()
        .mark_available(job.layer, job.layer_label.as_deref())
        .await;
}

/// Stream both output pipes through the parser until the process exits,
/// then collect its exit code.
async fn stream_output(
    manager: &PlotterManager,
    stdout: ChildStdout,
    stderr: ChildStderr,
) -> Result<i32, CoreError> {
    let mut stdout_lines = BufReader::new(stdout).lines();
    let mut stderr_lines = BufReader::new(stderr).lines();
    let mut parser = ProgressParser::new();
    let mut stdout_done = false;
    let mut stderr_done = false;

    while !(stdout_done && stderr_done) {
        tokio::select! {
            line = stdout_lines.next_line(), if !stdout_done => match line? {
                Some(line) => {
                    tracing::debug!(line = %line, "Plot stdout");
                    if let Some(event) = parser.parse(OutputStream::Stdout, &line) {
                        manager.publish(event);
                    }
                }
                None => stdout_done = true,
            },
            line = stderr_lines.next_line(), if !stderr_done => match line? {
                Some(line) => {
                    tracing::debug!(line = %line, "Plot stderr");
                    if let Some(event) = parser.parse(OutputStream::Stderr, &line) {
                        manager.publish(event);
                    }
                }
                None => stderr_done = true,
            },
        }
    }

    manager.supervisor().wait().await
}
