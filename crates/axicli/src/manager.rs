//! Plot job orchestration.
//!
//! [`PlotterManager`] owns the shared mutable state of the subsystem: the
//! job state machine, the process supervisor, the resume store, and the
//! broadcast channel progress events are published on. It is created once
//! at application startup and cloned into request handlers as an `Arc`.
//!
//! Exactly one plot job may run at a time; a second `plot` command while
//! one is active is rejected, never overlapped.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::process::Command;
use tokio::sync::{broadcast, Mutex};

use plotterd_core::error::CoreError;
use plotterd_core::types::{PlotParameters, ResumeStatus};

use crate::command;
use crate::config::PlotterConfig;
use crate::events::PlotEvent;
use crate::resume::ResumeStore;
use crate::runner;
use crate::supervisor::{ProcessSupervisor, TERMINATE_GRACE};

/// Broadcast channel capacity for progress events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Timeout for synchronous one-shot tool invocations (toggle, align, ...).
const UTILITY_TIMEOUT: Duration = Duration::from_secs(60);

/// Process-wide job state, read by the command dispatcher to decide whether
/// `stop_plot` has a live target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Idle,
    Running,
    Stopping,
}

/// Orchestrates plot jobs against the vendor CLI.
pub struct PlotterManager {
    config: PlotterConfig,
    supervisor: ProcessSupervisor,
    resume: ResumeStore,
    job_state: Mutex<JobState>,
    event_tx: broadcast::Sender<PlotEvent>,
}

impl PlotterManager {
    /// Create the manager. Returns a shared handle safe to clone into
    /// request handlers.
    pub fn new(config: PlotterConfig) -> Arc<Self> {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let supervisor = ProcessSupervisor::new(config.tool_name());
        let resume = ResumeStore::new(&config.output_root);

        Arc::new(Self {
            config,
            supervisor,
            resume,
            job_state: Mutex::new(JobState::Idle),
            event_tx,
        })
    }

    /// Subscribe to progress events.
    pub fn subscribe(&self) -> broadcast::Receiver<PlotEvent> {
        self.event_tx.subscribe()
    }

    /// The resume state store.
    pub fn resume(&self) -> &ResumeStore {
        &self.resume
    }

    /// The resolved plotter configuration.
    pub fn plot_config(&self) -> &PlotterConfig {
        &self.config
    }

    /// Snapshot of the resume state.
    pub async fn resume_status(&self, include_path: bool) -> ResumeStatus {
        self.resume.status(include_path).await
    }

    /// Current job state.
    pub async fn job_state(&self) -> JobState {
        *self.job_state.lock().await
    }

    /// Start an asynchronous plot job for one layer.
    ///
    /// Returns as soon as the subprocess has been launched; progress is
    /// observed exclusively through the event stream, ending with a
    /// `PLOT_COMPLETE` or `PLOT_ERROR` sentinel.
    pub async fn start_plot(self: &Arc<Self>, params: PlotParameters) -> Result<String, CoreError> {
        self.claim_idle().await?;

        match self.launch_plot(params).await {
            Ok(()) => Ok("Plot command started".to_string()),
            Err(e) => {
                tracing::error!(error = %e, "Failed to start plot job");
                self.set_job_state(JobState::Idle).await;
                Err(e)
            }
        }
    }

    /// Resume the previously interrupted plot from the resume marker.
    pub async fn start_resume(
        self: &Arc<Self>,
        pen_pos_up: u8,
        pen_pos_down: u8,
        pen_rate_lower: u32,
    ) -> Result<String, CoreError> {
        let status = self.resume.status(false).await;
        if !status.available {
            return Err(CoreError::Validation(
                "No resumable plot is available".to_string(),
            ));
        }
        self.claim_idle().await?;

        let args = command::resume_args(
            &self.config,
            pen_pos_up,
            pen_pos_down,
            pen_rate_lower,
            self.resume.path(),
        );
        tracing::info!(
            layer = status.layer.unwrap_or(0),
            layer_label = status.layer_label.as_deref().unwrap_or("unknown"),
            "Resuming interrupted plot",
        );

        match self.supervisor.spawn(&self.config.axicli_path, &args).await {
            Ok((stdout, stderr)) => {
                let job = runner::JobContext {
                    layer: status.layer,
                    layer_label: status.layer_label,
                    temp_svg: None,
                };
                tokio::spawn(runner::run_plot_job(Arc::clone(self), job, stdout, stderr));
                Ok("Resume plot command started".to_string())
            }
            Err(e) => {
                self.set_job_state(JobState::Idle).await;
                Err(e)
            }
        }
    }

    /// Stop the active plot, or sweep for stray tool processes when none
    /// is tracked (e.g. after a crash-restart).
    pub async fn stop_plot(&self) -> Result<String, CoreError> {
        if self.supervisor.has_active().await {
            tracing::info!("Stopping active plot process");
            self.set_job_state(JobState::Stopping).await;
            self.supervisor.terminate(TERMINATE_GRACE).await?;
            Ok("Plot stopped".to_string())
        } else if self.supervisor.sweep_stray().await {
            Ok("Stray plot process stopped".to_string())
        } else {
            Ok("No active plot to stop".to_string())
        }
    }

    /// Two-step homing sequence: raise the pen, then walk the carriage
    /// home. Success unconditionally clears the resume state.
    pub async fn home(&self, pen_pos_up: u8) -> Result<String, CoreError> {
        self.run_utility(command::manual_args(
            &self.config,
            command::MANUAL_RAISE_PEN,
            Some(pen_pos_up),
        ))
        .await?;
        self.run_utility(command::manual_args(
            &self.config,
            command::MANUAL_WALK_HOME,
            Some(pen_pos_up),
        ))
        .await?;

        self.resume.clear(true).await;
        Ok("Home sequence completed successfully".to_string())
    }

    /// Run a synchronous one-shot tool invocation to completion.
    ///
    /// Returns the tool's stdout, or a generic success message when it
    /// produced none.
    pub async fn run_utility(&self, args: Vec<String>) -> Result<String, CoreError> {
        tracing::info!(command = %args.join(" "), "Executing plotter utility");

        let output = tokio::time::timeout(
            UTILITY_TIMEOUT,
            Command::new(&self.config.axicli_path).args(&args).output(),
        )
        .await
        .map_err(|_| {
            CoreError::Internal(format!(
                "Plotter command timed out after {}s",
                UTILITY_TIMEOUT.as_secs()
            ))
        })?
        .map_err(|e| CoreError::Launch(format!("{}: {e}", self.config.axicli_path.display())))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = if stderr.trim().is_empty() {
                "no error output".to_string()
            } else {
                stderr.trim().to_string()
            };
            tracing::error!(
                code = output.status.code().unwrap_or(-1),
                detail = %detail,
                "Plotter utility failed",
            );
            return Err(CoreError::ToolExecution {
                code: output.status.code().unwrap_or(-1),
                detail,
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(if stdout.is_empty() {
            "Command executed successfully".to_string()
        } else {
            stdout
        })
    }

    /// Terminate any active plot before the server exits.
    pub async fn shutdown(&self) {
        if self.supervisor.has_active().await {
            tracing::info!("Terminating active plot before shutdown");
            self.set_job_state(JobState::Stopping).await;
            if let Err(e) = self.supervisor.terminate(TERMINATE_GRACE).await {
                tracing::error!(error = %e, "Failed to terminate plot process during shutdown");
            }
        }
    }

    // ---- crate-internal helpers ----

    pub(crate) fn supervisor(&self) -> &ProcessSupervisor {
        &self.supervisor
    }

    /// Publish a progress event; dropped silently when nobody listens.
    pub(crate) fn publish(&self, event: PlotEvent) {
        let _ = self.event_tx.send(event);
    }

    pub(crate) async fn set_job_state(&self, state: JobState) {
        *self.job_state.lock().await = state;
    }

    /// Transition Idle -> Running, rejecting concurrent jobs.
    async fn claim_idle(&self) -> Result<(), CoreError> {
        let mut state = self.job_state.lock().await;
        if *state != JobState::Idle {
            return Err(CoreError::Conflict(
                "A plot job is already running".to_string(),
            ));
        }
        *state = JobState::Running;
        Ok(())
    }

    /// Validate, stage artifacts, and spawn the plot process.
    async fn launch_plot(self: &Arc<Self>, params: PlotParameters) -> Result<(), CoreError> {
        let resume_path = self.resume.prepare().await?;

        let temp_svg = match &params.svg {
            Some(svg) => Some(crate::artifact::write_temp_svg(
                &self.config.output_root,
                svg,
            )?),
            None => None,
        };

        let args = command::plot_args(&self.config, &params, temp_svg.as_deref(), &resume_path);
        tracing::info!(
            layer = params.layer,
            layer_label = params.layer_label.as_deref().unwrap_or("unknown"),
            "Starting plot job",
        );

        match self.supervisor.spawn(&self.config.axicli_path, &args).await {
            Ok((stdout, stderr)) => {
                let job = runner::JobContext {
                    layer: Some(params.layer),
                    layer_label: params.layer_label.clone(),
                    temp_svg,
                };
                tokio::spawn(runner::run_plot_job(Arc::clone(self), job, stdout, stderr));
                Ok(())
            }
            Err(e) => {
                if let Some(path) = &temp_svg {
                    crate::artifact::remove_temp_svg(path);
                }
                Err(e)
            }
        }
    }
}
