//! Plotter command dispatch.
//!
//! Inbound commands are a closed set of tagged variants with one uniform
//! execution path each; whether a command is synchronous (runs the tool to
//! completion) or asynchronous (acknowledges and streams) is a property of
//! the variant, not a side effect of dispatch logic.

use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use plotterd_axicli::command;
use plotterd_core::types::{
    CommandResult, PlotParameters, ResumeStatus, DEFAULT_PEN_RATE_LOWER,
};

use crate::state::AppState;

/// A plotter command, tagged by its `command` field.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum PlotterCommand {
    /// Start an asynchronous plot of one layer.
    Plot {
        layer: Option<u32>,
        #[serde(rename = "layerLabel")]
        layer_label: Option<String>,
        pen_pos_up: u8,
        pen_pos_down: u8,
        #[serde(default = "default_pen_rate_lower")]
        pen_rate_lower: u32,
        svg: Option<String>,
    },
    /// Resume the previously interrupted plot from the saved marker.
    ResumePlot {
        pen_pos_up: u8,
        pen_pos_down: u8,
        #[serde(default = "default_pen_rate_lower")]
        pen_rate_lower: u32,
    },
    /// Toggle the pen between its up and down positions.
    Toggle {
        pen_pos_up: u8,
        pen_pos_down: u8,
        #[serde(default = "default_pen_rate_lower")]
        pen_rate_lower: u32,
    },
    /// Raise the pen and align the carriage for manual positioning.
    Align { pen_pos_up: u8, pen_pos_down: u8 },
    /// Cycle the pen down and back up once.
    Cycle {
        pen_pos_up: u8,
        pen_pos_down: u8,
        #[serde(default = "default_pen_rate_lower")]
        pen_rate_lower: u32,
    },
    /// Raise the pen.
    RaisePen { pen_pos_up: u8 },
    /// Power down the XY motors.
    DisableMotors,
    /// Raise the pen, walk the carriage home, and clear resume state.
    Home { pen_pos_up: u8 },
    /// Terminate the active plot (or sweep for strays).
    StopPlot,
}

fn default_pen_rate_lower() -> u32 {
    DEFAULT_PEN_RATE_LOWER
}

/// POST /api/v1/plotter
///
/// The body is decoded manually so that an unknown or malformed command
/// comes back as an error result rather than a transport-level rejection.
pub async fn dispatch_command(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Json<CommandResult> {
    let command: PlotterCommand = match serde_json::from_value(body) {
        Ok(command) => command,
        Err(e) => {
            tracing::warn!(error = %e, "Rejected plotter command");
            return Json(CommandResult::error(format!("Invalid plotter command: {e}")));
        }
    };
    Json(dispatch(&state, command).await)
}

/// Execute one command and fold the outcome into a [`CommandResult`].
pub async fn dispatch(state: &AppState, command: PlotterCommand) -> CommandResult {
    let result = match command {
        PlotterCommand::Plot {
            layer,
            layer_label,
            pen_pos_up,
            pen_pos_down,
            pen_rate_lower,
            svg,
        } => {
            let Some(layer) = layer else {
                // Rejected before any side effect; the tool is never invoked.
                return CommandResult::error("No layer specified in plot command");
            };
            let params = PlotParameters {
                layer,
                layer_label,
                pen_pos_up,
                pen_pos_down,
                pen_rate_lower,
                svg,
            };
            state.sse_manager.resume_heartbeats().await;
            state.plotter.start_plot(params).await
        }

        PlotterCommand::ResumePlot {
            pen_pos_up,
            pen_pos_down,
            pen_rate_lower,
        } => {
            state.sse_manager.resume_heartbeats().await;
            state
                .plotter
                .start_resume(pen_pos_up, pen_pos_down, pen_rate_lower)
                .await
        }

        PlotterCommand::Toggle {
            pen_pos_up,
            pen_pos_down,
            pen_rate_lower,
        } => {
            let args = command::pen_cycle_args(
                plotter_config(state),
                "toggle",
                pen_pos_up,
                pen_pos_down,
                pen_rate_lower,
            );
            state.plotter.run_utility(args).await
        }

        PlotterCommand::Align {
            pen_pos_up,
            pen_pos_down,
        } => {
            let args = command::align_args(plotter_config(state), pen_pos_up, pen_pos_down);
            state.plotter.run_utility(args).await
        }

        PlotterCommand::Cycle {
            pen_pos_up,
            pen_pos_down,
            pen_rate_lower,
        } => {
            let args = command::pen_cycle_args(
                plotter_config(state),
                "cycle",
                pen_pos_up,
                pen_pos_down,
                pen_rate_lower,
            );
            state.plotter.run_utility(args).await
        }

        PlotterCommand::RaisePen { pen_pos_up } => {
            let args = command::manual_args(
                plotter_config(state),
                command::MANUAL_RAISE_PEN,
                Some(pen_pos_up),
            );
            state.plotter.run_utility(args).await
        }

        PlotterCommand::DisableMotors => {
            let args =
                command::manual_args(plotter_config(state), command::MANUAL_DISABLE_XY, None);
            state.plotter.run_utility(args).await
        }

        PlotterCommand::Home { pen_pos_up } => state.plotter.home(pen_pos_up).await,

        PlotterCommand::StopPlot => {
            // Heartbeat loops stop before the process does; sockets stay
            // open so clients still observe already-queued frames.
            state.sse_manager.suspend_heartbeats().await;
            state.plotter.stop_plot().await
        }
    };

    match result {
        Ok(message) => CommandResult::success(message),
        Err(e) => CommandResult::error(e.to_string()),
    }
}

fn plotter_config(state: &AppState) -> &plotterd_axicli::config::PlotterConfig {
    state.plotter.plot_config()
}

/// Query parameters for the resume-status endpoint.
#[derive(Debug, Deserialize)]
pub struct ResumeStatusQuery {
    #[serde(default)]
    pub include_path: bool,
}

/// GET /api/v1/plotter/resume
pub async fn resume_status(
    State(state): State<AppState>,
    Query(query): Query<ResumeStatusQuery>,
) -> Json<ResumeStatus> {
    Json(state.plotter.resume_status(query.include_path).await)
}
