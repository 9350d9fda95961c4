//! Argument-vector construction for the vendor CLI.
//!
//! Pure functions: every command variant maps to one argv, built the same
//! way the browser-facing command table describes it. The executable path
//! itself is not part of the returned vector.

use std::path::Path;

use plotterd_core::types::PlotParameters;

use crate::config::PlotterConfig;

/// Manual-mode sub-commands used by the composite `home` sequence and the
/// one-shot utility commands.
pub const MANUAL_RAISE_PEN: &str = "raise_pen";
pub const MANUAL_WALK_HOME: &str = "walk_home";
pub const MANUAL_DISABLE_XY: &str = "disable_xy";

/// Argv for a fresh layer plot.
///
/// The temporary SVG artifact (when present) is the input file; the resume
/// marker path is passed as the tool's output file so an interrupted run
/// leaves a resumable artifact behind.
pub fn plot_args(
    config: &PlotterConfig,
    params: &PlotParameters,
    svg_path: Option<&Path>,
    resume_path: &Path,
) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(svg) = svg_path {
        args.push(svg.display().to_string());
    }
    args.extend([
        "--mode".to_string(),
        "layers".to_string(),
        "--layer".to_string(),
        params.layer.to_string(),
        "--model".to_string(),
        config.model.to_string(),
        "--pen_pos_up".to_string(),
        params.pen_pos_up.to_string(),
        "--pen_pos_down".to_string(),
        params.pen_pos_down.to_string(),
        "--pen_rate_lower".to_string(),
        params.pen_rate_lower.to_string(),
        "--penlift".to_string(),
        config.penlift.to_string(),
        "--progress".to_string(),
        "-o".to_string(),
        resume_path.display().to_string(),
    ]);
    args
}

/// Argv for resuming an interrupted plot from the resume marker.
///
/// The marker is both input and output: if the resumed run is itself
/// interrupted, it stays resumable.
pub fn resume_args(
    config: &PlotterConfig,
    pen_pos_up: u8,
    pen_pos_down: u8,
    pen_rate_lower: u32,
    resume_path: &Path,
) -> Vec<String> {
    vec![
        resume_path.display().to_string(),
        "--mode".to_string(),
        "res_plot".to_string(),
        "--model".to_string(),
        config.model.to_string(),
        "--pen_pos_up".to_string(),
        pen_pos_up.to_string(),
        "--pen_pos_down".to_string(),
        pen_pos_down.to_string(),
        "--pen_rate_lower".to_string(),
        pen_rate_lower.to_string(),
        "--penlift".to_string(),
        config.penlift.to_string(),
        "--progress".to_string(),
        "-o".to_string(),
        resume_path.display().to_string(),
    ]
}

/// Argv for `toggle` and `cycle`: full pen configuration.
pub fn pen_cycle_args(
    config: &PlotterConfig,
    mode: &str,
    pen_pos_up: u8,
    pen_pos_down: u8,
    pen_rate_lower: u32,
) -> Vec<String> {
    vec![
        "--mode".to_string(),
        mode.to_string(),
        "--model".to_string(),
        config.model.to_string(),
        "--pen_pos_up".to_string(),
        pen_pos_up.to_string(),
        "--pen_pos_down".to_string(),
        pen_pos_down.to_string(),
        "--pen_rate_lower".to_string(),
        pen_rate_lower.to_string(),
        "--penlift".to_string(),
        config.penlift.to_string(),
    ]
}

/// Argv for `align`: pen positions only, no lowering rate.
pub fn align_args(config: &PlotterConfig, pen_pos_up: u8, pen_pos_down: u8) -> Vec<String> {
    vec![
        "--mode".to_string(),
        "align".to_string(),
        "--model".to_string(),
        config.model.to_string(),
        "--pen_pos_up".to_string(),
        pen_pos_up.to_string(),
        "--pen_pos_down".to_string(),
        pen_pos_down.to_string(),
        "--penlift".to_string(),
        config.penlift.to_string(),
    ]
}

/// Argv for a manual-mode sub-command (`raise_pen`, `walk_home`,
/// `disable_xy`). The pen-up position is only meaningful for the pen and
/// homing movements.
pub fn manual_args(
    config: &PlotterConfig,
    manual_cmd: &str,
    pen_pos_up: Option<u8>,
) -> Vec<String> {
    let mut args = vec![
        "--mode".to_string(),
        "manual".to_string(),
        "--manual_cmd".to_string(),
        manual_cmd.to_string(),
        "--model".to_string(),
        config.model.to_string(),
    ];
    if let Some(up) = pen_pos_up {
        args.push("--pen_pos_up".to_string());
        args.push(up.to_string());
    }
    args.push("--penlift".to_string());
    args.push(config.penlift.to_string());
    args
}
