use serde::{Deserialize, Serialize};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Default pen lowering rate when the client does not supply one.
pub const DEFAULT_PEN_RATE_LOWER: u32 = 25;

/// Immutable per-job parameters for a `plot` command.
///
/// Built once when the command is accepted and owned by the job's execution
/// task for its lifetime.
#[derive(Debug, Clone)]
pub struct PlotParameters {
    /// Layer number passed to the tool's `--layer` argument.
    pub layer: u32,
    /// Human-readable layer name, kept for resume metadata and logging.
    pub layer_label: Option<String>,
    /// Pen-up servo position (percent).
    pub pen_pos_up: u8,
    /// Pen-down servo position (percent).
    pub pen_pos_down: u8,
    /// Pen lowering rate.
    pub pen_rate_lower: u32,
    /// Raw SVG payload to persist to a temporary artifact before plotting.
    pub svg: Option<String>,
}

/// Result envelope for synchronous plotter commands and for the
/// "job started" acknowledgement of asynchronous ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    pub status: CommandStatus,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandStatus {
    Success,
    Error,
}

impl CommandResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: CommandStatus::Error,
            message: message.into(),
        }
    }
}

/// Read-only snapshot of the resume state.
///
/// `path` is only populated when the caller explicitly asked for it, so the
/// filesystem layout is not leaked to casual callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResumeStatus {
    pub available: bool,
    pub layer: Option<u32>,
    #[serde(rename = "layerLabel")]
    pub layer_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_result_serializes_with_lowercase_status() {
        let ok = CommandResult::success("Plot command started");
        let json = serde_json::to_value(&ok).expect("serialize");
        assert_eq!(json["status"], "success");
        assert_eq!(json["message"], "Plot command started");

        let err = CommandResult::error("boom");
        let json = serde_json::to_value(&err).expect("serialize");
        assert_eq!(json["status"], "error");
    }

    #[test]
    fn resume_status_omits_path_unless_present() {
        let status = ResumeStatus {
            available: false,
            layer: None,
            layer_label: None,
            path: None,
        };
        let json = serde_json::to_value(&status).expect("serialize");
        assert!(json.get("path").is_none());
        assert_eq!(json["layerLabel"], serde_json::Value::Null);
    }
}
