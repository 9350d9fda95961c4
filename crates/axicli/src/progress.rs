//! Line-oriented output parsing for the plotting tool.
//!
//! Turns one line of subprocess stdout/stderr into at most one
//! [`PlotEvent`]. Consecutive identical progress-bar lines on the same
//! stream are suppressed so subscribers are not flooded with near-duplicate
//! renders; stdout and stderr are deduplicated independently.

use std::sync::OnceLock;

use regex::Regex;

use crate::events::PlotEvent;

/// Which subprocess stream a line arrived on.
///
/// Dedup state is tracked per stream, strictly in arrival order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Lines containing this marker (usually on stderr) are informational,
/// not errors.
const INFO_MARKER: &str = "estimated print time";

/// Matches the tool's textual progress bar: a leading label, a percentage,
/// a `done/total` fraction, and a bracketed timing/rate section, e.g.
/// `Plot Progress:   3%|###       | 200/6530 [00:03<02:00, 50.0 mm/s]`.
fn bar_pattern() -> &'static Regex {
    static BAR_RE: OnceLock<Regex> = OnceLock::new();
    BAR_RE.get_or_init(|| {
        Regex::new(r"^\S.*?\s\d{1,3}%\|.*\|\s*\d+/\d+\s*\[[^\[\]]*,\s*[^\[\]]+\]\s*$")
            .expect("progress bar pattern is valid")
    })
}

/// Stateful parser for one job's output.
///
/// Must be constructed fresh for every job so a bar line from a new run is
/// never suppressed by a stale match from a previous one.
#[derive(Debug, Default)]
pub struct ProgressParser {
    last_bar_stdout: Option<String>,
    last_bar_stderr: Option<String>,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one line, returning at most one event.
    ///
    /// Empty lines and lines carrying no actionable information yield
    /// `None`. Structured payloads that fail to parse fall through to
    /// plain-text handling rather than raising.
    pub fn parse(&mut self, stream: OutputStream, line: &str) -> Option<PlotEvent> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if let Some(event) = parse_structured(line) {
            return Some(event);
        }

        let is_bar = bar_pattern().is_match(line);
        let is_info = line.to_lowercase().contains(INFO_MARKER);
        if is_bar || is_info {
            return self.dedup_bar(stream, line);
        }

        match stream {
            OutputStream::Stdout => None,
            // Any other stderr line is an error signal; forwarded as-is
            // (never deduplicated) but NOT a terminal sentinel.
            OutputStream::Stderr => Some(PlotEvent::CliProgressBar {
                status: format!("Error: {line}"),
            }),
        }
    }

    fn dedup_bar(&mut self, stream: OutputStream, line: &str) -> Option<PlotEvent> {
        let slot = match stream {
            OutputStream::Stdout => &mut self.last_bar_stdout,
            OutputStream::Stderr => &mut self.last_bar_stderr,
        };
        if slot.as_deref() == Some(line) {
            return None;
        }
        *slot = Some(line.to_string());
        Some(PlotEvent::CliProgressBar {
            status: line.to_string(),
        })
    }
}

/// Try to interpret a line as a structured `progress_event` payload.
fn parse_structured(line: &str) -> Option<PlotEvent> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    let event = value.get("progress_event")?;
    let status = event.get("status")?.as_str()?;
    let progress = event.get("progress")?.as_f64()?;
    Some(PlotEvent::CliProgress {
        status: status.to_string(),
        progress,
    })
}
