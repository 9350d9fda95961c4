//! Temporary SVG artifacts.
//!
//! An incoming `plot` command may carry a raw SVG payload; it is persisted
//! to a uniquely named file under the output root so the vendor CLI can
//! read it, and removed again when the job reaches a terminal state.

use std::path::{Path, PathBuf};

use plotterd_core::error::CoreError;

/// Prefix/suffix of temporary plot artifacts, also matched by the startup
/// sweep.
const TEMP_PREFIX: &str = "temp_";
const TEMP_SUFFIX: &str = ".svg";

/// Persist an SVG payload to a timestamp-named temporary file.
pub fn write_temp_svg(output_root: &Path, svg: &str) -> Result<PathBuf, CoreError> {
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S%3f");
    let path = output_root.join(format!("{TEMP_PREFIX}{stamp}{TEMP_SUFFIX}"));
    std::fs::write(&path, svg)?;
    Ok(path)
}

/// Remove a temporary artifact.
///
/// Failures are logged and swallowed: cleanup must never prevent a job's
/// terminal-state transition.
pub fn remove_temp_svg(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove temporary SVG");
        }
    }
}

/// Delete temporary artifacts left over from previous runs.
///
/// Returns the number of files removed.
pub fn cleanup_temp_artifacts(output_root: &Path) -> usize {
    let entries = match std::fs::read_dir(output_root) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(
                dir = %output_root.display(),
                error = %e,
                "Could not scan output directory for stale artifacts",
            );
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(TEMP_PREFIX) && name.ends_with(TEMP_SUFFIX) {
            match std::fs::remove_file(entry.path()) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(path = %entry.path().display(), error = %e, "Failed to remove stale artifact");
                }
            }
        }
    }
    if removed > 0 {
        tracing::info!(count = removed, "Cleaned up stale temporary SVG files");
    }
    removed
}
