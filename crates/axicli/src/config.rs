//! Plotter hardware configuration.
//!
//! Hardware profiles (AxiDraw model number and pen-lift servo selection) are
//! loaded from a JSON file shared with the browser client, mirroring the
//! `plotters.json` convention. The resolved [`PlotterConfig`] is what the
//! rest of the crate consumes.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use plotterd_core::error::CoreError;

/// A single hardware profile from the profiles file.
#[derive(Debug, Clone, Deserialize)]
pub struct PlotterProfile {
    /// AxiDraw model number passed to `--model`.
    pub model: u32,
    /// Pen-lift servo configuration passed to `--penlift`.
    pub penlift: u32,
}

/// The full profiles file: named profiles plus the active selection.
#[derive(Debug, Clone, Deserialize)]
pub struct PlotterProfiles {
    pub plotters: HashMap<String, PlotterProfile>,
    pub default: String,
}

impl PlotterProfiles {
    /// Load and parse the profiles file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            CoreError::Internal(format!(
                "Invalid plotter profiles file {}: {e}",
                path.display()
            ))
        })
    }

    /// The profile named by the `default` key.
    pub fn default_profile(&self) -> Result<&PlotterProfile, CoreError> {
        self.plotters.get(&self.default).ok_or_else(|| {
            CoreError::Internal(format!(
                "Default plotter profile '{}' is not defined",
                self.default
            ))
        })
    }
}

/// Resolved configuration handed to [`crate::manager::PlotterManager`].
#[derive(Debug, Clone)]
pub struct PlotterConfig {
    /// Path to the vendor CLI executable.
    pub axicli_path: PathBuf,
    /// AxiDraw model number.
    pub model: u32,
    /// Pen-lift servo configuration.
    pub penlift: u32,
    /// Directory holding saved output, temporary artifacts, and the resume
    /// marker file.
    pub output_root: PathBuf,
}

impl PlotterConfig {
    /// File name of the CLI executable, used to match stray processes.
    pub fn tool_name(&self) -> String {
        self.axicli_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "axicli".to_string())
    }
}
