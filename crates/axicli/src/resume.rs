//! Resumable-plot state.
//!
//! A plot interrupted partway through leaves a marker file under the output
//! root; its *existence on disk* is the source of truth for whether a resume
//! is possible, while an in-memory mirror serves reads. The mirror and the
//! file must never disagree: every path that deletes the marker also clears
//! the mirror.

use std::path::{Path, PathBuf};

use tokio::sync::RwLock;

use plotterd_core::error::CoreError;
use plotterd_core::types::ResumeStatus;

/// File name of the resume marker inside the output root.
pub const RESUME_LOG_NAME: &str = "resume_plot.log";

#[derive(Debug, Default)]
struct ResumeStateInner {
    available: bool,
    layer: Option<u32>,
    layer_label: Option<String>,
}

/// Durable record of whether a partially completed plot can be resumed.
pub struct ResumeStore {
    path: PathBuf,
    state: RwLock<ResumeStateInner>,
}

impl ResumeStore {
    pub fn new(output_root: &Path) -> Self {
        Self {
            path: output_root.join(RESUME_LOG_NAME),
            state: RwLock::new(ResumeStateInner::default()),
        }
    }

    /// Path of the marker file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Delete any pre-existing marker so a fresh run starts clean.
    ///
    /// Idempotent; returns the resolved marker path.
    pub async fn prepare(&self) -> Result<PathBuf, CoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        *self.state.write().await = ResumeStateInner::default();
        Ok(self.path.clone())
    }

    /// Record resume metadata.
    ///
    /// `available` only becomes true if the marker file actually exists on
    /// disk at call time -- a run that never produced output must not be
    /// reported as resumable.
    pub async fn mark_available(&self, layer: Option<u32>, layer_label: Option<&str>) {
        let exists = self.path.exists();
        let mut state = self.state.write().await;
        state.layer = layer;
        state.layer_label = layer_label.map(str::to_string);
        state.available = exists;
        if exists {
            tracing::info!(
                path = %self.path.display(),
                layer = layer.unwrap_or(0),
                "Plot marked resumable",
            );
        } else {
            tracing::debug!(
                path = %self.path.display(),
                "Resume marker missing, not marking resumable",
            );
        }
    }

    /// Reset to not-available and, unless suppressed, delete the marker.
    ///
    /// Marker deletion failures are logged and swallowed; the in-memory
    /// state is cleared regardless.
    pub async fn clear(&self, remove_file: bool) {
        if remove_file {
            match std::fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove resume marker");
                }
            }
        }
        *self.state.write().await = ResumeStateInner::default();
    }

    /// Restore resume availability from a marker left by a prior process
    /// lifetime. Layer metadata is not recoverable from the file itself.
    pub async fn bootstrap(&self) {
        let mut state = self.state.write().await;
        if self.path.exists() {
            state.available = true;
            tracing::info!(path = %self.path.display(), "Found resume marker from a previous run");
        } else {
            *state = ResumeStateInner::default();
        }
    }

    /// Read-only snapshot. The path is included only on request and only
    /// while a resume is actually available.
    pub async fn status(&self, include_path: bool) -> ResumeStatus {
        let state = self.state.read().await;
        ResumeStatus {
            available: state.available,
            layer: state.layer,
            layer_label: state.layer_label.clone(),
            path: if include_path && state.available {
                Some(self.path.display().to_string())
            } else {
                None
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, ResumeStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ResumeStore::new(dir.path());
        (dir, store)
    }

    fn touch_marker(store: &ResumeStore) {
        std::fs::write(store.path(), "resume data").expect("write marker");
    }

    #[tokio::test]
    async fn prepare_overwrites_a_previous_marker() {
        let (_dir, store) = store();
        touch_marker(&store);

        let resolved = store.prepare().await.expect("prepare");
        assert_eq!(resolved, store.path());
        assert!(!store.path().exists());

        // Idempotent: a second call with no file present still succeeds.
        store.prepare().await.expect("prepare again");
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn mark_available_requires_an_existing_file() {
        let (_dir, store) = store();

        store.mark_available(Some(2), Some("Layer 2")).await;
        assert!(!store.status(false).await.available);

        touch_marker(&store);
        store.mark_available(Some(3), Some("Blue Layer")).await;

        let status = store.status(true).await;
        assert!(status.available);
        assert_eq!(status.layer, Some(3));
        assert_eq!(status.layer_label.as_deref(), Some("Blue Layer"));
        assert_eq!(status.path.as_deref(), Some(store.path().to_str().expect("utf8 path")));
    }

    #[tokio::test]
    async fn clear_removes_the_marker_and_resets_state() {
        let (_dir, store) = store();
        touch_marker(&store);
        store.mark_available(Some(1), None).await;

        store.clear(true).await;
        assert!(!store.path().exists());

        let status = store.status(true).await;
        assert!(!status.available);
        assert_eq!(status.layer, None);
        assert_eq!(status.path, None);
    }

    #[tokio::test]
    async fn clear_can_leave_the_file_in_place() {
        let (_dir, store) = store();
        touch_marker(&store);
        store.mark_available(Some(1), None).await;

        store.clear(false).await;
        assert!(store.path().exists());
        assert!(!store.status(false).await.available);
    }

    #[tokio::test]
    async fn bootstrap_detects_a_pre_existing_marker() {
        let (_dir, store) = store();
        touch_marker(&store);

        store.bootstrap().await;
        let status = store.status(true).await;
        assert!(status.available);
        assert_eq!(status.path.as_deref(), Some(store.path().to_str().expect("utf8 path")));
    }

    #[tokio::test]
    async fn bootstrap_without_a_marker_stays_unavailable() {
        let (_dir, store) = store();
        store.bootstrap().await;
        assert!(!store.status(false).await.available);
    }
}
