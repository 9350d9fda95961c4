//! Ownership and lifecycle of the external plot process.
//!
//! At most one tracked process exists at any instant. Termination is
//! graceful-then-forceful: SIGTERM, a bounded wait, then SIGKILL. A
//! host-wide sweep handles stray instances of the tool left behind by a
//! crashed server; matching by process name / command line is inherently
//! racy, so the sweep is a best-effort fallback only, never a primary
//! lifecycle control.

use std::path::Path;
use std::process::ExitStatus;
use std::time::{Duration, Instant};

use sysinfo::{Pid, ProcessesToUpdate, Signal, System};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::Mutex;

use plotterd_core::error::CoreError;

/// How long to wait after SIGTERM before force-killing.
pub const TERMINATE_GRACE: Duration = Duration::from_secs(5);

/// Polling interval while waiting for a process to exit.
const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Tracked-process slot.
///
/// `Exited` holds a status observed by `terminate` so that a concurrent
/// `wait` can still consume the exit code.
#[derive(Debug)]
enum ProcessSlot {
    Idle,
    Running(Child),
    Exited(ExitStatus),
}

/// Owns the external plot subprocess handle.
pub struct ProcessSupervisor {
    slot: Mutex<ProcessSlot>,
    /// Tool file name used to match stray processes.
    tool_name: String,
}

impl ProcessSupervisor {
    pub fn new(tool_name: String) -> Self {
        Self {
            slot: Mutex::new(ProcessSlot::Idle),
            tool_name,
        }
    }

    /// Launch the tool with piped stdout/stderr and track the handle.
    ///
    /// Returns the output streams for the caller to consume. Fails with
    /// `Conflict` if a process is already tracked and `Launch` if the
    /// executable cannot be spawned.
    pub async fn spawn(
        &self,
        program: &Path,
        args: &[String],
    ) -> Result<(ChildStdout, ChildStderr), CoreError> {
        let mut slot = self.slot.lock().await;
        if matches!(*slot, ProcessSlot::Running(_)) {
            return Err(CoreError::Conflict(
                "A plotter process is already active".to_string(),
            ));
        }

        let mut child = Command::new(program)
            .args(args)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CoreError::Launch(format!("{}: {e}", program.display())))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CoreError::Internal("Child stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| CoreError::Internal("Child stderr was not captured".to_string()))?;

        tracing::info!(pid = child.id(), "Plotter process started");
        *slot = ProcessSlot::Running(child);
        Ok((stdout, stderr))
    }

    /// Whether a live process is currently tracked.
    pub async fn has_active(&self) -> bool {
        matches!(*self.slot.lock().await, ProcessSlot::Running(_))
    }

    /// Block until the tracked process exits and return its exit code.
    ///
    /// Polls on a short interval so `terminate` can interleave with the
    /// wait. A process killed by a signal reports code `-1`.
    pub async fn wait(&self) -> Result<i32, CoreError> {
        loop {
            {
                let mut slot = self.slot.lock().await;
                match &mut *slot {
                    ProcessSlot::Idle => {
                        return Err(CoreError::Internal(
                            "No tracked plotter process to wait on".to_string(),
                        ));
                    }
                    ProcessSlot::Exited(status) => {
                        let code = status.code().unwrap_or(-1);
                        *slot = ProcessSlot::Idle;
                        return Ok(code);
                    }
                    ProcessSlot::Running(child) => {
                        if let Some(status) = child.try_wait()? {
                            let code = status.code().unwrap_or(-1);
                            *slot = ProcessSlot::Idle;
                            return Ok(code);
                        }
                    }
                }
            }
            tokio::time::sleep(EXIT_POLL_INTERVAL).await;
        }
    }

    /// Gracefully terminate the tracked process.
    ///
    /// Sends SIGTERM, waits up to `grace` for exit, and force-kills if
    /// still alive. The live handle is gone afterward in every case; the
    /// observed exit status is left for `wait` to consume.
    pub async fn terminate(&self, grace: Duration) -> Result<(), CoreError> {
        let pid = {
            let slot = self.slot.lock().await;
            match &*slot {
                ProcessSlot::Running(child) => child.id(),
                _ => None,
            }
        };
        let Some(pid) = pid else {
            return Ok(());
        };

        tracing::info!(pid, "Terminating plotter process");
        #[cfg(unix)]
        unsafe {
            libc::kill(pid as i32, libc::SIGTERM);
        }

        let deadline = Instant::now() + grace;
        loop {
            {
                let mut slot = self.slot.lock().await;
                match &mut *slot {
                    ProcessSlot::Running(child) => {
                        if let Some(status) = child.try_wait()? {
                            tracing::info!(pid, "Plotter process terminated");
                            *slot = ProcessSlot::Exited(status);
                            return Ok(());
                        }
                    }
                    // The waiting side already reaped it.
                    _ => return Ok(()),
                }
            }
            if Instant::now() >= deadline {
                break;
            }
            tokio::time::sleep(EXIT_POLL_INTERVAL).await;
        }

        let mut slot = self.slot.lock().await;
        if let ProcessSlot::Running(child) = &mut *slot {
            tracing::warn!(pid, "Plotter process did not exit within grace period, killing");
            child.start_kill()?;
            let status = child.wait().await?;
            *slot = ProcessSlot::Exited(status);
        }
        Ok(())
    }

    /// Best-effort sweep of untracked instances of the plotting tool.
    ///
    /// Scans the host process table for processes whose name or command
    /// line contains the tool's file name and runs each through the same
    /// graceful-then-forceful sequence. Returns whether any stray process
    /// was found. Only meaningful when no handle is tracked in-process
    /// (e.g. after a crash-restart).
    pub async fn sweep_stray(&self) -> bool {
        let needle = self.tool_name.clone();
        tokio::task::spawn_blocking(move || sweep_stray_blocking(&needle))
            .await
            .unwrap_or(false)
    }
}

/// Blocking body of the stray sweep; runs on the blocking thread pool.
fn sweep_stray_blocking(needle: &str) -> bool {
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::All, true);

    let own_pid = std::process::id();
    let targets: Vec<Pid> = system
        .processes()
        .iter()
        .filter(|(pid, process)| pid.as_u32() != own_pid && process_matches(process, needle))
        .map(|(pid, _)| *pid)
        .collect();

    if targets.is_empty() {
        tracing::info!(tool = needle, "No stray plotter processes found");
        return false;
    }

    for pid in &targets {
        if let Some(process) = system.process(*pid) {
            tracing::info!(pid = pid.as_u32(), tool = needle, "Terminating stray plotter process");
            if process.kill_with(Signal::Term).is_none() {
                process.kill();
            }
        }
    }

    let deadline = Instant::now() + TERMINATE_GRACE;
    loop {
        std::thread::sleep(EXIT_POLL_INTERVAL);
        system.refresh_processes(ProcessesToUpdate::Some(&targets), true);
        let alive: Vec<Pid> = targets
            .iter()
            .copied()
            .filter(|pid| system.process(*pid).is_some())
            .collect();
        if alive.is_empty() {
            break;
        }
        if Instant::now() >= deadline {
            for pid in alive {
                if let Some(process) = system.process(pid) {
                    tracing::warn!(pid = pid.as_u32(), "Stray process survived SIGTERM, killing");
                    process.kill();
                }
            }
            break;
        }
    }
    true
}

fn process_matches(process: &sysinfo::Process, needle: &str) -> bool {
    process.name().to_string_lossy().contains(needle)
        || process
            .cmd()
            .iter()
            .any(|arg| arg.to_string_lossy().contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn sh_args(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    #[tokio::test]
    async fn spawn_of_missing_executable_is_a_launch_error() {
        let supervisor = ProcessSupervisor::new("missing-tool".to_string());
        let result = supervisor
            .spawn(Path::new("/nonexistent/axicli-test"), &[])
            .await;
        assert_matches!(result, Err(CoreError::Launch(_)));
        assert!(!supervisor.has_active().await);
    }

    #[tokio::test]
    async fn wait_returns_the_exit_code() {
        let supervisor = ProcessSupervisor::new("sh".to_string());
        supervisor
            .spawn(Path::new("/bin/sh"), &sh_args("exit 3"))
            .await
            .expect("spawn");
        assert_eq!(supervisor.wait().await.expect("wait"), 3);
        assert!(!supervisor.has_active().await);
    }

    #[tokio::test]
    async fn second_spawn_while_active_is_a_conflict() {
        let supervisor = ProcessSupervisor::new("sh".to_string());
        supervisor
            .spawn(Path::new("/bin/sh"), &sh_args("sleep 5"))
            .await
            .expect("spawn");
        let second = supervisor
            .spawn(Path::new("/bin/sh"), &sh_args("exit 0"))
            .await;
        assert_matches!(second, Err(CoreError::Conflict(_)));

        supervisor
            .terminate(Duration::from_secs(2))
            .await
            .expect("terminate");
    }

    #[tokio::test]
    async fn terminate_then_wait_observes_a_signalled_exit() {
        let supervisor = ProcessSupervisor::new("sh".to_string());
        supervisor
            .spawn(Path::new("/bin/sh"), &sh_args("sleep 30"))
            .await
            .expect("spawn");

        supervisor
            .terminate(Duration::from_secs(2))
            .await
            .expect("terminate");
        // Signalled processes have no exit code.
        assert_eq!(supervisor.wait().await.expect("wait"), -1);
        assert!(!supervisor.has_active().await);
    }

    #[tokio::test]
    async fn terminate_with_nothing_tracked_is_a_no_op() {
        let supervisor = ProcessSupervisor::new("sh".to_string());
        supervisor
            .terminate(Duration::from_millis(50))
            .await
            .expect("terminate");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sweep_finds_and_stops_a_matching_stray() {
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().expect("tempdir");
        let tool_name = format!("fake-axicli-{}", uuid::Uuid::new_v4().simple());
        let script_path = dir.path().join(&tool_name);
        {
            let mut file = std::fs::File::create(&script_path).expect("create script");
            writeln!(file, "#!/bin/sh\nsleep 30").expect("write script");
        }
        std::fs::set_permissions(&script_path, std::fs::Permissions::from_mode(0o755))
            .expect("chmod");

        let mut stray = std::process::Command::new(&script_path)
            .spawn()
            .expect("spawn stray");

        // Reap from a side thread so the stray does not linger as a zombie
        // that the sweep's liveness check would still see.
        let reaper = std::thread::spawn(move || stray.wait());

        let supervisor = ProcessSupervisor::new(tool_name);
        assert!(supervisor.sweep_stray().await);

        let status = reaper.join().expect("join reaper").expect("reap stray");
        assert!(!status.success());
    }

    #[tokio::test]
    async fn sweep_without_matches_reports_nothing_found() {
        let supervisor =
            ProcessSupervisor::new(format!("no-such-tool-{}", uuid::Uuid::new_v4().simple()));
        assert!(!supervisor.sweep_stray().await);
    }
}
