/// Domain-level error taxonomy for plotter operations.
///
/// `Validation`, `Launch`, and `Conflict` are returned synchronously to the
/// command caller. `ToolExecution` raised inside an asynchronous plot job is
/// never surfaced over HTTP -- the job runner converts it into a `PLOT_ERROR`
/// stream event, because the caller has already received its acknowledgement.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A required command parameter is missing or malformed. Rejected
    /// before any side effect.
    #[error("{0}")]
    Validation(String),

    /// The external plotting tool could not be found or spawned.
    #[error("Failed to launch plotter tool: {0}")]
    Launch(String),

    /// The external plotting tool exited with a non-zero status.
    #[error("Command failed with exit code {code}: {detail}")]
    ToolExecution { code: i32, detail: String },

    /// The operation conflicts with the current job state (e.g. a second
    /// `plot` while one is already running).
    #[error("{0}")]
    Conflict(String),

    /// A filesystem or pipe operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An unexpected internal fault.
    #[error("Internal error: {0}")]
    Internal(String),
}
