use std::path::PathBuf;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `8000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    ///
    /// Does not apply to the SSE stream route, which is long-lived.
    pub request_timeout_secs: u64,
    /// Path to the vendor CLI executable.
    pub axicli_path: PathBuf,
    /// Directory for saved output, temporary artifacts, and the resume marker.
    pub output_root: PathBuf,
    /// Path to the plotter hardware profiles file.
    pub plotter_config_path: PathBuf,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                |
    /// |------------------------|------------------------|
    /// | `HOST`                 | `0.0.0.0`              |
    /// | `PORT`                 | `8000`                 |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`|
    /// | `REQUEST_TIMEOUT_SECS` | `30`                   |
    /// | `AXICLI_PATH`          | `./bin/axicli`         |
    /// | `OUTPUT_ROOT`          | `output`               |
    /// | `PLOTTER_CONFIG`       | `config/plotters.json` |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "8000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let axicli_path =
            PathBuf::from(std::env::var("AXICLI_PATH").unwrap_or_else(|_| "./bin/axicli".into()));

        let output_root =
            PathBuf::from(std::env::var("OUTPUT_ROOT").unwrap_or_else(|_| "output".into()));

        let plotter_config_path = PathBuf::from(
            std::env::var("PLOTTER_CONFIG").unwrap_or_else(|_| "config/plotters.json".into()),
        );

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            axicli_path,
            output_root,
            plotter_config_path,
        }
    }
}
