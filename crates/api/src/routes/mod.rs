pub mod health;
pub mod plotter;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /plotter            command dispatch (POST)
/// /plotter/resume     resume-status snapshot (GET)
/// ```
///
/// The SSE stream and health check are mounted at root level by the
/// application router.
pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/plotter", plotter::router())
}
