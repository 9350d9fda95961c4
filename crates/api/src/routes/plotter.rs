//! Route definitions for the `/plotter` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::plotter;
use crate::state::AppState;

/// Routes mounted at `/plotter`.
///
/// ```text
/// POST   /            -> dispatch_command
/// GET    /resume      -> resume_status
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(plotter::dispatch_command))
        .route("/resume", get(plotter::resume_status))
}
