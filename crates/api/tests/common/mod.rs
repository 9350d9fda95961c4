use std::path::Path;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use tower::ServiceExt;

use plotterd_api::config::ServerConfig;
use plotterd_api::router::build_app_router;
use plotterd_api::sse;
use plotterd_api::state::AppState;
use plotterd_axicli::config::PlotterConfig;
use plotterd_axicli::manager::PlotterManager;

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config(output_root: &Path, axicli_path: &str) -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        axicli_path: axicli_path.into(),
        output_root: output_root.to_path_buf(),
        plotter_config_path: "config/plotters.json".into(),
    }
}

/// Build the full application router with all middleware layers, plus the
/// shared state so tests can reach the plotter manager directly.
///
/// This uses the same `build_app_router` as `main.rs`, so integration
/// tests exercise the production middleware stack. `axicli_path` points at
/// whatever stand-in executable the test needs (`/bin/true` for commands
/// that must succeed, a nonexistent path for ones that must never run).
pub fn build_test_app(output_root: &Path, axicli_path: &str) -> (Router, AppState) {
    let config = test_config(output_root, axicli_path);

    let plotter = PlotterManager::new(PlotterConfig {
        axicli_path: config.axicli_path.clone(),
        model: 2,
        penlift: 1,
        output_root: config.output_root.clone(),
    });
    let sse_manager = Arc::new(sse::SseManager::new());
    let _forwarder = sse::start_event_forwarder(Arc::clone(&plotter), Arc::clone(&sse_manager));

    let state = AppState {
        config: Arc::new(config.clone()),
        plotter,
        sse_manager,
    };
    (build_app_router(state.clone(), &config), state)
}

/// Issue a GET request against the app.
pub async fn get(app: Router, path: &str) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .uri(path)
            .body(Body::empty())
            .expect("request"),
    )
    .await
    .expect("response")
}

/// Issue a POST request with a JSON body against the app.
pub async fn post_json(app: Router, path: &str, json: serde_json::Value) -> Response<Body> {
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri(path)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
    )
    .await
    .expect("response")
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("valid JSON body")
}
