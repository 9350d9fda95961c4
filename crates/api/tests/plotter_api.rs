//! Integration tests for the plotter command endpoint and resume status.
//!
//! The vendor CLI is stood in for by `/bin/true` (commands that must
//! succeed) or a path that does not exist (commands that must never run).

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{body_json, build_test_app, get, post_json};

use plotterd_axicli::manager::JobState;
use plotterd_api::state::AppState;

/// Poll until the job state machine returns to idle.
async fn wait_until_idle(state: &AppState) {
    for _ in 0..50 {
        if state.plotter.job_state().await == JobState::Idle {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("job did not return to idle");
}

// ---------------------------------------------------------------------------
// Health + general HTTP behaviour
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_check_returns_ok_with_job_state() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, _state) = build_test_app(dir.path(), "/bin/true");

    let response = get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
    assert_eq!(json["job_state"], "idle");
}

#[tokio::test]
async fn response_contains_x_request_id_header() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, _state) = build_test_app(dir.path(), "/bin/true");

    let response = get(app, "/health").await;
    assert!(response.headers().get("x-request-id").is_some());
}

#[tokio::test]
async fn unknown_route_returns_404() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, _state) = build_test_app(dir.path(), "/bin/true");

    let response = get(app, "/this-route-does-not-exist").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

#[tokio::test]
async fn plot_without_layer_is_rejected_before_any_side_effect() {
    let dir = tempfile::tempdir().expect("tempdir");
    // A nonexistent tool path: if the dispatcher ever tried to launch it,
    // the error message would differ.
    let (app, state) = build_test_app(dir.path(), "/nonexistent/axicli-must-not-run");

    let response = post_json(
        app,
        "/api/v1/plotter",
        serde_json::json!({
            "command": "plot",
            "pen_pos_up": 60,
            "pen_pos_down": 40,
            "svg": "<svg/>"
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["message"], "No layer specified in plot command");

    // No temp artifact was staged and the state machine never left idle.
    assert_eq!(state.plotter.job_state().await, JobState::Idle);
    let staged: Vec<_> = std::fs::read_dir(dir.path())
        .expect("read dir")
        .flatten()
        .collect();
    assert!(staged.is_empty());
}

#[tokio::test]
async fn unknown_command_returns_an_error_result() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, _state) = build_test_app(dir.path(), "/bin/true");

    let response = post_json(
        app,
        "/api/v1/plotter",
        serde_json::json!({"command": "warp_drive"}),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
}

#[tokio::test]
async fn align_command_runs_the_tool_synchronously() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, _state) = build_test_app(dir.path(), "/bin/true");

    let response = post_json(
        app,
        "/api/v1/plotter",
        serde_json::json!({
            "command": "align",
            "pen_pos_up": 50,
            "pen_pos_down": 30
        }),
    )
    .await;

    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
}

#[tokio::test]
async fn plot_runs_to_completion_and_clears_resume() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, state) = build_test_app(dir.path(), "/bin/true");

    let response = post_json(
        app,
        "/api/v1/plotter",
        serde_json::json!({
            "command": "plot",
            "layer": 2,
            "layerLabel": "Layer 2",
            "pen_pos_up": 60,
            "pen_pos_down": 40,
            "svg": "<svg xmlns=\"http://www.w3.org/2000/svg\"/>"
        }),
    )
    .await;

    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["message"], "Plot command started");

    wait_until_idle(&state).await;

    // Clean completion: temp artifact removed, nothing resumable.
    let leftovers: Vec<_> = std::fs::read_dir(dir.path())
        .expect("read dir")
        .flatten()
        .filter(|e| e.file_name().to_string_lossy().starts_with("temp_"))
        .collect();
    assert!(leftovers.is_empty());
    assert!(!state.plotter.resume_status(false).await.available);
}

#[tokio::test]
async fn stop_plot_with_no_target_still_succeeds() {
    let dir = tempfile::tempdir().expect("tempdir");
    let tool = format!(
        "/nonexistent/axicli-{}",
        uuid::Uuid::new_v4().simple()
    );
    let (app, _state) = build_test_app(dir.path(), &tool);

    let response = post_json(app, "/api/v1/plotter", serde_json::json!({"command": "stop_plot"}))
        .await;

    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["message"], "No active plot to stop");
}

// ---------------------------------------------------------------------------
// Home + resume state
// ---------------------------------------------------------------------------

#[tokio::test]
async fn home_clears_resume_availability_and_marker() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, state) = build_test_app(dir.path(), "/bin/true");

    // Model an interrupted plot: marker on disk, metadata in memory.
    std::fs::write(state.plotter.resume().path(), "resume data").expect("marker");
    state.plotter.resume().mark_available(Some(7), None).await;
    assert!(state.plotter.resume_status(false).await.available);

    let response = post_json(
        app,
        "/api/v1/plotter",
        serde_json::json!({"command": "home", "pen_pos_up": 90}),
    )
    .await;

    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["message"], "Home sequence completed successfully");

    assert!(!state.plotter.resume().path().exists());
    let status = state.plotter.resume_status(true).await;
    assert!(!status.available);
    assert_eq!(status.layer, None);
    assert_eq!(status.path, None);
}

#[tokio::test]
async fn resume_status_endpoint_reports_the_marker() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, state) = build_test_app(dir.path(), "/bin/true");

    let response = get(app.clone(), "/api/v1/plotter/resume").await;
    let json = body_json(response).await;
    assert_eq!(json["available"], false);
    assert!(json.get("path").is_none());

    std::fs::write(state.plotter.resume().path(), "resume data").expect("marker");
    state
        .plotter
        .resume()
        .mark_available(Some(3), Some("Blue Layer"))
        .await;

    let response = get(app, "/api/v1/plotter/resume?include_path=true").await;
    let json = body_json(response).await;
    assert_eq!(json["available"], true);
    assert_eq!(json["layer"], 3);
    assert_eq!(json["layerLabel"], "Blue Layer");
    assert!(json["path"].as_str().expect("path").ends_with("resume_plot.log"));
}

#[tokio::test]
async fn resume_plot_without_marker_is_an_error_result() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (app, _state) = build_test_app(dir.path(), "/bin/true");

    let response = post_json(
        app,
        "/api/v1/plotter",
        serde_json::json!({
            "command": "resume_plot",
            "pen_pos_up": 60,
            "pen_pos_down": 40
        }),
    )
    .await;

    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["message"], "No resumable plot is available");
}
