use std::net::SocketAddr;
use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use plotterd_axicli::artifact;
use plotterd_axicli::config::{PlotterConfig, PlotterProfiles};
use plotterd_axicli::manager::PlotterManager;

use plotterd_api::config::ServerConfig;
use plotterd_api::router::build_app_router;
use plotterd_api::sse;
use plotterd_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plotterd=debug,plotterd_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    let profiles =
        PlotterProfiles::load(&config.plotter_config_path).expect("Failed to load plotter profiles");
    let profile = profiles
        .default_profile()
        .expect("Default plotter profile missing");
    tracing::info!(
        profile = %profiles.default,
        model = profile.model,
        penlift = profile.penlift,
        "Loaded plotter profile",
    );

    let plotter_config = PlotterConfig {
        axicli_path: config.axicli_path.clone(),
        model: profile.model,
        penlift: profile.penlift,
        output_root: config.output_root.clone(),
    };

    // --- Output root ---
    std::fs::create_dir_all(&plotter_config.output_root)
        .expect("Failed to create output directory");
    artifact::cleanup_temp_artifacts(&plotter_config.output_root);

    // --- Plotter manager ---
    let plotter = PlotterManager::new(plotter_config);
    plotter.resume().bootstrap().await;
    tracing::info!("Plotter manager started");

    // --- SSE manager + event forwarder ---
    let sse_manager = Arc::new(sse::SseManager::new());
    let forwarder_handle =
        sse::start_event_forwarder(Arc::clone(&plotter), Arc::clone(&sse_manager));

    // --- App state ---
    let state = AppState {
        config: Arc::new(config.clone()),
        plotter: Arc::clone(&plotter),
        sse_manager: Arc::clone(&sse_manager),
    };

    // --- Router ---
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Terminate any in-flight plot first; the physical device must not be
    // left mid-stroke with the pen down.
    plotter.shutdown().await;
    tracing::info!("Plotter manager shut down");

    let sse_count = sse_manager.connection_count().await;
    tracing::info!(sse_count, "Closing remaining SSE connections");
    sse_manager.shutdown_all().await;

    forwarder_handle.abort();
    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager (e.g. systemd, Docker).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
