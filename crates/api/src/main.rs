use std::net::SocketAddr;
use std::time::Duration;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agency_api::bootstrap;
use agency_api::config::ServerConfig;
use agency_api::router::build_app_router;
use agency_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "agency_api=debug,agency_sync=debug,tower_http=debug".into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer()))
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Datastore ---
    let source = bootstrap::open_source(&config.datastore)
        .await
        .expect("Failed to open datastore");

    // --- App state ---
    let state = AppState::new(config.clone(), source.as_ref());

    let summary = state.workspace.load_all().await;
    for failed in &summary.failed {
        tracing::warn!(table = %failed.table, error = %failed.error, "Table failed to load");
    }
    tracing::info!(
        loaded = summary.loaded.len(),
        failed = summary.failed.len(),
        "Workspace loaded"
    );

    if let Some(admin) = &config.bootstrap_admin {
        bootstrap::ensure_admin(&state.workspace, admin)
            .await
            .expect("Failed to create bootstrap admin");
    }

    // --- Router ---
    let app = build_app_router(state.clone(), &config);

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
    tracing::info!("Server stopped accepting connections, draining queued writes");

    match tokio::time::timeout(
        Duration::from_secs(config.shutdown_timeout_secs),
        state.workspace.flush_all(),
    )
    .await
    {
        Ok(()) => tracing::info!("Queued writes drained"),
        Err(_) => tracing::warn!("Timed out waiting for queued writes; some may be lost"),
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process
/// manager.
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
