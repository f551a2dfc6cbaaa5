// Rover telemetry server: one ingest session plus the read API.

use anyhow::Context;
use tracing::{info, warn};

use rover_telemetry_server::app::AppState;
use rover_telemetry_server::config::AppConfig;
use rover_telemetry_server::http;
use rover_telemetry_server::session::TelemetrySession;
use rover_telemetry_server::tasks;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    info!(
        source = %config.source,
        url = %config.ws_url,
        wheel_history = config.wheel_history,
        event_log = config.event_log,
        "configuration loaded"
    );

    let mut session = TelemetrySession::from_config(&config);
    session.start();

    let app_state = AppState::new(session.subscribe(), session.source());
    tokio::spawn(tasks::state_update_task(app_state.clone()));

    let app = http::router(app_state);
    let addr = config.http_addr;
    info!(%addr, "starting server");
    let served = axum::Server::try_bind(&addr)
        .with_context(|| format!("failed to bind {addr}"))?
        .serve(app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await;

    session.stop();
    served.context("server failed")?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown requested"),
        Err(err) => {
            warn!(?err, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    }
}
