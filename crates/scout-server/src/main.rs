use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::watch;
use tracing::{error, info, warn};

use scout_server::config::{Config, DEFAULT_CONFIG_PATH};
use scout_server::state::AppState;
use scout_server::{http, scheduler, telemetry};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let path = std::env::var("SCOUT_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));
    let config = Config::load(&path).context("failed to load configuration")?;
    telemetry::init(&config.log_level, config.json_logs)?;

    let state = AppState::connect(&config).await?;
    state.seed_users(&config).await?;

    let (stop, stopped) = watch::channel(false);
    let scheduler = tokio::spawn(scheduler::run(
        state.clone(),
        Duration::from_secs(config.scheduler_interval_secs),
        stopped,
    ));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;
    info!(addr = %config.bind_addr, "scout server listening");

    axum::serve(listener, http::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server terminated")?;

    let _ = stop.send(true);
    if let Err(e) = scheduler.await {
        warn!(error = %e, "scheduler task ended abnormally");
    }
    info!("scout server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "unable to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
