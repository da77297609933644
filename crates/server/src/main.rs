mod cli;
mod config;
mod jobs;
mod logging;
mod processing;
mod routes;
mod state;

use crate::cli::Args;
use crate::config::load_server_config;
use crate::logging::init_tracing;
use crate::routes::build_router;
use crate::state::build_app_state;
use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _log_guard = init_tracing(args.log_dir.as_deref(), args.log_to_stderr)?;

    info!(
        listen_addr = %args.listen_addr,
        config = ?args.config,
        "riskscan starting"
    );
    let config = load_server_config(args.config.as_deref())?;
    let state = build_app_state(&config).context("failed to initialize service state")?;
    let app = build_router(state, config.limits.max_upload_bytes);

    let listener = TcpListener::bind(&args.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", args.listen_addr))?;
    info!(addr = %args.listen_addr, "riskscan listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown())
        .await?;
    info!("riskscan shutting down");
    Ok(())
}

async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}
