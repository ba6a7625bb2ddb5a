use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use clap::Parser;
use tokio::net::TcpListener;

use qixi_backend::cli;
use qixi_backend::core::config::{AppPaths, ConfigService};
use qixi_backend::core::logging;
use qixi_backend::server;
use qixi_backend::state::AppState;

/// Qixi date-planning assistant: retrieval-augmented planning over HTTP or a terminal REPL.
#[derive(Parser, Debug)]
#[command(name = "qixi-backend", version, about, long_about = None)]
struct Args {
    /// Run the interactive terminal session instead of the HTTP server
    #[arg(long)]
    cli: bool,

    /// Configuration file path (defaults to QIXI_CONFIG_PATH or config.yml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override server.host
    #[arg(long)]
    host: Option<String>,

    /// Override server.port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let paths = Arc::new(AppPaths::new());
    let mut config_service = ConfigService::new(paths.clone());
    if let Some(path) = args.config.clone() {
        config_service = config_service.with_config_path(path);
    }
    let mut config = config_service
        .load_app_config()
        .with_context(|| format!("Failed to load {}", config_service.config_path().display()))?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    logging::init(&paths, &config.logging);
    tracing::info!("Qixi dating planner starting");
    let effective = config_service.redacted(&config)?;
    tracing::debug!(config = %effective, "Effective configuration");

    let state = AppState::initialize(paths, config).await?;

    let report = state.seed().await;
    if report.seeded {
        tracing::info!(
            baseline = report.baseline_chunks,
            web = report.web_chunks,
            "Knowledge base seeded"
        );
    }

    if args.cli {
        return cli::run_repl(&state.planner).await;
    }

    let bind_addr = format!("{}:{}", state.config.server.host, state.config.server.port);
    let listener = TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_addr))?;
    let addr = listener.local_addr()?;
    tracing::info!("Listening on http://{}", addr);

    let app: Router = server::router(state.clone());
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
