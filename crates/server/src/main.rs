mod api;
mod config;
mod db;
mod entity;
mod repository;
mod service;

use std::sync::Arc;

use anyhow::Context;
use judge_client::{HttpJudgeApi, JudgeApi};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::AppState;
use crate::config::AppConfig;
use crate::repository::SeaOrmDocumentRepository;
use crate::service::DocumentService;

const CONFIG_PATH: &str = "realtime.toml";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing()?;

    info!("starting realtime server");
    info!("loading server config from {CONFIG_PATH}");
    let config = AppConfig::load(CONFIG_PATH)
        .with_context(|| format!("failed to load server config from {CONFIG_PATH}"))?;

    let db = db::init_pool_and_migrate()
        .await
        .context("failed to initialize database")?;
    info!("database ready");

    let judge_config = config.judge.clone().with_env_overrides();
    let judge: Option<Arc<dyn JudgeApi>> = if judge_config.is_enabled() {
        let api = HttpJudgeApi::new(&judge_config).context("failed to initialize judge client")?;
        Some(Arc::new(api))
    } else {
        warn!("no judge API key configured, code execution is disabled");
        None
    };

    let documents = DocumentService::new(Arc::new(SeaOrmDocumentRepository::new(db)));
    let state = Arc::new(AppState::new(
        documents,
        judge,
        judge_config,
        config.server.identity_header()?,
    ));

    let listener = tokio::net::TcpListener::bind(config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    info!(addr = %config.server.bind, "server is ready, press Ctrl+C to shut down");

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received, stopping server");
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}
