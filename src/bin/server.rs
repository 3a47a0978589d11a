//! Agent App HTTP 服务
//!
//! 启动: cargo run --bin agent-app-server --features web
//! 监听 [app].host:[app].port（默认 0.0.0.0:8000）

use std::sync::Arc;

use agent_app::config::load_config;
use agent_app::server::{create_router, AppState};
use agent_app::{observability, AgentEngine};
use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = load_config(None).context("Failed to load config")?;
    observability::init(&cfg.logging);

    let engine = AgentEngine::from_config(&cfg)
        .await
        .context("Failed to create engine")?;
    let state = Arc::new(AppState::new(engine, cfg.app.clone()));
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.app.host, cfg.app.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(
        app = %cfg.app.name,
        environment = %cfg.app.environment,
        "listening on http://{}",
        addr
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await
        .context("Server error")?;
    Ok(())
}
