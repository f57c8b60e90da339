use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use cc_rewards::api::{AppState, router};
use cc_rewards::{db, telemetry};
use clap::Parser;
use tracing::info;

/// HTTP backend serving card rankings to the web and mobile clients
#[derive(Parser, Debug)]
#[command(name = "backend", version, about)]
struct Config {
    #[arg(long, env = "CC_REWARDS_HOST", default_value = "127.0.0.1")]
    host: String,
    #[arg(long, env = "CC_REWARDS_PORT", default_value_t = 3000)]
    port: u16,
    /// SQLite catalog file
    #[arg(long, env = "CC_REWARDS_DB", default_value = "cc_rewards.db")]
    db: PathBuf,
    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info,tower_http=debug")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    telemetry::init(&config.log_level)?;

    let conn = db::init_db(&config.db)
        .with_context(|| format!("failed to open catalog {}", config.db.display()))?;
    let app = router(AppState::new(conn));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("invalid listen address {}:{}", config.host, config.port))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, db = %config.db.display(), "backend listening");
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
