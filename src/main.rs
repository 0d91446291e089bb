/*****************************************************************************************
 *
 *  notifyd – Real-time Notification Microservice in Rust
 *  -----------------------------------------------------
 *
 *  In-memory notification log + live WebSocket fan-out
 *
 *****************************************************************************************/

use std::path::PathBuf;

use anyhow::{bail, Context};
use axum::serve;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::FmtSubscriber;

use notifyd::app;
use notifyd::config::{AppConfig, CONFIG_ENV};
use notifyd::services::gateway::Gateway;
use notifyd::state::app::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    //
    // ────────────────────────────────────────────────────────
    //  Locate and load config.json
    // ────────────────────────────────────────────────────────
    //
    let config_path = locate_config()?;
    let cfg = AppConfig::load_from_file(&config_path)?;

    //
    // ────────────────────────────────────────────────────────
    //  Configure logging
    // ────────────────────────────────────────────────────────
    //
    let level = match cfg.log_level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info"  => LevelFilter::INFO,
        "warn"  => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => LevelFilter::INFO,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    tracing::info!("Starting notifyd…");
    tracing::info!("Loaded configuration from {}: {:?}", config_path.display(), cfg);

    //
    // ────────────────────────────────────────────────────────
    //  Build state (store + broker owned by the gateway)
    // ────────────────────────────────────────────────────────
    //
    let state = AppState::new(cfg.clone());
    let app = app::build_app(state.clone());

    //
    // ────────────────────────────────────────────────────────
    //  Bind server and start listening
    // ────────────────────────────────────────────────────────
    //
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], cfg.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on http://{}", addr);

    serve(listener, app)
        .with_graceful_shutdown(shutdown(state.gateway.clone()))
        .await
        .context("Server error")?;

    tracing::info!("Goodbye.");
    Ok(())
}

/// `NOTIFYD_CONFIG` wins; otherwise look next to the executable, then one level up.
fn locate_config() -> anyhow::Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }

    let exe_path = std::env::current_exe().context("Cannot get executable path")?;
    let exe_dir = exe_path
        .parent()
        .context("Cannot get executable directory")?;

    let primary = exe_dir.join("config.json");
    if primary.exists() {
        return Ok(primary);
    }

    let fallback = exe_dir.join("..").join("config.json");
    if fallback.exists() {
        return Ok(fallback);
    }

    bail!(
        "config.json not found in:\n  {}\n  {}\nCopy config.json to one of these paths or set {}.",
        primary.display(),
        fallback.display(),
        CONFIG_ENV
    )
}

//
// ─────────────────────────────────────────────────────────────
//  Graceful shutdown handler
// ─────────────────────────────────────────────────────────────
//
async fn shutdown(gateway: std::sync::Arc<Gateway>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }

    tracing::warn!("CTRL+C received, closing subscriptions…");
    // Open WebSocket loops only end once their sessions do.
    gateway.shutdown();
}
