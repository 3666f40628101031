//! Vinadock Web Server
//!
//! Run with: cargo run -p vinadock-web

use anyhow::Context;
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use vinadock_common::Config;
use vinadock_molecules::check_vina_available;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("vinadock=debug,info")),
        )
        .init();

    info!("🧬 Vinadock starting up...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    let vina_path = &config.docking.vina_path;
    if check_vina_available(vina_path) {
        info!("✅ AutoDock Vina found at {:?}", vina_path);
    } else {
        warn!("AutoDock Vina not found at {:?}; set docking.vina_path or VINADOCK_VINA_PATH", vina_path);
    }

    tokio::fs::create_dir_all(&config.docking.work_root)
        .await
        .with_context(|| format!("creating work root {:?}", config.docking.work_root))?;

    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("invalid server.bind address {:?}", config.server.bind))?;

    let state = vinadock_web::state::AppState::new(config)?;
    let app = vinadock_web::router::build_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🚀 Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Vinadock stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}
