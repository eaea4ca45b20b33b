//! HTTP server entry point.
//!
//! Run with:
//!   cargo run --bin ragshelf-server
//!
//! Requires `HUGGINGFACEHUB_API_TOKEN` (in the environment or an `.env`
//! file) for the hosted embedding and completion endpoints. Optional:
//! `RAGSHELF_ADDR` and `RAGSHELF_DATA_DIR`.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::Level;
use tracing_subscriber::{EnvFilter, fmt};

use ragshelf::config::AppConfig;
use ragshelf::server::router;
use ragshelf::service::ShelfService;
use ragshelf::session::SessionManager;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let config = AppConfig::from_env();
    let index_root = config.storage.index_root.clone();
    let bind_addr = config.server.bind_addr.clone();

    let service = Arc::new(ShelfService::builder(config).try_build()?);
    let sessions = Arc::new(SessionManager::new(index_root));

    match sessions.clean_orphans().await {
        Ok(0) => {}
        Ok(removed) => tracing::info!(removed, "cleaned orphaned index directories"),
        Err(err) => tracing::warn!(error = %err, "orphan cleanup failed"),
    }
    Arc::clone(&sessions).start_sweeper();

    let router = router(service, sessions);

    let addr: SocketAddr = bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Serving on http://{addr}");
    axum::serve(listener, router.into_make_service()).await?;

    Ok(())
}
