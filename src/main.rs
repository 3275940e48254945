//! riffbank service binary

use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use riffbank::config::Config;
use riffbank::similarity::SimilarityEngine;
use riffbank::store::RiffStore;
use riffbank::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting riffbank");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = Config::load()?;
    info!(
        port = config.port,
        data_dir = %config.data_dir.display(),
        "configuration resolved"
    );

    let store = Arc::new(RiffStore::open(&config.data_dir).await?);
    let engine = SimilarityEngine::new(config.extraction_timeout());
    let state = AppState::new(store, engine);

    let app = riffbank::build_router(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    info!("Listening on http://0.0.0.0:{}", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
