use anyhow::Context;
use finance_edge::cache::CacheStore;
use finance_edge::config::Config;
use finance_edge::handler::RequestHandler;
use finance_edge::inference::InferenceGateway;
use finance_edge::model::HistoryWindow;
use finance_edge::routes::{app, AppState};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real env vars take precedence either way.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    if config.upstream.is_none() {
        warn!("HF_API_KEY not set, serving fallback answers");
    }

    let cache = Arc::new(CacheStore::new(config.cache_capacity));
    let gateway = Arc::new(InferenceGateway::new(config.upstream.clone()).context("building upstream client")?);
    let handler = RequestHandler::new(cache, gateway, HistoryWindow::new(config.history_window));

    let app_state = Arc::new(AppState {
        handler: Arc::new(handler),
    });

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!(
        "Finance gateway listening on {} (cache capacity {}, history window {})",
        config.bind_addr, config.cache_capacity, config.history_window
    );

    axum::serve(listener, app(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutting down");
    }
}
