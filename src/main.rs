//! rsvp-gateway server entry point.
//!
//! Loads configuration, picks the storage backend, and serves the
//! callback API.

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use rsvp_gateway::api;
use rsvp_gateway::app_state::AppState;
use rsvp_gateway::config::{LogFormat, RsvpConfig};
use rsvp_gateway::persistence::Store;
use rsvp_gateway::persistence::memory::MemoryStore;
use rsvp_gateway::persistence::postgres::PostgresStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RsvpConfig::from_env().context("loading configuration")?;

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt().json().with_env_filter(filter).init(),
        LogFormat::Text => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
    tracing::info!(addr = %config.listen_addr, "starting rsvp-gateway");

    if config.persistence_enabled {
        let store = PostgresStore::connect(&config)
            .await
            .context("connecting to PostgreSQL")?;
        if config.run_migrations {
            store.migrate().await.context("running migrations")?;
            tracing::info!("migrations applied");
        }
        serve(&config, store).await
    } else {
        tracing::warn!("persistence disabled; state is lost on restart");
        serve(&config, MemoryStore::new()).await
    }
}

async fn serve<S: Store>(config: &RsvpConfig, store: S) -> anyhow::Result<()> {
    let app = api::build_router(AppState::new(store), config.request_timeout());

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
