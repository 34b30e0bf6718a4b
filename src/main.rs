use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use bootcamp_api::config::AppConfig;
use bootcamp_api::database::{DocumentStore, MemoryStore, PgStore};
use bootcamp_api::services::geocoder::{Geocoder, MapQuestGeocoder, StaticGeocoder};
use bootcamp_api::services::mailer::{HttpMailer, LogMailer, Mailer};
use bootcamp_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")))
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!("Starting bootcamp API in {:?} mode", config.environment);

    let store: Arc<dyn DocumentStore> = match &config.database.url {
        Some(url) => {
            let store = PgStore::connect(url, &config.database).await.context("failed to connect to database")?;
            store.migrate().await.context("failed to prepare database schema")?;
            Arc::new(store)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; using in-memory store");
            Arc::new(MemoryStore::new())
        }
    };

    let geocoder: Arc<dyn Geocoder> = if config.geocoder.api_key.is_some() {
        Arc::new(MapQuestGeocoder::new(&config.geocoder)?)
    } else {
        tracing::warn!("GEOCODER_API_KEY not set; addresses will not be geocoded");
        Arc::new(StaticGeocoder::new())
    };

    let mailer: Arc<dyn Mailer> = match &config.mail.api_url {
        Some(url) => Arc::new(HttpMailer::new(url.clone(), &config.mail)?),
        None => {
            tracing::warn!("MAIL_API_URL not set; reset emails will only be logged");
            Arc::new(LogMailer)
        }
    };

    let port = config.server.port;
    let state = AppState::new(config, store, geocoder, mailer)?;
    let app = bootcamp_api::app(state);

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Bootcamp API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
