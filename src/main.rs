use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use authbroker::providers::HttpGrantClient;
use authbroker::store::{self, PgStore};
use authbroker::{api, AppState, Config, SharedState};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "authbroker=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    info!("authbroker v{}", env!("CARGO_PKG_VERSION"));
    info!("Listening on {}:{}", config.host, config.port);

    let store = PgStore::new(&config.database_url, config.database_max_connections).await?;
    store.migrate().await?;
    info!("Database connected and migrated");

    let grants = HttpGrantClient::new(config.provider_timeout)?;

    let state: SharedState = Arc::new(AppState::new(
        &config,
        Arc::new(store),
        Arc::new(grants),
    ));
    let providers = state.delegation.apps().registry().list();
    info!("Registered {} OAuth providers: {:?}", providers.len(), providers);

    tokio::spawn(store::exchange_sweeper(
        state.delegation.ledger().clone(),
        config.exchange_sweep_interval,
    ));

    let app = api::router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server ready");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
