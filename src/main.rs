use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use delivery_dashboard::{
    AppState, create_router,
    config::Config,
    db::{SessionProvider, delivery_store::CassandraDeliveryStore},
    services::DeliveryLoader,
    shutdown::shutdown_signal,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env().context("Invalid server configuration")?;

    // Both the session and the first load must succeed before anything is served
    let provider = Arc::new(SessionProvider::new());
    provider
        .session()
        .await
        .context("Delivery store is unreachable")?;

    let store = Arc::new(CassandraDeliveryStore::new(provider.clone()));
    let loader = Arc::new(DeliveryLoader::new(store));
    loader.load().await.context("Failed to load deliveries")?;

    let app = create_router(AppState::new(loader));
    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Dashboard listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    provider.close().await;
    Ok(())
}
