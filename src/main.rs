//! Storefront Checkout - checkout API for a self-hosted storefront

use std::sync::Arc;

use anyhow::Result;
use storefront_checkout::http::{router, AppState};
use storefront_checkout::services::{CheckoutService, EventBus, OrderService};
use storefront_checkout::{CheckoutStore, Config, PgStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into())).with(tracing_subscriber::fmt::layer()).init();

    let pg = PgStore::connect(&config.database_url, config.max_connections).await?;
    pg.migrate().await?;
    let store: Arc<dyn CheckoutStore> = Arc::new(pg);

    let nats = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable; order events will only be logged");
                None
            }
        },
        None => None,
    };
    let events = EventBus::new(nats);

    let state = AppState {
        checkout: Arc::new(CheckoutService::new(store.clone(), config.pricing.clone(), events.clone())),
        orders: Arc::new(OrderService::new(store, events)),
    };

    let addr = config.socket_addr();
    tracing::info!(%addr, currency = %config.pricing.currency, "Storefront checkout listening");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, router(state)).await?;
    Ok(())
}
