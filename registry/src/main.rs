mod config;
mod db;
mod errors;
mod memory;
mod metrics;
mod model;
mod rest;
mod service;
mod store;
mod validate;

use anyhow::Context;
use axum::{routing::get, Router};
use clap::Parser;
use config::{Config, StoreKind};
use service::GatewayService;
use std::sync::Arc;
use store::GatewayStore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Exits with a usage error when PORT is missing
    let config = Config::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting gateway registry");
    info!("HTTP server: {}", config.http_addr());
    info!("Max devices per gateway: {}", config.max_devices);

    // Initialize metrics
    metrics::init_metrics();

    let store: Arc<dyn GatewayStore> = match config.store {
        StoreKind::Postgres => {
            info!("Database: {}", config.database_host());
            let pool = db::make_pool(&config.database_url, config.max_connections)
                .await
                .context("Failed to connect to database")?;
            Arc::new(db::PgStore::new(pool))
        }
        StoreKind::Memory => {
            info!("Using in-memory store, records will not survive a restart");
            Arc::new(memory::MemoryStore::new())
        }
    };

    let service = GatewayService::new(store, config.max_devices);

    // Build HTTP app with REST API, health and metrics endpoints
    let app = Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/metrics", get(metrics_handler))
        .merge(rest::create_router(service))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(config.http_addr())
        .await
        .with_context(|| format!("Failed to bind to {}", config.http_addr()))?;

    info!("HTTP server listening on {}", config.http_addr());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received shutdown signal");
    }
}

async fn metrics_handler() -> String {
    metrics::gather_metrics()
}
