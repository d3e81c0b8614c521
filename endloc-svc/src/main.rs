//! endloc-svc - Warehouse Address Locator Service
//!
//! Locates the physical storage address of inventory items by reconciling
//! two reference sheets (lot and generic-product) against queries from the
//! upstream inventory API, and lets users edit the authoritative record
//! store through a thin HTTP API.

use anyhow::Result;
use endloc_common::config::{default_config_path, load_toml_config, ServiceConfig};
use endloc_svc::services::{CsvHttpSource, InventoryClient, ReferenceStore, TokenManager};
use endloc_svc::AppState;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting endloc-svc (Warehouse Address Locator)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    // Resolve configuration: ENV overrides TOML
    let config_path = std::env::var("ENDLOC_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_config_path());
    info!("Config file: {}", config_path.display());

    let toml_config = load_toml_config(&config_path)?;
    let config = ServiceConfig::resolve(&toml_config)?;

    // Initialize authoritative-store connection pool
    info!("Database: {}", config.database_path.display());
    let db_pool = endloc_svc::db::init_database_pool(&config.database_path).await?;
    info!("Database connection established");

    // One shared HTTP client with the bounded call timeout
    let http_client = reqwest::Client::builder()
        .timeout(config.http_timeout)
        .build()?;

    let tokens = Arc::new(TokenManager::new(
        http_client.clone(),
        config.login_url.clone(),
        config.api_login.clone(),
        config.api_senha.clone(),
        config.token_ttl,
    ));

    let inventory = Arc::new(InventoryClient::new(
        http_client.clone(),
        config.search_url.clone(),
        config.headers.clone(),
        Arc::clone(&tokens),
    ));

    let reference_source = Arc::new(CsvHttpSource::new(
        http_client,
        config.lot_sheet_url.clone(),
        config.generic_sheet_url.clone(),
    ));
    let reference = Arc::new(ReferenceStore::new(reference_source, config.reference_ttl));

    // Create application state and router
    let state = AppState::new(db_pool, tokens, inventory, reference);
    let app = endloc_svc::build_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Listening on http://{}", config.bind_address);
    info!("Health check: http://{}/health", config.bind_address);

    axum::serve(listener, app).await?;

    Ok(())
}
