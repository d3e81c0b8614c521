//! endloc-svc library interface
//!
//! Exposes public APIs for integration testing

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{ApiError, ApiResult};

use axum::Router;
use chrono::{DateTime, Utc};
use services::{InventoryClient, ReferenceStore, TokenManager};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application state shared across handlers.
///
/// The token manager and reference store own the process-wide cached state
/// (credential and reference tables) with TTL + explicit invalidation;
/// requests within the TTL window share the cached snapshot.
#[derive(Clone)]
pub struct AppState {
    /// Authoritative-store connection pool
    pub db: SqlitePool,
    /// Upstream credential lifecycle
    pub tokens: Arc<TokenManager>,
    /// Upstream inventory API client
    pub inventory: Arc<InventoryClient>,
    /// TTL-cached reference tables
    pub reference: Arc<ReferenceStore>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        tokens: Arc<TokenManager>,
        inventory: Arc<InventoryClient>,
        reference: Arc<ReferenceStore>,
    ) -> Self {
        Self {
            db,
            tokens,
            inventory,
            reference,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::search_routes())
        .merge(api::record_routes())
        .merge(api::maintenance_routes())
        .merge(api::health_routes())
        .with_state(state)
}
