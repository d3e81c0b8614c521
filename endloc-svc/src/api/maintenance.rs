//! Cache maintenance and one-shot import endpoints

use crate::services::reference_store::stock_imports;
use crate::{ApiError, ApiResult, AppState};
use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;

/// Response payload for POST /api/refresh
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub success: bool,
}

/// POST /api/refresh
///
/// Clears the reference-table and credential caches; the next search
/// re-fetches both.
pub async fn refresh(State(state): State<AppState>) -> ApiResult<Json<RefreshResponse>> {
    state.reference.invalidate().await;
    state.tokens.invalidate().await;

    tracing::info!("Caches cleared on user request");

    Ok(Json(RefreshResponse { success: true }))
}

/// Response payload for POST /api/import
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub success: bool,
    pub imported: usize,
    /// Tables that failed to load (import ran degraded)
    pub missing_tables: Vec<crate::services::TableKind>,
}

/// POST /api/import
///
/// One-shot import: maps both reference sheets into stock records (lot
/// sheet → FRACIONAMENTO, generic sheet → SPEX/GENERICO) and batch-inserts
/// them into the authoritative store.
pub async fn import(State(state): State<AppState>) -> ApiResult<Json<ImportResponse>> {
    // Import wants fresh data, not a cached snapshot
    state.reference.invalidate().await;

    let snapshot = state
        .reference
        .snapshot()
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    let records = stock_imports(&snapshot);
    let imported = crate::db::records::insert_batch(&state.db, &records).await?;

    tracing::info!(imported, "One-shot import completed");

    Ok(Json(ImportResponse {
        success: true,
        imported,
        missing_tables: snapshot.missing.clone(),
    }))
}

/// Build maintenance routes
pub fn maintenance_routes() -> Router<AppState> {
    Router::new()
        .route("/api/refresh", post(refresh))
        .route("/api/import", post(import))
}
