//! Record endpoints
//!
//! Read and write the authoritative store: select-all (identifier
//! descending), reconcile-and-save an edited view, and explicit
//! delete-by-identifier. Deletion is never inferred from a row being
//! absent from a save payload.

use crate::models::{EditedRecord, StockRecord};
use crate::services::reconciler;
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// GET /api/records
pub async fn list_records(State(state): State<AppState>) -> ApiResult<Json<Vec<StockRecord>>> {
    let records = crate::db::records::list_all(&state.db).await?;
    Ok(Json(records))
}

/// Request payload for POST /api/records/save
#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    /// The user-edited view of the store (may be partial or filtered)
    pub records: Vec<EditedRecord>,
}

/// Response payload for POST /api/records/save
#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub success: bool,
    pub updated: usize,
    pub inserted: usize,
}

/// POST /api/records/save
///
/// Diffs the edited view against the current store contents and applies
/// the resulting update/insert operations. Last write wins.
pub async fn save_records(
    State(state): State<AppState>,
    Json(payload): Json<SaveRequest>,
) -> ApiResult<Json<SaveResponse>> {
    let original = crate::db::records::list_all(&state.db).await?;

    let ops = reconciler::diff(&payload.records, &original);
    let report = reconciler::apply(&state.db, &ops)
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok(Json(SaveResponse {
        success: true,
        updated: report.updated,
        inserted: report.inserted,
    }))
}

/// Response payload for DELETE /api/records/:id
#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub id: i64,
}

/// DELETE /api/records/:id, the explicit deletion path
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    crate::db::records::delete(&state.db, id).await?;

    tracing::info!(id, "Stock record deleted");

    Ok(Json(DeleteResponse { success: true, id }))
}

/// Build record routes
pub fn record_routes() -> Router<AppState> {
    Router::new()
        .route("/api/records", get(list_records))
        .route("/api/records/save", post(save_records))
        .route("/api/records/:id", delete(delete_record))
}
