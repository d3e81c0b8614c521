//! Search endpoint
//!
//! Orchestrates one search pass: reference snapshot → upstream query →
//! location resolution. A 200 with zero matches is an informational
//! "no results" state, not a failure.

use crate::models::MatchResult;
use crate::services::location_resolver::resolve;
use crate::services::reference_store::TableKind;
use crate::services::token_manager::TokenError;
use crate::services::SearchError;
use crate::{ApiError, ApiResult, AppState};
use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

const DEFAULT_PAGE_SIZE: u32 = 50;

/// Minimum search term length, enforced before dispatching upstream
const MIN_TERM_CHARS: usize = 2;

/// Query parameters for GET /api/search
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub term: String,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

/// Response payload for GET /api/search
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    /// Resolved matches, one per upstream item
    pub results: Vec<MatchResult>,
    /// HTTP status of the upstream search (0 for transport failures)
    pub upstream_status: u16,
    /// Raw upstream body or transport error, surfaced for diagnostics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    /// Reference tables that failed to load (matching ran degraded)
    pub missing_tables: Vec<TableKind>,
    /// Informational message (e.g. the "no results" state)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// GET /api/search?term=<t>&page=<n>&page_size=<n>
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<SearchResponse>> {
    let term = params.term.trim();
    if term.chars().count() < MIN_TERM_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Search term must have at least {} characters",
            MIN_TERM_CHARS
        )));
    }

    let snapshot = state
        .reference
        .snapshot()
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    let page_size = params.page_size.unwrap_or(DEFAULT_PAGE_SIZE);
    let page = params.page.unwrap_or(0);

    let outcome = state
        .inventory
        .search(term, page_size, page)
        .await
        .map_err(|e| match e {
            SearchError::Token(TokenError::Authentication(status, body)) => {
                ApiError::Unauthorized(format!(
                    "Upstream login rejected ({}): {}. Check the configured credentials.",
                    status, body
                ))
            }
            SearchError::Token(TokenError::Transport(msg)) => ApiError::Upstream(msg),
            SearchError::Token(TokenError::Parse(msg)) => ApiError::Upstream(msg),
        })?;

    let results = resolve(&outcome.items, &snapshot.lots, &snapshot.generics);

    let message = if outcome.status == 200 && results.is_empty() {
        Some(format!("No inventory items found for \"{}\"", term))
    } else {
        None
    };

    tracing::info!(
        term = %term,
        results = results.len(),
        upstream_status = outcome.status,
        degraded = !snapshot.missing.is_empty(),
        "Search completed"
    );

    Ok(Json(SearchResponse {
        results,
        upstream_status: outcome.status,
        diagnostic: outcome.diagnostic,
        missing_tables: snapshot.missing.clone(),
        message,
    }))
}

/// Build search routes
pub fn search_routes() -> Router<AppState> {
    Router::new().route("/api/search", get(search))
}
