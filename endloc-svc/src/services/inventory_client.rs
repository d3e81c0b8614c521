//! Upstream inventory API client
//!
//! Issues paginated search requests against the upstream inventory API,
//! authorized by the token manager. Ordinary non-200 responses and
//! undecodable payloads are not errors: they come back as an empty item
//! list plus the status code and raw body for diagnostic surfacing.
//! Transport-level failures are reported with status 0. A 401 invalidates
//! the credential and triggers exactly one retry with a fresh token.

use crate::models::QueryItem;
use crate::services::token_manager::{TokenError, TokenManager};
use chrono::NaiveDate;
use endloc_common::config::UpstreamHeaders;
use reqwest::header;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

/// Status code used for transport-level failures (timeout, DNS, refused)
pub const STATUS_TRANSPORT_FAILURE: u16 = 0;

/// Inventory client errors.
///
/// Only credential acquisition failures surface as errors; response-level
/// problems are carried in [`SearchOutcome`].
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Credential acquisition failed: {0}")]
    Token(#[from] TokenError),
}

/// Result of one upstream search call
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Decoded items (empty on any non-200 or undecodable payload)
    pub items: Vec<QueryItem>,
    /// HTTP status of the final attempt (0 for transport failures)
    pub status: u16,
    /// Raw response body or transport error text, for diagnostic surfacing
    pub diagnostic: Option<String>,
}

/// Raw upstream search payload: `{"list": [...], ...}`
#[derive(Debug, Deserialize)]
struct SearchPayload {
    #[serde(default)]
    list: Vec<UpstreamItem>,
}

/// One raw upstream item record
#[derive(Debug, Deserialize)]
struct UpstreamItem {
    /// Lot code
    #[serde(default)]
    descricao: Option<String>,
    /// Product name
    #[serde(rename = "produtoDescricao", default)]
    produto_descricao: Option<String>,
    #[serde(rename = "quantidadeAtual", default)]
    quantidade_atual: Option<f64>,
    #[serde(rename = "unidadeMedidaSigla", default)]
    unidade_medida_sigla: Option<String>,
    /// Expiry date, ISO date or datetime
    #[serde(rename = "dataValidade", default)]
    data_validade: Option<String>,
}

impl From<UpstreamItem> for QueryItem {
    fn from(raw: UpstreamItem) -> Self {
        QueryItem {
            product_name: raw.produto_descricao.unwrap_or_default().trim().to_string(),
            lot_code: raw.descricao.unwrap_or_default().trim().to_string(),
            quantity: raw.quantidade_atual.unwrap_or(0.0),
            unit: raw.unidade_medida_sigla.unwrap_or_default().trim().to_string(),
            expiry_date: raw.data_validade.as_deref().and_then(parse_expiry_date),
        }
    }
}

/// Parse an upstream expiry date, tolerating a trailing time component
fn parse_expiry_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.trim().get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

/// Upstream inventory API client
pub struct InventoryClient {
    http_client: reqwest::Client,
    search_url: String,
    headers: UpstreamHeaders,
    tokens: Arc<TokenManager>,
}

impl InventoryClient {
    pub fn new(
        http_client: reqwest::Client,
        search_url: String,
        headers: UpstreamHeaders,
        tokens: Arc<TokenManager>,
    ) -> Self {
        Self {
            http_client,
            search_url,
            headers,
            tokens,
        }
    }

    /// Search the upstream inventory for `term`.
    ///
    /// The caller must reject empty or whitespace-only terms before calling;
    /// this component does not enforce a minimum length.
    pub async fn search(
        &self,
        term: &str,
        page_size: u32,
        page_index: u32,
    ) -> Result<SearchOutcome, SearchError> {
        let token = self.tokens.acquire().await?;
        let outcome = self.execute(term, page_size, page_index, &token).await;

        // One retry with a fresh credential on authorization failure.
        // At most one, to avoid retry loops on persistent credential failure.
        if outcome.status == 401 {
            tracing::warn!("Upstream returned 401, re-authenticating and retrying once");
            self.tokens.invalidate().await;
            let token = self.tokens.acquire().await?;
            return Ok(self.execute(term, page_size, page_index, &token).await);
        }

        Ok(outcome)
    }

    /// Execute one search attempt with the given token
    async fn execute(&self, term: &str, page_size: u32, page_index: u32, token: &str) -> SearchOutcome {
        let mut request = self
            .http_client
            .get(&self.search_url)
            .query(&[
                ("filterKey", term.to_string()),
                ("sortKey", "descricao".to_string()),
                ("sortOrder", "asc".to_string()),
                ("pageIndex", page_index.to_string()),
                ("pageSize", page_size.to_string()),
            ])
            .bearer_auth(token);

        if let Some(user_agent) = &self.headers.user_agent {
            request = request.header(header::USER_AGENT, user_agent);
        }
        if let Some(origin) = &self.headers.origin {
            request = request.header(header::ORIGIN, origin);
        }
        if let Some(referer) = &self.headers.referer {
            request = request.header(header::REFERER, referer);
        }
        if let Some(host) = &self.headers.host {
            request = request.header(header::HOST, host);
        }

        tracing::debug!(term = %term, page_index, page_size, "Querying upstream inventory API");

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, "Upstream search transport failure");
                return SearchOutcome {
                    items: Vec::new(),
                    status: STATUS_TRANSPORT_FAILURE,
                    diagnostic: Some(e.to_string()),
                };
            }
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return SearchOutcome {
                    items: Vec::new(),
                    status: STATUS_TRANSPORT_FAILURE,
                    diagnostic: Some(e.to_string()),
                };
            }
        };

        if status != 200 {
            tracing::warn!(status, "Upstream search returned non-200");
            return SearchOutcome {
                items: Vec::new(),
                status,
                diagnostic: Some(body),
            };
        }

        match serde_json::from_str::<SearchPayload>(&body) {
            Ok(payload) => {
                let items: Vec<QueryItem> = payload.list.into_iter().map(QueryItem::from).collect();
                tracing::info!(term = %term, items = items.len(), "Upstream search successful");
                SearchOutcome {
                    items,
                    status,
                    diagnostic: None,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Upstream search payload undecodable");
                SearchOutcome {
                    items: Vec::new(),
                    status,
                    diagnostic: Some(body),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_expiry_date_iso_date() {
        assert_eq!(
            parse_expiry_date("2026-01-31"),
            Some(NaiveDate::from_ymd_opt(2026, 1, 31).unwrap())
        );
    }

    #[test]
    fn test_parse_expiry_date_datetime() {
        assert_eq!(
            parse_expiry_date("2026-01-31T00:00:00"),
            Some(NaiveDate::from_ymd_opt(2026, 1, 31).unwrap())
        );
    }

    #[test]
    fn test_parse_expiry_date_garbage_is_none() {
        assert_eq!(parse_expiry_date(""), None);
        assert_eq!(parse_expiry_date("31/01/2026"), None);
    }

    #[test]
    fn test_upstream_item_mapping() {
        let raw: UpstreamItem = serde_json::from_str(
            r#"{
                "descricao": " AB12 ",
                "produtoDescricao": "DIPIRONA 500MG",
                "quantidadeAtual": 12.5,
                "unidadeMedidaSigla": "CX",
                "dataValidade": "2027-03-01T00:00:00"
            }"#,
        )
        .unwrap();

        let item = QueryItem::from(raw);
        assert_eq!(item.lot_code, "AB12");
        assert_eq!(item.product_name, "DIPIRONA 500MG");
        assert_eq!(item.quantity, 12.5);
        assert_eq!(item.unit, "CX");
        assert_eq!(item.expiry_date, NaiveDate::from_ymd_opt(2027, 3, 1));
    }

    #[test]
    fn test_upstream_item_missing_fields_default() {
        let raw: UpstreamItem = serde_json::from_str("{}").unwrap();
        let item = QueryItem::from(raw);

        assert_eq!(item.product_name, "");
        assert_eq!(item.lot_code, "");
        assert_eq!(item.quantity, 0.0);
        assert_eq!(item.expiry_date, None);
    }
}
