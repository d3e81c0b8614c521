//! Domain models for endloc-svc
//!
//! Reference records carry pre-normalized comparison keys alongside the
//! display values; query items and match results are ephemeral, produced per
//! search request and never persisted.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A lot reference row: identifier, product description, storage address.
///
/// `lot_key` and `description_key` are the normalized comparison keys;
/// `address` keeps the display casing from the source sheet. Uniqueness of
/// the lot identifier is not guaranteed; multiple addresses may share one.
#[derive(Debug, Clone, PartialEq)]
pub struct LotRecord {
    /// Normalized lot identifier (comparison key)
    pub lot_key: String,
    /// Normalized product description (comparison key)
    pub description_key: String,
    /// Storage address (display value)
    pub address: String,
}

/// A generic-product reference row: description and storage address.
///
/// No identifier; the normalized description is the comparison key.
#[derive(Debug, Clone, PartialEq)]
pub struct GenericRecord {
    /// Normalized product description (comparison key)
    pub description_key: String,
    /// Storage address (display value)
    pub address: String,
}

/// One inventory item returned by the upstream search.
///
/// Ephemeral: produced per search request, consumed immediately by the
/// location resolver.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct QueryItem {
    pub product_name: String,
    pub lot_code: String,
    pub quantity: f64,
    pub unit: String,
    pub expiry_date: Option<NaiveDate>,
}

/// Confidence tier of a resolved match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchTier {
    /// Exact equality on the normalized lot identifier
    ExactLot,
    /// Bidirectional substring match on the normalized description
    ApproxDescription,
    /// Neither table produced a candidate
    Unresolved,
}

/// Which reference table produced the match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchSource {
    LotTable,
    GenericTable,
    None,
}

/// A query item annotated with resolved addresses and provenance.
///
/// Recomputed per query, never cached, because the underlying reference
/// tables may change between calls.
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub product_name: String,
    pub lot_code: String,
    pub quantity: f64,
    pub unit: String,
    pub expiry_date: Option<NaiveDate>,
    /// Deduplicated, insertion order from source rows
    pub resolved_addresses: Vec<String>,
    pub match_tier: MatchTier,
    pub source: MatchSource,
}

/// One row of the authoritative store, keyed by a surrogate identifier.
///
/// `origin` tags where the row came from (lot sheet vs generic sheet).
#[derive(Debug, Clone, Serialize, sqlx::FromRow, PartialEq)]
pub struct StockRecord {
    pub id: i64,
    pub lot: Option<String>,
    pub description: String,
    pub address: String,
    pub origin: String,
}

/// One row of a user-edited view of the authoritative store.
///
/// `id` is absent for rows added by the editor; blank fields arrive as
/// empty strings.
#[derive(Debug, Clone, Deserialize)]
pub struct EditedRecord {
    pub id: Option<i64>,
    #[serde(default)]
    pub lot: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub origin: String,
}

/// Origin tag for rows imported from the lot sheet
pub const ORIGIN_LOT: &str = "FRACIONAMENTO";

/// Origin tag for rows imported from the generic-product sheet
pub const ORIGIN_GENERIC: &str = "SPEX/GENERICO";
