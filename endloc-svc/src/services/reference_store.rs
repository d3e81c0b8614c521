//! Reference table store
//!
//! Loads the two reference tables (lot sheet and generic-product sheet)
//! through a `ReferenceSource` seam, maps the untrusted row shape into typed
//! records by column position, and serves a process-wide cached snapshot
//! with TTL + explicit invalidation. If one table fails to load while the
//! other succeeds, the snapshot is served in degraded mode with the missing
//! table flagged.

use crate::models::{GenericRecord, LotRecord};
use endloc_common::normalize;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::RwLock;

/// Reference store errors
#[derive(Debug, Error)]
pub enum ReferenceError {
    /// Both reference tables failed to load; nothing to match against
    #[error("Reference tables unavailable: lot: {lot}; generic: {generic}")]
    Unavailable { lot: String, generic: String },
}

/// Source-fetch errors, reported per table
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Source returned status {0}")]
    Status(u16),

    #[error("Malformed table data: {0}")]
    Malformed(String),
}

/// Which reference table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableKind {
    Lot,
    Generic,
}

/// Transport seam for the reference sheets.
///
/// Returns raw rows (header excluded); column names are not trusted, only
/// column position is significant.
#[async_trait::async_trait]
pub trait ReferenceSource: Send + Sync {
    async fn fetch_rows(&self, table: TableKind) -> Result<Vec<Vec<String>>, SourceError>;
}

/// One loaded snapshot of both reference tables
#[derive(Debug, Clone, Default)]
pub struct ReferenceSnapshot {
    pub lots: Vec<LotRecord>,
    pub generics: Vec<GenericRecord>,
    /// Tables that failed to load (degraded mode when non-empty)
    pub missing: Vec<TableKind>,
}

/// Cached snapshot with its load instant
struct CachedSnapshot {
    snapshot: Arc<ReferenceSnapshot>,
    loaded_at: Instant,
}

/// Process-wide TTL-cached reference tables
pub struct ReferenceStore {
    source: Arc<dyn ReferenceSource>,
    ttl: Duration,
    cached: RwLock<Option<CachedSnapshot>>,
}

impl ReferenceStore {
    pub fn new(source: Arc<dyn ReferenceSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cached: RwLock::new(None),
        }
    }

    /// Return the current snapshot, reloading from the source when the cache
    /// is empty, invalidated, or older than the TTL.
    ///
    /// Requests within the TTL window share the cached snapshot rather than
    /// re-fetching, trading strict freshness for reduced upstream load.
    pub async fn snapshot(&self) -> Result<Arc<ReferenceSnapshot>, ReferenceError> {
        {
            let cached = self.cached.read().await;
            if let Some(entry) = cached.as_ref() {
                if entry.loaded_at.elapsed() < self.ttl {
                    return Ok(Arc::clone(&entry.snapshot));
                }
            }
        }

        let snapshot = Arc::new(self.load().await?);

        let mut cached = self.cached.write().await;
        *cached = Some(CachedSnapshot {
            snapshot: Arc::clone(&snapshot),
            loaded_at: Instant::now(),
        });

        Ok(snapshot)
    }

    /// Drop the cached snapshot; the next `snapshot()` reloads.
    pub async fn invalidate(&self) {
        let mut cached = self.cached.write().await;
        if cached.take().is_some() {
            tracing::info!("Reference table cache invalidated");
        }
    }

    /// Load both tables, tolerating a single-table failure (degraded mode).
    async fn load(&self) -> Result<ReferenceSnapshot, ReferenceError> {
        let (lots, lot_error) = match self.source.fetch_rows(TableKind::Lot).await {
            Ok(rows) => (map_lot_rows(rows), None),
            Err(e) => {
                tracing::warn!(error = %e, "Lot reference table failed to load");
                (Vec::new(), Some(e))
            }
        };

        let (generics, generic_error) = match self.source.fetch_rows(TableKind::Generic).await {
            Ok(rows) => (map_generic_rows(rows), None),
            Err(e) => {
                tracing::warn!(error = %e, "Generic reference table failed to load");
                (Vec::new(), Some(e))
            }
        };

        if let (Some(lot_error), Some(generic_error)) = (&lot_error, &generic_error) {
            return Err(ReferenceError::Unavailable {
                lot: lot_error.to_string(),
                generic: generic_error.to_string(),
            });
        }

        let mut missing = Vec::new();
        if lot_error.is_some() {
            missing.push(TableKind::Lot);
        }
        if generic_error.is_some() {
            missing.push(TableKind::Generic);
        }

        tracing::info!(
            lots = lots.len(),
            generics = generics.len(),
            degraded = !missing.is_empty(),
            "Reference tables loaded"
        );

        Ok(ReferenceSnapshot {
            lots,
            generics,
            missing,
        })
    }
}

/// Map raw lot rows by position: 0 = lot identifier, 1 = description,
/// 2 = address. Rows without the three positional columns, or whose lot
/// and description both normalize to nothing, are skipped.
fn map_lot_rows(rows: Vec<Vec<String>>) -> Vec<LotRecord> {
    rows.into_iter()
        .filter_map(|row| {
            if row.len() < 3 {
                return None;
            }
            let lot_key = normalize(&row[0]);
            let description_key = normalize(&row[1]);
            if lot_key.is_empty() && description_key.is_empty() {
                return None;
            }
            Some(LotRecord {
                lot_key,
                description_key,
                address: row[2].trim().to_string(),
            })
        })
        .collect()
}

/// Map raw generic rows by position: 0 = description, 1 = address.
fn map_generic_rows(rows: Vec<Vec<String>>) -> Vec<GenericRecord> {
    rows.into_iter()
        .filter_map(|row| {
            if row.len() < 2 {
                return None;
            }
            let description_key = normalize(&row[0]);
            if description_key.is_empty() {
                return None;
            }
            Some(GenericRecord {
                description_key,
                address: row[1].trim().to_string(),
            })
        })
        .collect()
}

/// Map a reference snapshot into stock records for the one-shot import.
///
/// Lot rows are tagged FRACIONAMENTO, generic rows SPEX/GENERICO, matching
/// the authoritative store's origin vocabulary. Empty lot keys become NULL
/// lots.
pub fn stock_imports(snapshot: &ReferenceSnapshot) -> Vec<crate::services::reconciler::NewRecord> {
    use crate::models::{ORIGIN_GENERIC, ORIGIN_LOT};
    use crate::services::reconciler::NewRecord;

    let mut records = Vec::with_capacity(snapshot.lots.len() + snapshot.generics.len());

    for lot in &snapshot.lots {
        records.push(NewRecord {
            lot: (!lot.lot_key.is_empty()).then(|| lot.lot_key.clone()),
            description: lot.description_key.clone(),
            address: lot.address.clone(),
            origin: ORIGIN_LOT.to_string(),
        });
    }

    for generic in &snapshot.generics {
        records.push(NewRecord {
            lot: None,
            description: generic.description_key.clone(),
            address: generic.address.clone(),
            origin: ORIGIN_GENERIC.to_string(),
        });
    }

    records
}

/// HTTP CSV implementation of [`ReferenceSource`].
///
/// Thin ingestion transport: fetches the published CSV export of each sheet
/// and returns its data rows (header row dropped).
pub struct CsvHttpSource {
    http_client: reqwest::Client,
    lot_url: String,
    generic_url: String,
}

impl CsvHttpSource {
    pub fn new(http_client: reqwest::Client, lot_url: String, generic_url: String) -> Self {
        Self {
            http_client,
            lot_url,
            generic_url,
        }
    }

    fn url_for(&self, table: TableKind) -> &str {
        match table {
            TableKind::Lot => &self.lot_url,
            TableKind::Generic => &self.generic_url,
        }
    }
}

#[async_trait::async_trait]
impl ReferenceSource for CsvHttpSource {
    async fn fetch_rows(&self, table: TableKind) -> Result<Vec<Vec<String>>, SourceError> {
        let url = self.url_for(table);
        tracing::debug!(?table, url = %url, "Fetching reference sheet");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Status(status.as_u16()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Transport(e.to_string()))?;

        parse_csv_rows(&body)
    }
}

/// Parse CSV text into data rows (header dropped, ragged rows tolerated)
fn parse_csv_rows(body: &str) -> Result<Vec<Vec<String>>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| SourceError::Malformed(e.to_string()))?;
        rows.push(record.iter().map(|field| field.to_string()).collect());
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubSource {
        lot: Result<Vec<Vec<String>>, String>,
        generic: Result<Vec<Vec<String>>, String>,
    }

    #[async_trait::async_trait]
    impl ReferenceSource for StubSource {
        async fn fetch_rows(&self, table: TableKind) -> Result<Vec<Vec<String>>, SourceError> {
            let result = match table {
                TableKind::Lot => &self.lot,
                TableKind::Generic => &self.generic,
            };
            result
                .clone()
                .map_err(|e| SourceError::Transport(e))
        }
    }

    fn row(fields: &[&str]) -> Vec<String> {
        fields.iter().map(|f| f.to_string()).collect()
    }

    #[test]
    fn test_map_lot_rows_positional() {
        let lots = map_lot_rows(vec![
            row(&[" ab12 ", " Dipirona 500mg ", " A-10 "]),
            row(&["", "", ""]),
            row(&["short"]),
        ]);

        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].lot_key, "AB12");
        assert_eq!(lots[0].description_key, "DIPIRONA 500MG");
        assert_eq!(lots[0].address, "A-10");
    }

    #[test]
    fn test_map_lot_rows_nan_lot_kept_by_description() {
        // A "NaN" lot cell normalizes away but the row still matters for
        // description context
        let lots = map_lot_rows(vec![row(&["NaN", "AMOXICILINA", "B-02"])]);
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].lot_key, "");
    }

    #[test]
    fn test_map_generic_rows_positional() {
        let generics = map_generic_rows(vec![
            row(&["Dipirona", "B-05"]),
            row(&["   ", "C-01"]),
            row(&["NaN", "C-02"]),
        ]);

        assert_eq!(generics.len(), 1);
        assert_eq!(generics[0].description_key, "DIPIRONA");
        assert_eq!(generics[0].address, "B-05");
    }

    #[test]
    fn test_parse_csv_drops_header() {
        let rows = parse_csv_rows("lote,produto,endereco\nAB12,DIPIRONA,A-10\n").unwrap();
        assert_eq!(rows, vec![row(&["AB12", "DIPIRONA", "A-10"])]);
    }

    #[test]
    fn test_parse_csv_tolerates_ragged_rows() {
        let rows = parse_csv_rows("a,b,c\n1,2,3\n4,5\n").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1], row(&["4", "5"]));
    }

    #[test]
    fn test_stock_imports_tags_origins() {
        let snapshot = ReferenceSnapshot {
            lots: map_lot_rows(vec![
                row(&["AB12", "DIPIRONA", "A-10"]),
                row(&["NaN", "AMOXICILINA", "B-02"]),
            ]),
            generics: map_generic_rows(vec![row(&["IBUPROFENO", "C-01"])]),
            missing: Vec::new(),
        };

        let records = stock_imports(&snapshot);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].lot.as_deref(), Some("AB12"));
        assert_eq!(records[0].origin, "FRACIONAMENTO");
        // The "NaN" lot cell imports as NULL
        assert_eq!(records[1].lot, None);
        assert_eq!(records[2].origin, "SPEX/GENERICO");
        assert_eq!(records[2].description, "IBUPROFENO");
    }

    #[tokio::test]
    async fn test_snapshot_cached_within_ttl() {
        use std::sync::atomic::{AtomicU32, Ordering};

        struct CountingSource(AtomicU32);

        #[async_trait::async_trait]
        impl ReferenceSource for CountingSource {
            async fn fetch_rows(&self, _table: TableKind) -> Result<Vec<Vec<String>>, SourceError> {
                self.0.fetch_add(1, Ordering::SeqCst);
                Ok(vec![vec![
                    "AB12".to_string(),
                    "DIPIRONA".to_string(),
                    "A-10".to_string(),
                ]])
            }
        }

        let source = Arc::new(CountingSource(AtomicU32::new(0)));
        let store = ReferenceStore::new(source.clone(), Duration::from_secs(300));

        store.snapshot().await.unwrap();
        store.snapshot().await.unwrap();

        // Two tables fetched once each, second snapshot() served from cache
        assert_eq!(source.0.load(Ordering::SeqCst), 2);

        store.invalidate().await;
        store.snapshot().await.unwrap();
        assert_eq!(source.0.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_degraded_mode_flags_missing_table() {
        let source = Arc::new(StubSource {
            lot: Err("boom".to_string()),
            generic: Ok(vec![row(&["DIPIRONA", "B-05"])]),
        });
        let store = ReferenceStore::new(source, Duration::from_secs(300));

        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(snapshot.missing, vec![TableKind::Lot]);
        assert!(snapshot.lots.is_empty());
        assert_eq!(snapshot.generics.len(), 1);
    }

    #[tokio::test]
    async fn test_both_tables_failing_is_error() {
        let source = Arc::new(StubSource {
            lot: Err("boom".to_string()),
            generic: Err("boom".to_string()),
        });
        let store = ReferenceStore::new(source, Duration::from_secs(300));

        assert!(matches!(
            store.snapshot().await,
            Err(ReferenceError::Unavailable { .. })
        ));
    }
}
