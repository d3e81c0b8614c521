//! Reconciler
//!
//! Diffs a user-edited view of the authoritative store against its
//! last-loaded snapshot and emits the minimal set of update/insert
//! operations. Rows absent from the edited view are never deleted
//! implicitly: the view may be partial or filtered, and inferring deletes
//! from absence loses data. Deletion is a separate explicit operation.

use crate::models::{EditedRecord, StockRecord};
use endloc_common::normalize::is_blank;
use sqlx::SqlitePool;
use std::collections::HashMap;
use thiserror::Error;

/// Reconciler errors
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("Store write failed: {0}")]
    Store(#[from] endloc_common::Error),
}

/// Field changes for one update, restricted to the fields that differ.
///
/// `lot` is doubly optional: the outer `Option` marks the field as changed,
/// the inner one carries the new value (None clears the lot to NULL).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChangedFields {
    pub lot: Option<Option<String>>,
    pub description: Option<String>,
    pub address: Option<String>,
    pub origin: Option<String>,
}

impl ChangedFields {
    pub fn is_empty(&self) -> bool {
        self.lot.is_none()
            && self.description.is_none()
            && self.address.is_none()
            && self.origin.is_none()
    }
}

/// A new row for the authoritative store
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub lot: Option<String>,
    pub description: String,
    pub address: String,
    pub origin: String,
}

/// One write operation against the authoritative store
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Update the row with this identifier, touching only the changed fields
    Update { id: i64, changes: ChangedFields },
    /// Insert a new row
    Insert(NewRecord),
}

/// Counts of applied operations
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ApplyReport {
    pub updated: usize,
    pub inserted: usize,
}

/// Diff the edited view against the original snapshot.
///
/// - Rows whose identifier matches an original row emit an `Update`
///   restricted to the changed fields; identical rows emit nothing.
/// - Identifier-less rows emit an `Insert` only when the description is
///   non-blank; rows left entirely blank by the editor are dropped.
/// - Rows carrying an identifier unknown to the snapshot are skipped with a
///   warning (the view may be stale; re-creating such rows risks undoing an
///   explicit delete).
pub fn diff(edited: &[EditedRecord], original: &[StockRecord]) -> Vec<WriteOp> {
    let by_id: HashMap<i64, &StockRecord> = original.iter().map(|r| (r.id, r)).collect();

    let mut ops = Vec::new();

    for row in edited {
        match row.id {
            Some(id) => match by_id.get(&id) {
                Some(existing) => {
                    let changes = changed_fields(row, existing);
                    if !changes.is_empty() {
                        ops.push(WriteOp::Update { id, changes });
                    }
                }
                None => {
                    tracing::warn!(id, "Edited row references unknown identifier, skipping");
                }
            },
            None => {
                // New entry: mandatory field is the description
                if is_blank(&row.description) {
                    continue;
                }
                ops.push(WriteOp::Insert(NewRecord {
                    lot: field_to_option(&row.lot),
                    description: row.description.trim().to_string(),
                    address: row.address.trim().to_string(),
                    origin: row.origin.trim().to_string(),
                }));
            }
        }
    }

    tracing::debug!(
        edited = edited.len(),
        ops = ops.len(),
        "Reconciliation diff computed"
    );

    ops
}

/// Apply a list of write operations to the authoritative store.
pub async fn apply(db: &SqlitePool, ops: &[WriteOp]) -> Result<ApplyReport, ReconcileError> {
    let mut report = ApplyReport::default();

    for op in ops {
        match op {
            WriteOp::Update { id, changes } => {
                crate::db::records::update_fields(db, *id, changes).await?;
                report.updated += 1;
            }
            WriteOp::Insert(record) => {
                crate::db::records::insert(db, record).await?;
                report.inserted += 1;
            }
        }
    }

    tracing::info!(
        updated = report.updated,
        inserted = report.inserted,
        "Reconciliation applied"
    );

    Ok(report)
}

/// Compare every comparison field of an edited row against the stored row.
fn changed_fields(edited: &EditedRecord, existing: &StockRecord) -> ChangedFields {
    let mut changes = ChangedFields::default();

    let edited_lot = field_to_option(&edited.lot);
    if edited_lot != existing.lot {
        changes.lot = Some(edited_lot);
    }

    let edited_description = edited.description.trim();
    if edited_description != existing.description {
        changes.description = Some(edited_description.to_string());
    }

    let edited_address = edited.address.trim();
    if edited_address != existing.address {
        changes.address = Some(edited_address.to_string());
    }

    let edited_origin = edited.origin.trim();
    if edited_origin != existing.origin {
        changes.origin = Some(edited_origin.to_string());
    }

    changes
}

/// Blank editor fields become NULL lots
fn field_to_option(field: &str) -> Option<String> {
    let trimmed = field.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
