//! Stock record operations against the authoritative store
//!
//! Supports select-all (identifier descending), insert-one, update-by-key
//! restricted to changed fields, delete-by-key, and batch insert for the
//! one-shot import.

use crate::models::StockRecord;
use crate::services::reconciler::{ChangedFields, NewRecord};
use endloc_common::{Error, Result};
use sqlx::{QueryBuilder, Sqlite, SqlitePool};

/// Select all records, ordered by identifier descending
pub async fn list_all(db: &SqlitePool) -> Result<Vec<StockRecord>> {
    let records = sqlx::query_as::<_, StockRecord>(
        "SELECT id, lot, description, address, origin FROM stock_records ORDER BY id DESC",
    )
    .fetch_all(db)
    .await?;

    Ok(records)
}

/// Insert one record, returning its new identifier
pub async fn insert(db: &SqlitePool, record: &NewRecord) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO stock_records (lot, description, address, origin) VALUES (?, ?, ?, ?)",
    )
    .bind(&record.lot)
    .bind(&record.description)
    .bind(&record.address)
    .bind(&record.origin)
    .execute(db)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Batch insert (one-shot import path)
pub async fn insert_batch(db: &SqlitePool, records: &[NewRecord]) -> Result<usize> {
    if records.is_empty() {
        return Ok(0);
    }

    let mut transaction = db.begin().await?;

    for record in records {
        sqlx::query(
            "INSERT INTO stock_records (lot, description, address, origin) VALUES (?, ?, ?, ?)",
        )
        .bind(&record.lot)
        .bind(&record.description)
        .bind(&record.address)
        .bind(&record.origin)
        .execute(&mut *transaction)
        .await?;
    }

    transaction.commit().await?;

    tracing::info!(count = records.len(), "Batch insert committed");

    Ok(records.len())
}

/// Update one record by identifier, touching only the changed fields
pub async fn update_fields(db: &SqlitePool, id: i64, changes: &ChangedFields) -> Result<()> {
    if changes.is_empty() {
        return Ok(());
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new("UPDATE stock_records SET ");
    {
        let mut fields = builder.separated(", ");
        if let Some(lot) = &changes.lot {
            fields.push("lot = ");
            fields.push_bind_unseparated(lot.clone());
        }
        if let Some(description) = &changes.description {
            fields.push("description = ");
            fields.push_bind_unseparated(description.clone());
        }
        if let Some(address) = &changes.address {
            fields.push("address = ");
            fields.push_bind_unseparated(address.clone());
        }
        if let Some(origin) = &changes.origin {
            fields.push("origin = ");
            fields.push_bind_unseparated(origin.clone());
        }
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id);

    let result = builder.build().execute(db).await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("stock record {}", id)));
    }

    Ok(())
}

/// Delete one record by identifier (the only deletion path, never inferred)
pub async fn delete(db: &SqlitePool, id: i64) -> Result<()> {
    let result = sqlx::query("DELETE FROM stock_records WHERE id = ?")
        .bind(id)
        .execute(db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(Error::NotFound(format!("stock record {}", id)));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    fn record(lot: Option<&str>, description: &str, address: &str, origin: &str) -> NewRecord {
        NewRecord {
            lot: lot.map(|l| l.to_string()),
            description: description.to_string(),
            address: address.to_string(),
            origin: origin.to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_list_descending() {
        let pool = test_pool().await;

        insert(&pool, &record(Some("AB12"), "DIPIRONA", "A-10", "FRACIONAMENTO"))
            .await
            .unwrap();
        insert(&pool, &record(None, "IBUPROFENO", "B-01", "SPEX/GENERICO"))
            .await
            .unwrap();

        let all = list_all(&pool).await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all[0].id > all[1].id);
        assert_eq!(all[0].description, "IBUPROFENO");
        assert_eq!(all[1].lot.as_deref(), Some("AB12"));
    }

    #[tokio::test]
    async fn test_update_partial_fields() {
        let pool = test_pool().await;
        let id = insert(&pool, &record(Some("AB12"), "DIPIRONA", "A-10", "FRACIONAMENTO"))
            .await
            .unwrap();

        update_fields(
            &pool,
            id,
            &ChangedFields {
                address: Some("C-07".to_string()),
                lot: Some(None),
                ..ChangedFields::default()
            },
        )
        .await
        .unwrap();

        let all = list_all(&pool).await.unwrap();
        assert_eq!(all[0].address, "C-07");
        assert_eq!(all[0].lot, None);
        // Untouched fields preserved
        assert_eq!(all[0].description, "DIPIRONA");
        assert_eq!(all[0].origin, "FRACIONAMENTO");
    }

    #[tokio::test]
    async fn test_update_empty_changes_is_noop() {
        let pool = test_pool().await;
        let id = insert(&pool, &record(None, "DIPIRONA", "A-10", ""))
            .await
            .unwrap();

        update_fields(&pool, id, &ChangedFields::default()).await.unwrap();

        let all = list_all(&pool).await.unwrap();
        assert_eq!(all[0].address, "A-10");
    }

    #[tokio::test]
    async fn test_update_unknown_id_is_not_found() {
        let pool = test_pool().await;

        let result = update_fields(
            &pool,
            42,
            &ChangedFields {
                address: Some("X".to_string()),
                ..ChangedFields::default()
            },
        )
        .await;

        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_by_id() {
        let pool = test_pool().await;
        let id = insert(&pool, &record(None, "DIPIRONA", "A-10", ""))
            .await
            .unwrap();

        delete(&pool, id).await.unwrap();
        assert!(list_all(&pool).await.unwrap().is_empty());

        assert!(matches!(delete(&pool, id).await, Err(Error::NotFound(_))));
    }

    #[tokio::test]
    async fn test_insert_batch() {
        let pool = test_pool().await;

        let count = insert_batch(
            &pool,
            &[
                record(Some("AB12"), "DIPIRONA", "A-10", "FRACIONAMENTO"),
                record(None, "IBUPROFENO", "B-01", "SPEX/GENERICO"),
            ],
        )
        .await
        .unwrap();

        assert_eq!(count, 2);
        assert_eq!(list_all(&pool).await.unwrap().len(), 2);
    }
}
