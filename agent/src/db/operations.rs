//! Database operations for the queued_operations table.

use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tether_engine::{Intent, OperationId, QueuedOperation, Timestamp};

/// A queued operation row from the database.
#[derive(Debug)]
pub struct StoredOperation {
    pub id: i64,
    pub kind: String,
    pub collection: String,
    pub payload: String,
    pub enqueued_at: i64,
    pub retry_count: i64,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for StoredOperation {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(StoredOperation {
            id: row.try_get("id")?,
            kind: row.try_get("kind")?,
            collection: row.try_get("collection")?,
            payload: row.try_get("payload")?,
            enqueued_at: row.try_get("enqueued_at")?,
            retry_count: row.try_get("retry_count")?,
        })
    }
}

impl StoredOperation {
    /// Convert database row to a tether-engine QueuedOperation.
    pub fn to_operation(&self) -> Result<QueuedOperation, tether_engine::Error> {
        let payload = serde_json::from_str(&self.payload)
            .map_err(|e| tether_engine::Error::InvalidPayload(e.to_string()))?;

        Ok(QueuedOperation {
            id: self.id,
            kind: self.kind.parse()?,
            collection: self.collection.parse()?,
            payload,
            enqueued_at: self.enqueued_at,
            retry_count: u32::try_from(self.retry_count).unwrap_or(u32::MAX),
        })
    }
}

/// Append an intent to the queue with a retry count of zero.
///
/// Returns the store-assigned operation id.
pub async fn insert_operation(
    pool: &SqlitePool,
    intent: &Intent,
    enqueued_at: Timestamp,
) -> Result<OperationId, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO queued_operations (kind, collection, payload, enqueued_at, retry_count)
        VALUES (?, ?, ?, ?, 0)
        "#,
    )
    .bind(intent.kind.as_str())
    .bind(intent.collection.as_str())
    .bind(intent.payload.to_string())
    .bind(enqueued_at)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Get every queued operation in FIFO order.
pub async fn list_operations(pool: &SqlitePool) -> Result<Vec<StoredOperation>, sqlx::Error> {
    sqlx::query_as::<_, StoredOperation>(
        r#"
        SELECT id, kind, collection, payload, enqueued_at, retry_count
        FROM queued_operations
        ORDER BY id ASC
        "#,
    )
    .fetch_all(pool)
    .await
}

/// Persist a new retry count. Returns false if the row no longer exists.
pub async fn update_retry_count(
    pool: &SqlitePool,
    id: OperationId,
    retry_count: u32,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"UPDATE queued_operations SET retry_count = ? WHERE id = ?"#)
        .bind(i64::from(retry_count))
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Remove one operation. Returns false if it was already gone.
pub async fn delete_operation(pool: &SqlitePool, id: OperationId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM queued_operations WHERE id = ?"#)
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Remove every queued operation.
pub async fn clear_operations(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM queued_operations"#)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Count queued operations.
pub async fn count_operations(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let result: (i64,) = sqlx::query_as(r#"SELECT COUNT(*) FROM queued_operations"#)
        .fetch_one(pool)
        .await?;

    Ok(result.0)
}
