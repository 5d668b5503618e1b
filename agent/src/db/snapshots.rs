//! Database operations for the snapshot_entities table.

use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use tether_engine::{Collection, SnapshotEntity};

/// A cached entity row from the database.
#[derive(Debug)]
pub struct StoredEntity {
    pub entity_id: String,
    pub body: String,
}

impl<'r> sqlx::FromRow<'r, SqliteRow> for StoredEntity {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(StoredEntity {
            entity_id: row.try_get("entity_id")?,
            body: row.try_get("body")?,
        })
    }
}

impl StoredEntity {
    /// Parse the cached JSON body.
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Replace the full contents of one collection.
///
/// The delete and the inserts commit together, so a crash mid-swap leaves the
/// previous snapshot in place rather than an empty collection.
pub async fn replace_collection(
    pool: &SqlitePool,
    collection: Collection,
    entities: &[SnapshotEntity],
) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    sqlx::query(r#"DELETE FROM snapshot_entities WHERE collection = ?"#)
        .bind(collection.as_str())
        .execute(&mut *tx)
        .await?;

    for (position, entity) in entities.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO snapshot_entities (collection, entity_id, position, body)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(collection.as_str())
        .bind(entity.id.as_str())
        .bind(position as i64)
        .bind(entity.body.to_string())
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}

/// Get all cached entities of a collection in snapshot order.
pub async fn get_collection(
    pool: &SqlitePool,
    collection: Collection,
) -> Result<Vec<StoredEntity>, sqlx::Error> {
    sqlx::query_as::<_, StoredEntity>(
        r#"
        SELECT entity_id, body
        FROM snapshot_entities
        WHERE collection = ?
        ORDER BY position ASC
        "#,
    )
    .bind(collection.as_str())
    .fetch_all(pool)
    .await
}

/// Count cached entities of a collection.
pub async fn count_collection(pool: &SqlitePool, collection: Collection) -> Result<i64, sqlx::Error> {
    let result: (i64,) =
        sqlx::query_as(r#"SELECT COUNT(*) FROM snapshot_entities WHERE collection = ?"#)
            .bind(collection.as_str())
            .fetch_one(pool)
            .await?;

    Ok(result.0)
}

/// Empty every snapshot collection.
pub async fn clear_snapshots(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(r#"DELETE FROM snapshot_entities"#)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}
