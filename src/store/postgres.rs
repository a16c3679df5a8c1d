//! PostgreSQL record store.
//!
//! Records live in a single `records` table keyed by (collection, id) with
//! a version counter and a JSONB payload. `apply` runs one SQL transaction:
//! guards take row locks with `SELECT ... FOR UPDATE`, then the writes land
//! and the transaction commits. Absent-guarded inserts go through a plain
//! `INSERT` so the unique key converts races on fresh ids into conflicts.

use super::{Collection, Guard, RawDoc, RecordStore, StoreError, StoreResult, WriteBatch, WriteOp};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgPool, Row};
use std::collections::HashSet;

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                StoreError::Unavailable(err.to_string())
            }
            _ => StoreError::Backend(err.to_string()),
        }
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

fn row_to_doc(id: String, row: &sqlx::postgres::PgRow) -> RawDoc {
    RawDoc {
        id,
        version: row.get::<i64, _>("version") as u64,
        data: row.get::<Value, _>("data"),
    }
}

#[async_trait]
impl RecordStore for PostgresStore {
    async fn ping(&self) -> StoreResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn get(&self, collection: Collection, id: &str) -> StoreResult<Option<RawDoc>> {
        let row = sqlx::query("SELECT version, data FROM records WHERE collection = $1 AND id = $2")
            .bind(collection.as_str())
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| row_to_doc(id.to_string(), &r)))
    }

    async fn list(&self, collection: Collection) -> StoreResult<Vec<RawDoc>> {
        let rows =
            sqlx::query("SELECT id, version, data FROM records WHERE collection = $1 ORDER BY id")
                .bind(collection.as_str())
                .fetch_all(&self.pool)
                .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let id: String = r.get("id");
                row_to_doc(id, &r)
            })
            .collect())
    }

    async fn find_eq(
        &self,
        collection: Collection,
        field: &str,
        value: &Value,
    ) -> StoreResult<Vec<RawDoc>> {
        let rows = sqlx::query(
            "SELECT id, version, data FROM records \
             WHERE collection = $1 AND data -> $2 = $3 ORDER BY id",
        )
        .bind(collection.as_str())
        .bind(field)
        .bind(value.clone())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let id: String = r.get("id");
                row_to_doc(id, &r)
            })
            .collect())
    }

    async fn apply(&self, batch: WriteBatch) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        // Ids proven absent during the guard phase must be inserted without
        // upsert semantics so a concurrent claim surfaces as a conflict.
        let mut fresh: HashSet<(Collection, String)> = HashSet::new();

        for guard in &batch.guards {
            match guard {
                Guard::Matches {
                    collection,
                    id,
                    version,
                } => {
                    let row = sqlx::query(
                        "SELECT version FROM records WHERE collection = $1 AND id = $2 FOR UPDATE",
                    )
                    .bind(collection.as_str())
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?;

                    let current = row.map(|r| r.get::<i64, _>("version"));
                    if current != Some(*version as i64) {
                        tx.rollback().await.ok();
                        return Err(StoreError::Conflict(format!(
                            "{}/{} was modified concurrently",
                            collection.as_str(),
                            id
                        )));
                    }
                }
                Guard::Absent { collection, id } => {
                    let row = sqlx::query(
                        "SELECT 1 FROM records WHERE collection = $1 AND id = $2 FOR UPDATE",
                    )
                    .bind(collection.as_str())
                    .bind(id)
                    .fetch_optional(&mut *tx)
                    .await?;

                    if row.is_some() {
                        tx.rollback().await.ok();
                        return Err(StoreError::Conflict(format!(
                            "{}/{} already exists",
                            collection.as_str(),
                            id
                        )));
                    }
                    fresh.insert((*collection, id.clone()));
                }
            }
        }

        for op in &batch.ops {
            match op {
                WriteOp::Put {
                    collection,
                    id,
                    data,
                } => {
                    let result = if fresh.contains(&(*collection, id.clone())) {
                        sqlx::query(
                            "INSERT INTO records (collection, id, version, data) \
                             VALUES ($1, $2, 1, $3)",
                        )
                        .bind(collection.as_str())
                        .bind(id)
                        .bind(data.clone())
                        .execute(&mut *tx)
                        .await
                    } else {
                        sqlx::query(
                            "INSERT INTO records (collection, id, version, data) \
                             VALUES ($1, $2, 1, $3) \
                             ON CONFLICT (collection, id) DO UPDATE \
                             SET data = EXCLUDED.data, version = records.version + 1",
                        )
                        .bind(collection.as_str())
                        .bind(id)
                        .bind(data.clone())
                        .execute(&mut *tx)
                        .await
                    };

                    if let Err(err) = result {
                        tx.rollback().await.ok();
                        if is_unique_violation(&err) {
                            return Err(StoreError::Conflict(format!(
                                "{}/{} already exists",
                                collection.as_str(),
                                id
                            )));
                        }
                        return Err(err.into());
                    }
                }
                WriteOp::Delete { collection, id } => {
                    sqlx::query("DELETE FROM records WHERE collection = $1 AND id = $2")
                        .bind(collection.as_str())
                        .bind(id)
                        .execute(&mut *tx)
                        .await?;
                }
            }
        }

        tx.commit().await?;
        Ok(())
    }
}
