// db/postgres.rs
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgListener, types::Json, PgPool, Postgres, Row, Transaction};
use tokio::sync::broadcast;
use uuid::Uuid;

use super::document::{
    has_server_timestamps, resolve_server_timestamps, Direction, Document, DocumentStore, Filter,
    Query, StoreError, StoredDocument, UpdateFn,
};

const CHANGE_CHANNEL: &str = "document_changes";
const CHANGE_FEED_CAPACITY: usize = 256;

/// Document store over a single PostgreSQL `documents` table (JSONB payloads).
/// Writes are announced with `pg_notify`, so every node sharing the database
/// sees the same change feed.
#[derive(Debug, Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
    tx: broadcast::Sender<String>,
}

impl PgDocumentStore {
    /// Runs the migrations and starts forwarding notifications to the change feed.
    pub async fn connect(pool: PgPool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(sqlx::Error::from)?;

        let (tx, _) = broadcast::channel(CHANGE_FEED_CAPACITY);

        let mut listener = PgListener::connect_with(&pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;

        let feed = tx.clone();
        tokio::spawn(async move {
            loop {
                match listener.recv().await {
                    Ok(notification) => {
                        let _ = feed.send(notification.payload().to_string());
                    }
                    Err(e) => {
                        tracing::error!("Change feed listener failed: {}. Reconnecting.", e);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        tracing::info!("PostgreSQL document store ready");
        Ok(PgDocumentStore { pool, tx })
    }

    async fn stamp(&self, data: &mut Document) -> Result<(), StoreError> {
        if has_server_timestamps(data) {
            let now: i64 = sqlx::query_scalar(
                "SELECT (EXTRACT(EPOCH FROM clock_timestamp()) * 1000)::BIGINT",
            )
            .fetch_one(&self.pool)
            .await?;
            resolve_server_timestamps(data, now);
        }
        Ok(())
    }

    async fn notify(&self, collection: &str) -> Result<(), StoreError> {
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(CHANGE_CHANNEL)
            .bind(collection)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn notify_tx(
        tx: &mut Transaction<'_, Postgres>,
        collection: &str,
    ) -> Result<(), StoreError> {
        sqlx::query("SELECT pg_notify($1, $2)")
            .bind(CHANGE_CHANNEL)
            .bind(collection)
            .execute(&mut **tx)
            .await?;
        Ok(())
    }
}

/// Folds the filters into one JSONB containment document for `data @> $n`.
fn containment(filters: &[Filter]) -> Document {
    let mut probe = Document::new();
    for filter in filters {
        match filter {
            Filter::Eq(field, value) => {
                probe.insert(field.clone(), value.clone());
            }
            Filter::ArrayContains(field, value) => {
                probe.insert(field.clone(), Value::Array(vec![value.clone()]));
            }
        }
    }
    probe
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .map(|e| e.is_unique_violation())
        .unwrap_or(false)
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn insert(&self, collection: &str, mut data: Document) -> Result<String, StoreError> {
        let id = Uuid::new_v4().simple().to_string();
        self.stamp(&mut data).await?;

        sqlx::query("INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(&id)
            .bind(Json(&data))
            .execute(&self.pool)
            .await?;

        self.notify(collection).await?;
        Ok(id)
    }

    async fn create(&self, collection: &str, id: &str, mut data: Document) -> Result<(), StoreError> {
        self.stamp(&mut data).await?;

        let result = sqlx::query("INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3)")
            .bind(collection)
            .bind(id)
            .bind(Json(&data))
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => {}
            Err(e) if is_unique_violation(&e) => {
                return Err(StoreError::already_exists(collection, id));
            }
            Err(e) => return Err(e.into()),
        }

        self.notify(collection).await?;
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<StoredDocument>, StoreError> {
        let row = sqlx::query_as::<_, (Json<Document>,)>(
            "SELECT data FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(Json(data),)| StoredDocument {
            id: id.to_string(),
            data,
        }))
    }

    async fn query(&self, query: &Query) -> Result<Vec<StoredDocument>, StoreError> {
        let order = match &query.order_by {
            Some((_, Direction::Ascending)) => "ORDER BY data -> $3 ASC, seq ASC",
            Some((_, Direction::Descending)) => "ORDER BY data -> $3 DESC, seq DESC",
            None => "ORDER BY seq ASC",
        };
        let sql = format!(
            "SELECT id, data FROM documents WHERE collection = $1 AND data @> $2 {}",
            order
        );

        let mut statement = sqlx::query(&sql)
            .bind(&query.collection)
            .bind(Json(containment(&query.filters)));
        if let Some((field, _)) = &query.order_by {
            statement = statement.bind(field);
        }

        let rows = statement.fetch_all(&self.pool).await?;
        rows.into_iter()
            .map(|row| -> Result<StoredDocument, StoreError> {
                let id: String = row.try_get("id")?;
                let Json(data): Json<Document> = row.try_get("data")?;
                Ok(StoredDocument { id, data })
            })
            .collect()
    }

    async fn set_merge(&self, collection: &str, id: &str, mut data: Document) -> Result<(), StoreError> {
        self.stamp(&mut data).await?;

        sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            ON CONFLICT (collection, id)
            DO UPDATE SET data = documents.data || EXCLUDED.data
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(Json(&data))
        .execute(&self.pool)
        .await?;

        self.notify(collection).await
    }

    async fn update(&self, collection: &str, id: &str, mut data: Document) -> Result<(), StoreError> {
        self.stamp(&mut data).await?;

        let result = sqlx::query(
            "UPDATE documents SET data = data || $3 WHERE collection = $1 AND id = $2",
        )
        .bind(collection)
        .bind(id)
        .bind(Json(&data))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(collection, id));
        }
        self.notify(collection).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(collection, id));
        }
        self.notify(collection).await
    }

    async fn increment(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<i64, StoreError> {
        // The row lock taken by UPDATE serializes concurrent increments.
        let value = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE documents
            SET data = jsonb_set(
                data,
                ARRAY[$3::TEXT],
                to_jsonb(COALESCE((data ->> $3)::BIGINT, 0) + $4)
            )
            WHERE collection = $1 AND id = $2
            RETURNING (data ->> $3)::BIGINT
            "#,
        )
        .bind(collection)
        .bind(id)
        .bind(field)
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| StoreError::not_found(collection, id))?;

        self.notify(collection).await?;
        Ok(value)
    }

    async fn update_with(
        &self,
        collection: &str,
        id: &str,
        apply: UpdateFn,
    ) -> Result<Document, StoreError> {
        let mut tx = self.pool.begin().await?;

        let (Json(mut data),) = sqlx::query_as::<_, (Json<Document>,)>(
            "SELECT data FROM documents WHERE collection = $1 AND id = $2 FOR UPDATE",
        )
        .bind(collection)
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| StoreError::not_found(collection, id))?;

        apply(&mut data)?;
        self.stamp(&mut data).await?;

        sqlx::query("UPDATE documents SET data = $3 WHERE collection = $1 AND id = $2")
            .bind(collection)
            .bind(id)
            .bind(Json(&data))
            .execute(&mut *tx)
            .await?;

        Self::notify_tx(&mut tx, collection).await?;
        tx.commit().await?;
        Ok(data)
    }

    fn changes(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_containment_folds_filters() {
        let probe = containment(&[
            Filter::eq("status", "open"),
            Filter::array_contains("participants", "u1"),
        ]);
        assert_eq!(
            Value::Object(probe),
            json!({ "status": "open", "participants": ["u1"] })
        );
    }

    #[test]
    fn test_empty_containment_matches_everything() {
        assert!(containment(&[]).is_empty());
    }
}
