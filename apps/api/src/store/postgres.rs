use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{migrate::Migrator, FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use super::{Collection, Document, DocumentStore, Filter, StoreError};

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

#[derive(FromRow)]
struct DocumentRow {
    #[sqlx(rename = "_id")]
    id: Uuid,
    doc: Value,
}

impl DocumentRow {
    fn into_document(self, collection: Collection) -> Result<Document, StoreError> {
        match self.doc {
            Value::Object(body) => Ok(Document { id: self.id, body }),
            _ => Err(StoreError::NotAnObject {
                collection: collection.name(),
            }),
        }
    }
}

/// Postgres-backed store: one JSONB table per collection.
/// Table names come from `Collection::name`, never from request input.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies the embedded migrations (collection tables and indexes).
    pub async fn migrate(&self) -> Result<(), StoreError> {
        MIGRATOR.run(&self.pool).await?;
        info!("Document store schema is up to date");
        Ok(())
    }

    async fn select(
        &self,
        collection: Collection,
        filter: &Filter,
        limit: Option<i64>,
    ) -> Result<Vec<Document>, StoreError> {
        let table = collection.name();
        let rows = match filter {
            Filter::Equals { field, value } => {
                sqlx::query_as::<_, DocumentRow>(&format!(
                    "SELECT _id, doc FROM {table} WHERE doc -> $1::text = $2 ORDER BY seq LIMIT $3"
                ))
                .bind(*field)
                .bind(value)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
            Filter::IntRange { path, min, max } => {
                // The cast sits inside CASE: stored values that are not numbers
                // (e.g. uncoerced salary strings) must never reach it.
                let path: Vec<String> = path.iter().map(|s| s.to_string()).collect();
                sqlx::query_as::<_, DocumentRow>(&format!(
                    r#"
                    SELECT _id, doc FROM (
                        SELECT _id, seq, doc,
                               CASE WHEN jsonb_typeof(doc #> $1::text[]) = 'number'
                                    THEN (doc #>> $1::text[])::numeric
                               END AS n
                        FROM {table}
                    ) AS numbered
                    WHERE n IS NOT NULL
                      AND ($2::bigint IS NULL OR n >= $2)
                      AND ($3::bigint IS NULL OR n <= $3)
                    ORDER BY seq
                    LIMIT $4
                    "#
                ))
                .bind(path)
                .bind(*min)
                .bind(*max)
                .bind(limit)
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.into_iter()
            .map(|row| row.into_document(collection))
            .collect()
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: Collection, id: Uuid) -> Result<Option<Document>, StoreError> {
        let row = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT _id, doc FROM {} WHERE _id = $1",
            collection.name()
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_document(collection)).transpose()
    }

    async fn find_one(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .select(collection, filter, Some(1))
            .await?
            .into_iter()
            .next())
    }

    async fn find_many(
        &self,
        collection: Collection,
        filter: &Filter,
    ) -> Result<Vec<Document>, StoreError> {
        self.select(collection, filter, None).await
    }

    async fn scan(&self, collection: Collection) -> Result<Vec<Document>, StoreError> {
        let rows = sqlx::query_as::<_, DocumentRow>(&format!(
            "SELECT _id, doc FROM {} ORDER BY seq",
            collection.name()
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| row.into_document(collection))
            .collect()
    }

    async fn count(&self, collection: Collection) -> Result<u64, StoreError> {
        let n: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", collection.name()))
            .fetch_one(&self.pool)
            .await?;
        Ok(n.max(0) as u64)
    }

    async fn insert(
        &self,
        collection: Collection,
        body: Map<String, Value>,
    ) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        sqlx::query(&format!(
            "INSERT INTO {} (_id, doc) VALUES ($1, $2)",
            collection.name()
        ))
        .bind(id)
        .bind(Value::Object(body))
        .execute(&self.pool)
        .await?;
        Ok(id)
    }

    async fn merge(
        &self,
        collection: Collection,
        id: Uuid,
        fields: Map<String, Value>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET doc = doc || $2 WHERE _id = $1",
            collection.name()
        ))
        .bind(id)
        .bind(Value::Object(fields))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, collection: Collection, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE _id = $1", collection.name()))
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn close(&self) {
        info!("Closing PostgreSQL connection pool");
        self.pool.close().await;
    }
}
