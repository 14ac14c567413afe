use crate::domain::record::Record;
use crate::error::{AppError, MapToAppError};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

type Result<T> = std::result::Result<T, AppError>;

/// Every query is scoped by owner; a record is invisible to other users.
#[async_trait::async_trait]
pub trait RecordRepository: Send + Sync {
    async fn create_record(&self, record: &Record) -> Result<()>;

    async fn list_records(&self, owner: &Uuid) -> Result<Vec<Record>>;

    async fn query_record(&self, owner: &Uuid, id: &Uuid) -> Result<Option<Record>>;

    /// Writes back `filename` and `content`. Returns false when no such record exists.
    async fn update_record(&self, record: &Record) -> Result<bool>;

    async fn delete_record(&self, owner: &Uuid, id: &Uuid) -> Result<bool>;
}

#[derive(Debug)]
pub struct SqliteRecordRepository {
    pub pool: Arc<SqlitePool>,
}

impl SqliteRecordRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl RecordRepository for SqliteRecordRepository {
    async fn create_record(&self, record: &Record) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO records (id, owner, filename, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(record.id)
        .bind(record.owner)
        .bind(&record.filename)
        .bind(&record.content)
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(self.pool.as_ref())
        .await
        .map_to_internal()?;
        Ok(())
    }

    async fn list_records(&self, owner: &Uuid) -> Result<Vec<Record>> {
        sqlx::query_as::<_, Record>("SELECT * FROM records WHERE owner = $1 ORDER BY created_at")
            .bind(owner)
            .fetch_all(self.pool.as_ref())
            .await
            .map_to_internal()
    }

    async fn query_record(&self, owner: &Uuid, id: &Uuid) -> Result<Option<Record>> {
        sqlx::query_as::<_, Record>("SELECT * FROM records WHERE id = $1 AND owner = $2")
            .bind(id)
            .bind(owner)
            .fetch_optional(self.pool.as_ref())
            .await
            .map_to_internal()
    }

    async fn update_record(&self, record: &Record) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE records SET filename = $1, content = $2, updated_at = $3
            WHERE id = $4 AND owner = $5
            "#,
        )
        .bind(&record.filename)
        .bind(&record.content)
        .bind(record.updated_at)
        .bind(record.id)
        .bind(record.owner)
        .execute(self.pool.as_ref())
        .await
        .map_to_internal()?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_record(&self, owner: &Uuid, id: &Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM records WHERE id = $1 AND owner = $2")
            .bind(id)
            .bind(owner)
            .execute(self.pool.as_ref())
            .await
            .map_to_internal()?;
        Ok(result.rows_affected() > 0)
    }
}
