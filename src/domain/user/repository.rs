use crate::domain::user::User;
use crate::error::{AppError, BusinessError, MapToAppError};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

type Result<T> = std::result::Result<T, AppError>;

#[async_trait::async_trait]
pub trait UserRepository: Send + Sync {
    async fn query_user_by_name(&self, name: &str) -> Result<Option<User>>;

    async fn query_user_by_id(&self, id: &Uuid) -> Result<Option<User>>;

    async fn create_user(&self, user: User) -> Result<()>;
}

#[derive(Debug)]
pub struct SqliteUserRepository {
    pub pool: Arc<SqlitePool>,
}

impl SqliteUserRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl UserRepository for SqliteUserRepository {
    async fn query_user_by_name(&self, name: &str) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = $1")
            .bind(name)
            .fetch_optional(self.pool.as_ref())
            .await
            .map_to_internal()
    }

    async fn query_user_by_id(&self, id: &Uuid) -> Result<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(self.pool.as_ref())
            .await
            .map_to_internal()
    }

    async fn create_user(&self, user: User) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, username, password, salt, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password)
        .bind(&user.salt)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(self.pool.as_ref())
        .await;
        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(BusinessError::Conflict("user already exists".to_string()).into())
            }
            Err(e) => Err(e).map_to_internal(),
        }
    }
}
