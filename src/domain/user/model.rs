use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    /// bcrypt hash of the password.
    pub password: String,
    pub salt: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        salt: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            username: username.into(),
            password: password.into(),
            salt: salt.into(),
            created_at: now,
            updated_at: now,
        }
    }
}
