use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

/// A named piece of text stored directly in the database. Unrelated to the
/// on-disk tree.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: Uuid,
    pub owner: Uuid,
    pub filename: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record {
    pub fn new(owner: Uuid, filename: impl Into<String>, content: impl Into<String>) -> Self {
        let now = Utc::now();
        Record {
            id: Uuid::new_v4(),
            owner,
            filename: filename.into(),
            content: content.into(),
            created_at: now,
            updated_at: now,
        }
    }
}
