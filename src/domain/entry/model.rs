use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::storage::paths::RelPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Folder,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::File => "file",
            EntryKind::Folder => "folder",
        }
    }
}

/// A row of the metadata index.
#[derive(Debug, Clone, FromRow)]
pub struct Entry {
    pub id: Uuid,
    pub owner: Uuid,
    pub filename: String,
    /// Forward-slash path relative to the owner's root.
    pub path: String,
    #[sqlx(rename = "type")]
    pub kind: EntryKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// What the index should say about one object on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntry {
    pub owner: Uuid,
    pub filename: String,
    pub path: RelPath,
    pub kind: EntryKind,
}

impl NewEntry {
    pub fn new(owner: Uuid, path: RelPath, kind: EntryKind) -> Self {
        NewEntry {
            owner,
            filename: path.file_name().to_string(),
            path,
            kind,
        }
    }
}
