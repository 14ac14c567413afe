use std::io;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::fs::File;
use uuid::Uuid;

use crate::domain::entry::NewEntry;
use crate::error::{AppError, BusinessError, InternalError};
use crate::storage::paths::RelPath;

pub mod driver;
pub mod paths;
pub mod walker;

/// How a disk operation failed, from the client's point of view.
#[derive(Error, Debug)]
pub enum FsError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Path is not a directory")]
    NotADirectory,

    #[error("{0}")]
    Conflict(String),

    #[error("{context}: {source}")]
    Internal {
        context: String,
        #[source]
        source: io::Error,
    },
}

impl FsError {
    pub fn internal(context: impl Into<String>, source: io::Error) -> Self {
        FsError::Internal {
            context: context.into(),
            source,
        }
    }
}

impl From<FsError> for AppError {
    fn from(err: FsError) -> Self {
        match err {
            FsError::BadRequest(msg) => BusinessError::BadRequest(msg).into(),
            FsError::NotFound(msg) => BusinessError::NotFound(msg).into(),
            FsError::NotADirectory => {
                BusinessError::BadRequest("Path is not a directory".to_string()).into()
            }
            FsError::Conflict(msg) => BusinessError::Conflict(msg).into(),
            FsError::Internal { context, source } => InternalError::Io { context, source }.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Directory,
}

/// One child of a listed directory.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListedEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// What a delete actually removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removed {
    File,
    EmptyDirectory,
    Tree,
}

/// Disk operations on absolute paths already confined by the path resolver.
///
/// Implementations are the only place where OS errors are classified into
/// [`FsError`].
#[async_trait::async_trait]
pub trait Storage: Send + Sync {
    async fn ensure_dir(&self, path: &Path) -> Result<(), FsError>;

    async fn list(&self, path: &Path) -> Result<Vec<ListedEntry>, FsError>;

    /// Creates an empty file or a directory, making missing parents.
    async fn create(&self, path: &Path, kind: NodeKind) -> Result<(), FsError>;

    async fn open(&self, path: &Path) -> Result<File, FsError>;

    async fn delete(&self, path: &Path, recursive: bool) -> Result<Removed, FsError>;

    /// Returns the kind of `src`.
    async fn copy(&self, src: &Path, dst: &Path, recursive: bool) -> Result<NodeKind, FsError>;

    /// Returns the kind of `src`.
    async fn move_path(&self, src: &Path, dst: &Path, recursive: bool) -> Result<NodeKind, FsError>;

    /// Index entries for the tree at `path`, whose key is `key`.
    async fn walk(
        &self,
        owner: Uuid,
        path: &Path,
        key: &RelPath,
        include_root: bool,
    ) -> Result<Vec<NewEntry>, FsError>;
}
