use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};

use crate::domain::entry::NewEntry;
use crate::storage::paths::RelPath;
use crate::storage::{FsError, ListedEntry, NodeKind, Removed, Storage, walker};

use futures::{StreamExt, TryStreamExt, stream};
use tokio::fs::{
    self, File, OpenOptions, create_dir, create_dir_all, metadata, read_dir, remove_dir,
    remove_dir_all, remove_file, rename, symlink_metadata,
};
use uuid::Uuid;
use walkdir::WalkDir;

/// Upper bound on concurrent `stat` calls while listing one directory.
const LIST_CONCURRENCY: usize = 16;

const NOT_EMPTY: &str = "Directory not empty. Use recursive=true to delete.";

/// Local disk backend.
#[derive(Debug, Default, Clone)]
pub struct FilesystemStorage;

impl FilesystemStorage {
    pub fn new() -> Self {
        FilesystemStorage
    }
}

async fn make_parent(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        create_dir_all(parent).await?;
    }
    Ok(())
}

async fn stat_child(name: String, path: PathBuf) -> io::Result<ListedEntry> {
    // Dangling links still get listed, with the link's own metadata.
    let meta = match metadata(&path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => symlink_metadata(&path).await?,
        Err(e) => return Err(e),
    };
    Ok(ListedEntry {
        name,
        kind: if meta.is_dir() { NodeKind::Directory } else { NodeKind::File },
        size: meta.len(),
        last_modified: meta.modified()?.into(),
    })
}

/// Stats the source of a copy or move and applies the `recursive` rule.
async fn source_kind(src: &Path, recursive: bool, verb: &str) -> Result<NodeKind, FsError> {
    let meta = metadata(src).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => FsError::NotFound("Source path not found".to_string()),
        _ => FsError::internal(format!("Failed to {verb} path"), e),
    })?;
    if !meta.is_dir() {
        return Ok(NodeKind::File);
    }
    if !recursive {
        return Err(FsError::BadRequest(format!("Use recursive: true to {verb} directories")));
    }
    Ok(NodeKind::Directory)
}

/// Rejects transfers where one path contains the other.
fn check_nesting(src: &Path, dst: &Path) -> Result<(), FsError> {
    if dst.starts_with(src) || src.starts_with(dst) {
        return Err(FsError::BadRequest(
            "Source and destination cannot contain each other".to_string(),
        ));
    }
    Ok(())
}

/// Duplicates the directory `src` at `dst`, merging into `dst` if it exists.
async fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    let (src, dst) = (src.to_path_buf(), dst.to_path_buf());
    tokio::task::spawn_blocking(move || copy_tree_blocking(&src, &dst))
        .await
        .map_err(io::Error::other)?
}

fn copy_tree_blocking(src: &Path, dst: &Path) -> io::Result<()> {
    for entry in WalkDir::new(src).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        let relative = entry.path().strip_prefix(src).map_err(io::Error::other)?;
        let target = dst.join(relative);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            std::fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_link(entry.path(), &target)?;
        } else {
            std::fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_link(from: &Path, to: &Path) -> io::Result<()> {
    let target = std::fs::read_link(from)?;
    match std::fs::remove_file(to) {
        Err(e) if e.kind() != ErrorKind::NotFound => return Err(e),
        _ => {}
    }
    std::os::unix::fs::symlink(target, to)
}

#[cfg(not(unix))]
fn copy_link(from: &Path, to: &Path) -> io::Result<()> {
    std::fs::copy(from, to).map(|_| ())
}

#[async_trait::async_trait]
impl Storage for FilesystemStorage {
    async fn ensure_dir(&self, path: &Path) -> Result<(), FsError> {
        create_dir_all(path)
            .await
            .map_err(|e| FsError::internal("Failed to prepare user directory", e))
    }

    async fn list(&self, path: &Path) -> Result<Vec<ListedEntry>, FsError> {
        let mut read_dir = read_dir(path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => FsError::NotFound("Path not found".to_string()),
            ErrorKind::NotADirectory => FsError::NotADirectory,
            _ => FsError::internal("Failed to list directory", e),
        })?;

        let mut children = Vec::new();
        while let Some(child) = read_dir
            .next_entry()
            .await
            .map_err(|e| FsError::internal("Failed to list directory", e))?
        {
            children.push((child.file_name().to_string_lossy().into_owned(), child.path()));
        }

        let mut listed: Vec<ListedEntry> = stream::iter(children)
            .map(|(name, path)| stat_child(name, path))
            .buffer_unordered(LIST_CONCURRENCY)
            .try_collect()
            .await
            .map_err(|e| FsError::internal("Failed to list directory", e))?;
        listed.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listed)
    }

    async fn create(&self, path: &Path, kind: NodeKind) -> Result<(), FsError> {
        match kind {
            NodeKind::Directory => {
                make_parent(path)
                    .await
                    .map_err(|e| FsError::internal("Failed to create folder", e))?;
                create_dir(path).await.map_err(|e| match e.kind() {
                    ErrorKind::AlreadyExists => {
                        FsError::Conflict("Folder already exists".to_string())
                    }
                    _ => FsError::internal("Failed to create folder", e),
                })
            }
            NodeKind::File => {
                make_parent(path)
                    .await
                    .map_err(|e| FsError::internal("Failed to create file", e))?;
                OpenOptions::new()
                    .write(true)
                    .create_new(true)
                    .open(path)
                    .await
                    .map(|_| ())
                    .map_err(|e| match e.kind() {
                        ErrorKind::AlreadyExists => {
                            FsError::Conflict("File already exists".to_string())
                        }
                        _ => FsError::internal("Failed to create file", e),
                    })
            }
        }
    }

    async fn open(&self, path: &Path) -> Result<File, FsError> {
        let classify = |e: io::Error| match e.kind() {
            ErrorKind::NotFound => FsError::NotFound("File does not exist".to_string()),
            _ => FsError::internal("Failed to read file", e),
        };
        let meta = metadata(path).await.map_err(classify)?;
        if meta.is_dir() {
            return Err(FsError::BadRequest(
                "Provided path is a directory, not a file".to_string(),
            ));
        }
        File::open(path).await.map_err(classify)
    }

    async fn delete(&self, path: &Path, recursive: bool) -> Result<Removed, FsError> {
        let internal = |e: io::Error| FsError::internal("Failed to delete path", e);
        let meta = symlink_metadata(path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => FsError::NotFound("Path not found".to_string()),
            _ => internal(e),
        })?;

        if !meta.is_dir() {
            remove_file(path).await.map_err(internal)?;
            return Ok(Removed::File);
        }
        if recursive {
            remove_dir_all(path).await.map_err(internal)?;
            return Ok(Removed::Tree);
        }

        let mut entries = read_dir(path).await.map_err(internal)?;
        if entries.next_entry().await.map_err(internal)?.is_some() {
            return Err(FsError::BadRequest(NOT_EMPTY.to_string()));
        }
        remove_dir(path).await.map_err(|e| match e.kind() {
            ErrorKind::DirectoryNotEmpty => FsError::BadRequest(NOT_EMPTY.to_string()),
            _ => internal(e),
        })?;
        Ok(Removed::EmptyDirectory)
    }

    async fn copy(&self, src: &Path, dst: &Path, recursive: bool) -> Result<NodeKind, FsError> {
        let kind = source_kind(src, recursive, "copy").await?;
        check_nesting(src, dst)?;
        async {
            make_parent(dst).await?;
            match kind {
                NodeKind::Directory => copy_tree(src, dst).await,
                NodeKind::File => fs::copy(src, dst).await.map(|_| ()),
            }
        }
        .await
        .map_err(|e| FsError::internal("Failed to copy path", e))?;
        Ok(kind)
    }

    async fn move_path(
        &self,
        src: &Path,
        dst: &Path,
        recursive: bool,
    ) -> Result<NodeKind, FsError> {
        let kind = source_kind(src, recursive, "move").await?;
        check_nesting(src, dst)?;
        async {
            make_parent(dst).await?;
            if let Err(e) = rename(src, dst).await {
                tracing::debug!(
                    src = %src.display(),
                    dst = %dst.display(),
                    "rename failed ({e}), falling back to copy and delete"
                );
                match kind {
                    NodeKind::Directory => {
                        copy_tree(src, dst).await?;
                        remove_dir_all(src).await?;
                    }
                    NodeKind::File => {
                        fs::copy(src, dst).await?;
                        remove_file(src).await?;
                    }
                }
            }
            Ok::<_, io::Error>(())
        }
        .await
        .map_err(|e| FsError::internal("Failed to move path", e))?;
        Ok(kind)
    }

    async fn walk(
        &self,
        owner: Uuid,
        path: &Path,
        key: &RelPath,
        include_root: bool,
    ) -> Result<Vec<NewEntry>, FsError> {
        walker::walk(owner, path, key, include_root)
            .await
            .map_err(|e| FsError::internal("Failed to index subtree", e))
    }
}
