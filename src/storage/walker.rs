//! Enumerates a directory tree into index rows.
//!
//! The walk is depth first: every directory appears before anything inside it,
//! and siblings come out in name order, so the result is stable for a given
//! disk state. Symbolic links are reported as files and never followed.
//!
//! Names that are not valid UTF-8 cannot become index keys. They fail the walk
//! with `InvalidData`, even though a directory listing still shows them
//! (lossily decoded).

use std::io;
use std::path::{Path, PathBuf};

use uuid::Uuid;
use walkdir::WalkDir;

use crate::domain::entry::{EntryKind, NewEntry};
use crate::storage::paths::RelPath;

pub async fn walk(
    owner: Uuid,
    root: &Path,
    root_key: &RelPath,
    include_root: bool,
) -> io::Result<Vec<NewEntry>> {
    let (root, root_key) = (root.to_path_buf(), root_key.clone());
    tokio::task::spawn_blocking(move || walk_blocking(owner, root, root_key, include_root))
        .await
        .map_err(io::Error::other)?
}

fn walk_blocking(
    owner: Uuid,
    root: PathBuf,
    root_key: RelPath,
    include_root: bool,
) -> io::Result<Vec<NewEntry>> {
    // Surface a missing root as NotFound before walkdir wraps it.
    std::fs::symlink_metadata(&root)?;

    let mut entries = Vec::new();
    let walker = WalkDir::new(&root)
        .follow_links(false)
        .sort_by_file_name()
        .min_depth(if include_root { 0 } else { 1 });
    for entry in walker {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(&root)
            .map_err(io::Error::other)?;

        let mut key = root_key.clone();
        for segment in relative.components() {
            let name = segment.as_os_str().to_str().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("non UTF-8 file name under {}", root.display()),
                )
            })?;
            key = key.join(name);
        }

        let kind = if entry.file_type().is_dir() {
            EntryKind::Folder
        } else {
            EntryKind::File
        };
        entries.push(NewEntry::new(owner, key, kind));
    }
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(entries: &[NewEntry]) -> Vec<(&str, EntryKind)> {
        entries.iter().map(|e| (e.path.as_str(), e.kind)).collect()
    }

    #[tokio::test]
    async fn parents_come_before_children() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("notes");
        std::fs::create_dir_all(root.join("b/deep")).unwrap();
        std::fs::create_dir_all(root.join("a")).unwrap();
        std::fs::write(root.join("todo.txt"), b"x").unwrap();
        std::fs::write(root.join("b/deep/leaf.txt"), b"y").unwrap();

        let owner = Uuid::new_v4();
        let key = RelPath::parse("archive/notes");
        let entries = walk(owner, &root, &key, true).await.unwrap();
        assert_eq!(
            keys(&entries),
            [
                ("archive/notes", EntryKind::Folder),
                ("archive/notes/a", EntryKind::Folder),
                ("archive/notes/b", EntryKind::Folder),
                ("archive/notes/b/deep", EntryKind::Folder),
                ("archive/notes/b/deep/leaf.txt", EntryKind::File),
                ("archive/notes/todo.txt", EntryKind::File),
            ]
        );
        assert!(entries.iter().all(|e| e.owner == owner));
        assert_eq!(entries[5].filename, "todo.txt");
    }

    #[tokio::test]
    async fn root_is_optional() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("x"), b"").unwrap();
        let entries = walk(Uuid::new_v4(), tmp.path(), &RelPath::parse("d"), false)
            .await
            .unwrap();
        assert_eq!(keys(&entries), [("d/x", EntryKind::File)]);
    }

    #[tokio::test]
    async fn single_file_root() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("f.txt");
        std::fs::write(&file, b"").unwrap();
        let entries = walk(Uuid::new_v4(), &file, &RelPath::parse("f.txt"), true)
            .await
            .unwrap();
        assert_eq!(keys(&entries), [("f.txt", EntryKind::File)]);
    }

    #[tokio::test]
    async fn missing_root_errors() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("nope");
        let err = walk(Uuid::new_v4(), &missing, &RelPath::parse("nope"), true)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn symlinks_are_files_and_not_followed() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("root");
        std::fs::create_dir_all(tmp.path().join("outside/deep")).unwrap();
        std::fs::create_dir(&root).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("outside"), root.join("link")).unwrap();

        let entries = walk(Uuid::new_v4(), &root, &RelPath::parse("r"), false)
            .await
            .unwrap();
        assert_eq!(keys(&entries), [("r/link", EntryKind::File)]);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn non_utf8_names_fail_the_walk() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(OsStr::from_bytes(b"bad\xff")), b"").unwrap();
        let err = walk(Uuid::new_v4(), tmp.path(), &RelPath::parse("d"), false)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
