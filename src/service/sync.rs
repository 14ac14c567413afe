//! Keeps the metadata index in step with the disk.
//!
//! Every method runs after the matching disk mutation has succeeded and only
//! writes rows for the acting owner. Writes upsert by `(owner, path)`, so a
//! method may be replayed after a failure without duplicating rows. A failure
//! here is not rolled back on disk: it is logged with enough context to redo
//! the write by hand and returned to the caller as an internal error.

use std::sync::Arc;

use uuid::Uuid;

use crate::domain::entry::{EntryKind, EntryRepository, NewEntry};
use crate::error::AppError;
use crate::storage::paths::{RelPath, ResolvedPath};
use crate::storage::{NodeKind, Removed, Storage};

#[derive(Clone)]
pub struct MetadataSync {
    storage: Arc<dyn Storage>,
    entries: Arc<dyn EntryRepository>,
}

/// Folder rows for every proper ancestor of `key`, outermost first.
fn ancestor_folders(owner: Uuid, key: &RelPath) -> Vec<NewEntry> {
    key.ancestors()
        .into_iter()
        .map(|path| NewEntry::new(owner, path, EntryKind::Folder))
        .collect()
}

/// Rows for the whole chain from the user root down to `key`.
fn lineage(owner: Uuid, key: &RelPath, kind: EntryKind) -> Vec<NewEntry> {
    let mut entries = ancestor_folders(owner, key);
    entries.push(NewEntry::new(owner, key.clone(), kind));
    entries
}

impl MetadataSync {
    pub fn new(storage: Arc<dyn Storage>, entries: Arc<dyn EntryRepository>) -> Self {
        MetadataSync { storage, entries }
    }

    pub async fn record_create(
        &self,
        owner: Uuid,
        key: &RelPath,
        kind: EntryKind,
    ) -> Result<(), AppError> {
        let result = self.entries.upsert_entries(&lineage(owner, key, kind)).await;
        logged(result, "create", owner, key)
    }

    /// Returns how many rows went away.
    pub async fn record_delete(
        &self,
        owner: Uuid,
        key: &RelPath,
        removed: Removed,
    ) -> Result<u64, AppError> {
        let result = match removed {
            Removed::Tree => self.entries.delete_subtree(&owner, key).await,
            Removed::File | Removed::EmptyDirectory => self.entries.delete_entry(&owner, key).await,
        };
        logged(result, "delete", owner, key)
    }

    pub async fn record_copy(
        &self,
        owner: Uuid,
        dest: &ResolvedPath,
        kind: NodeKind,
    ) -> Result<(), AppError> {
        let result = match kind {
            NodeKind::File => {
                let entries = lineage(owner, &dest.key, EntryKind::File);
                self.entries.upsert_entries(&entries).await
            }
            NodeKind::Directory => self.copy_tree(owner, dest).await,
        };
        logged(result, "copy", owner, &dest.key)
    }

    pub async fn record_move(
        &self,
        owner: Uuid,
        src: &RelPath,
        dest: &ResolvedPath,
        kind: NodeKind,
    ) -> Result<(), AppError> {
        let result = match kind {
            NodeKind::File => self.move_file(owner, src, &dest.key).await,
            NodeKind::Directory => self.move_tree(owner, src, dest).await,
        };
        logged(result, "move", owner, &dest.key)
    }

    async fn copy_tree(&self, owner: Uuid, dest: &ResolvedPath) -> Result<(), AppError> {
        let mut entries = lineage(owner, &dest.key, EntryKind::Folder);
        entries.extend(self.storage.walk(owner, &dest.disk, &dest.key, false).await?);
        self.entries.upsert_entries(&entries).await
    }

    async fn move_file(&self, owner: Uuid, src: &RelPath, dest: &RelPath) -> Result<(), AppError> {
        self.entries.upsert_entries(&ancestor_folders(owner, dest)).await?;
        let carried = self.entries.move_entry(&owner, src, dest).await?;
        if !carried {
            tracing::debug!(%owner, %src, %dest, "moved file had no index row, inserted one");
        }
        Ok(())
    }

    async fn move_tree(
        &self,
        owner: Uuid,
        src: &RelPath,
        dest: &ResolvedPath,
    ) -> Result<(), AppError> {
        let mut entries = ancestor_folders(owner, &dest.key);
        entries.extend(self.storage.walk(owner, &dest.disk, &dest.key, true).await?);
        self.entries.replace_subtree(&owner, src, &entries).await
    }
}

fn logged<T>(
    result: Result<T, AppError>,
    op: &str,
    owner: Uuid,
    key: &RelPath,
) -> Result<T, AppError> {
    result.inspect_err(|e| {
        tracing::error!(%owner, op, path = %key, "metadata index out of sync with disk: {e}");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entry::SqliteEntryRepository;
    use crate::domain::test_pool;
    use crate::storage::driver::filesystem::FilesystemStorage;
    use crate::storage::paths::PathResolver;
    use std::collections::BTreeSet;
    use std::fs;

    struct Fixture {
        _tmp: tempfile::TempDir,
        owner: Uuid,
        resolver: PathResolver,
        storage: Arc<dyn Storage>,
        entries: Arc<dyn EntryRepository>,
        sync: MetadataSync,
    }

    async fn fixture() -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let owner = Uuid::new_v4();
        let resolver = PathResolver::new(tmp.path());
        fs::create_dir_all(resolver.user_root(&owner)).unwrap();
        let storage: Arc<dyn Storage> = Arc::new(FilesystemStorage::new());
        let entries: Arc<dyn EntryRepository> =
            Arc::new(SqliteEntryRepository::new(test_pool().await));
        let sync = MetadataSync::new(storage.clone(), entries.clone());
        Fixture { _tmp: tmp, owner, resolver, storage, entries, sync }
    }

    impl Fixture {
        fn at(&self, raw: &str) -> ResolvedPath {
            self.resolver.resolve(&self.owner, raw)
        }

        async fn create(&self, raw: &str, kind: NodeKind) {
            let target = self.at(raw);
            self.storage.create(&target.disk, kind).await.unwrap();
            let kind = match kind {
                NodeKind::File => EntryKind::File,
                NodeKind::Directory => EntryKind::Folder,
            };
            self.sync.record_create(self.owner, &target.key, kind).await.unwrap();
        }

        async fn indexed(&self, raw: &str) -> Vec<(String, EntryKind)> {
            self.entries
                .list_subtree(&self.owner, &RelPath::parse(raw))
                .await
                .unwrap()
                .into_iter()
                .map(|e| (e.path, e.kind))
                .collect()
        }

        /// Sub-paths below `raw` as the walker sees them on disk.
        async fn on_disk(&self, raw: &str) -> BTreeSet<String> {
            let target = self.at(raw);
            let prefix = format!("{}/", target.key);
            self.storage
                .walk(self.owner, &target.disk, &target.key, false)
                .await
                .unwrap()
                .into_iter()
                .map(|e| e.path.as_str().strip_prefix(&prefix).unwrap().to_string())
                .collect()
        }

        async fn in_index(&self, raw: &str) -> BTreeSet<String> {
            let prefix = format!("{}/", RelPath::parse(raw));
            self.indexed(raw)
                .await
                .into_iter()
                .filter_map(|(path, _)| path.strip_prefix(&prefix).map(str::to_string))
                .collect()
        }
    }

    #[tokio::test]
    async fn create_indexes_every_segment() {
        let f = fixture().await;
        f.create("notes/todo.txt", NodeKind::File).await;
        assert_eq!(
            f.indexed("").await,
            [
                ("notes".to_string(), EntryKind::Folder),
                ("notes/todo.txt".to_string(), EntryKind::File),
            ]
        );

        f.create("a/b/c", NodeKind::Directory).await;
        assert_eq!(f.indexed("a").await.len(), 3);
        assert!(f.indexed("a").await.iter().all(|(_, k)| *k == EntryKind::Folder));
    }

    #[tokio::test]
    async fn delete_tree_clears_prefix_only() {
        let f = fixture().await;
        f.create("notes/todo.txt", NodeKind::File).await;
        f.create("notes/old/a.txt", NodeKind::File).await;
        f.create("notes2/keep.txt", NodeKind::File).await;

        let target = f.at("notes");
        let removed = f.storage.delete(&target.disk, true).await.unwrap();
        assert_eq!(f.sync.record_delete(f.owner, &target.key, removed).await.unwrap(), 4);

        assert!(f.indexed("notes").await.is_empty());
        assert_eq!(f.indexed("notes2").await.len(), 2);
    }

    #[tokio::test]
    async fn delete_single_file_is_exact() {
        let f = fixture().await;
        f.create("notes/todo.txt", NodeKind::File).await;
        let target = f.at("notes/todo.txt");
        let removed = f.storage.delete(&target.disk, false).await.unwrap();
        assert_eq!(f.sync.record_delete(f.owner, &target.key, removed).await.unwrap(), 1);
        assert_eq!(f.indexed("").await, [("notes".to_string(), EntryKind::Folder)]);
    }

    #[tokio::test]
    async fn copy_tree_mirrors_source_structure() {
        let f = fixture().await;
        f.create("src/a.txt", NodeKind::File).await;
        f.create("src/sub/b.txt", NodeKind::File).await;
        f.create("src/empty", NodeKind::Directory).await;

        let (src, dst) = (f.at("src"), f.at("backup/src"));
        let kind = f.storage.copy(&src.disk, &dst.disk, true).await.unwrap();
        f.sync.record_copy(f.owner, &dst, kind).await.unwrap();

        assert_eq!(f.in_index("backup/src").await, f.on_disk("src").await);
        assert_eq!(f.in_index("src").await, f.on_disk("src").await);
        assert_eq!(f.indexed("backup").await[0], ("backup".to_string(), EntryKind::Folder));
        assert_eq!(f.indexed("backup/src").await[0], ("backup/src".to_string(), EntryKind::Folder));

        // Replaying the sync changes nothing.
        let before = f.indexed("").await;
        f.sync.record_copy(f.owner, &dst, kind).await.unwrap();
        assert_eq!(f.indexed("").await, before);
    }

    #[tokio::test]
    async fn copy_file_adds_destination_only() {
        let f = fixture().await;
        f.create("a.txt", NodeKind::File).await;
        let (src, dst) = (f.at("a.txt"), f.at("b/a.txt"));
        let kind = f.storage.copy(&src.disk, &dst.disk, false).await.unwrap();
        f.sync.record_copy(f.owner, &dst, kind).await.unwrap();

        let paths: Vec<String> = f.indexed("").await.into_iter().map(|(p, _)| p).collect();
        assert_eq!(paths, ["a.txt", "b", "b/a.txt"]);
    }

    #[tokio::test]
    async fn move_file_keeps_row_identity() {
        let f = fixture().await;
        f.create("notes/todo.txt", NodeKind::File).await;
        f.create("other/todo.txt", NodeKind::File).await;
        let row = f
            .entries
            .query_entry(&f.owner, &RelPath::parse("notes/todo.txt"))
            .await
            .unwrap()
            .unwrap();

        let (src, dst) = (f.at("notes/todo.txt"), f.at("done/todo.txt"));
        let kind = f.storage.move_path(&src.disk, &dst.disk, false).await.unwrap();
        f.sync.record_move(f.owner, &src.key, &dst, kind).await.unwrap();

        let moved = f.entries.query_entry(&f.owner, &dst.key).await.unwrap().unwrap();
        assert_eq!(moved.id, row.id);
        assert!(f.entries.query_entry(&f.owner, &src.key).await.unwrap().is_none());
        // A file sharing the name elsewhere is left alone.
        assert!(
            f.entries
                .query_entry(&f.owner, &RelPath::parse("other/todo.txt"))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn move_tree_rekeys_subtree() {
        let f = fixture().await;
        f.create("notes/todo.txt", NodeKind::File).await;
        f.create("notes/deep/x.txt", NodeKind::File).await;

        let (src, dst) = (f.at("notes"), f.at("archive/notes"));
        let kind = f.storage.move_path(&src.disk, &dst.disk, true).await.unwrap();
        f.sync.record_move(f.owner, &src.key, &dst, kind).await.unwrap();

        assert!(!src.disk.exists());
        assert!(f.indexed("notes").await.is_empty());
        assert_eq!(f.in_index("archive/notes").await, f.on_disk("archive/notes").await);
        let all: Vec<String> = f.indexed("").await.into_iter().map(|(p, _)| p).collect();
        assert_eq!(
            all,
            [
                "archive",
                "archive/notes",
                "archive/notes/deep",
                "archive/notes/deep/x.txt",
                "archive/notes/todo.txt",
            ]
        );
    }
}
