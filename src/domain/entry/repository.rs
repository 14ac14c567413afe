use crate::domain::entry::{Entry, EntryKind, NewEntry};
use crate::error::{AppError, MapToAppError};
use crate::storage::paths::RelPath;
use chrono::Utc;
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::sync::Arc;
use uuid::Uuid;

type Result<T> = std::result::Result<T, AppError>;

/// The metadata index. Rows are unique per `(owner, path)`; a subtree is every
/// row whose path equals the root's path or starts with it followed by `/`.
///
/// Writes that touch several rows run in one transaction and upsert by key, so
/// replaying any of them leaves the index in the same state.
#[async_trait::async_trait]
pub trait EntryRepository: Send + Sync {
    async fn query_entry(&self, owner: &Uuid, path: &RelPath) -> Result<Option<Entry>>;

    /// Rows of the subtree rooted at `path`, ordered by path. The user root
    /// selects every row of the owner.
    async fn list_subtree(&self, owner: &Uuid, path: &RelPath) -> Result<Vec<Entry>>;

    async fn upsert_entries(&self, entries: &[NewEntry]) -> Result<()>;

    async fn delete_entry(&self, owner: &Uuid, path: &RelPath) -> Result<u64>;

    async fn delete_subtree(&self, owner: &Uuid, path: &RelPath) -> Result<u64>;

    /// Re-keys the file row at `from` to `to`, dropping whatever row `to` had.
    /// Inserts a fresh row when `from` is not indexed. Returns whether an
    /// existing row was carried over.
    async fn move_entry(&self, owner: &Uuid, from: &RelPath, to: &RelPath) -> Result<bool>;

    /// Drops the subtree at `from` and upserts `entries` in one transaction.
    async fn replace_subtree(
        &self,
        owner: &Uuid,
        from: &RelPath,
        entries: &[NewEntry],
    ) -> Result<()>;
}

#[derive(Debug)]
pub struct SqliteEntryRepository {
    pub pool: Arc<SqlitePool>,
}

impl SqliteEntryRepository {
    pub fn new(pool: Arc<SqlitePool>) -> Self {
        Self { pool }
    }
}

fn descendant_prefix(path: &RelPath) -> String {
    format!("{path}/")
}

async fn upsert_in(tx: &mut Transaction<'_, Sqlite>, entry: &NewEntry) -> Result<()> {
    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO entries (id, owner, filename, path, type, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (owner, path) DO UPDATE SET
            filename = excluded.filename,
            type = excluded.type,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(entry.owner)
    .bind(&entry.filename)
    .bind(entry.path.as_str())
    .bind(entry.kind)
    .bind(now)
    .bind(now)
    .execute(&mut **tx)
    .await
    .map_to_internal()?;
    Ok(())
}

async fn delete_subtree_in(
    tx: &mut Transaction<'_, Sqlite>,
    owner: &Uuid,
    path: &RelPath,
) -> Result<u64> {
    let prefix = descendant_prefix(path);
    let result = sqlx::query(
        "DELETE FROM entries WHERE owner = $1 AND (path = $2 OR substr(path, 1, length($3)) = $4)",
    )
    .bind(owner)
    .bind(path.as_str())
    .bind(&prefix)
    .bind(&prefix)
    .execute(&mut **tx)
    .await
    .map_to_internal()?;
    Ok(result.rows_affected())
}

#[async_trait::async_trait]
impl EntryRepository for SqliteEntryRepository {
    async fn query_entry(&self, owner: &Uuid, path: &RelPath) -> Result<Option<Entry>> {
        sqlx::query_as::<_, Entry>("SELECT * FROM entries WHERE owner = $1 AND path = $2")
            .bind(owner)
            .bind(path.as_str())
            .fetch_optional(self.pool.as_ref())
            .await
            .map_to_internal()
    }

    async fn list_subtree(&self, owner: &Uuid, path: &RelPath) -> Result<Vec<Entry>> {
        if path.is_root() {
            return sqlx::query_as::<_, Entry>(
                "SELECT * FROM entries WHERE owner = $1 ORDER BY path",
            )
            .bind(owner)
            .fetch_all(self.pool.as_ref())
            .await
            .map_to_internal();
        }
        let prefix = descendant_prefix(path);
        sqlx::query_as::<_, Entry>(
            r#"
            SELECT * FROM entries
            WHERE owner = $1 AND (path = $2 OR substr(path, 1, length($3)) = $4)
            ORDER BY path
            "#,
        )
        .bind(owner)
        .bind(path.as_str())
        .bind(&prefix)
        .bind(&prefix)
        .fetch_all(self.pool.as_ref())
        .await
        .map_to_internal()
    }

    async fn upsert_entries(&self, entries: &[NewEntry]) -> Result<()> {
        let mut tx = self.pool.begin().await.map_to_internal()?;
        for entry in entries {
            upsert_in(&mut tx, entry).await?;
        }
        tx.commit().await.map_to_internal()
    }

    async fn delete_entry(&self, owner: &Uuid, path: &RelPath) -> Result<u64> {
        let result = sqlx::query("DELETE FROM entries WHERE owner = $1 AND path = $2")
            .bind(owner)
            .bind(path.as_str())
            .execute(self.pool.as_ref())
            .await
            .map_to_internal()?;
        Ok(result.rows_affected())
    }

    async fn delete_subtree(&self, owner: &Uuid, path: &RelPath) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_to_internal()?;
        let deleted = delete_subtree_in(&mut tx, owner, path).await?;
        tx.commit().await.map_to_internal()?;
        Ok(deleted)
    }

    async fn move_entry(&self, owner: &Uuid, from: &RelPath, to: &RelPath) -> Result<bool> {
        let mut tx = self.pool.begin().await.map_to_internal()?;

        sqlx::query("DELETE FROM entries WHERE owner = $1 AND path = $2")
            .bind(owner)
            .bind(to.as_str())
            .execute(&mut *tx)
            .await
            .map_to_internal()?;

        let moved = sqlx::query(
            r#"
            UPDATE entries SET path = $1, filename = $2, updated_at = $3
            WHERE owner = $4 AND path = $5
            "#,
        )
        .bind(to.as_str())
        .bind(to.file_name())
        .bind(Utc::now())
        .bind(owner)
        .bind(from.as_str())
        .execute(&mut *tx)
        .await
        .map_to_internal()?
        .rows_affected()
            > 0;

        if !moved {
            upsert_in(&mut tx, &NewEntry::new(*owner, to.clone(), EntryKind::File)).await?;
        }

        tx.commit().await.map_to_internal()?;
        Ok(moved)
    }

    async fn replace_subtree(
        &self,
        owner: &Uuid,
        from: &RelPath,
        entries: &[NewEntry],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_to_internal()?;
        let dropped = delete_subtree_in(&mut tx, owner, from).await?;
        tracing::debug!(%owner, path = %from, dropped, "dropped subtree before re-indexing");
        for entry in entries {
            upsert_in(&mut tx, entry).await?;
        }
        tx.commit().await.map_to_internal()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_pool;

    fn rel(path: &str) -> RelPath {
        RelPath::parse(path)
    }

    fn paths(entries: &[Entry]) -> Vec<&str> {
        entries.iter().map(|e| e.path.as_str()).collect()
    }

    async fn seeded(owner: Uuid) -> SqliteEntryRepository {
        let repo = SqliteEntryRepository::new(test_pool().await);
        repo.upsert_entries(&[
            NewEntry::new(owner, rel("notes"), EntryKind::Folder),
            NewEntry::new(owner, rel("notes/todo.txt"), EntryKind::File),
            NewEntry::new(owner, rel("notes/old"), EntryKind::Folder),
            NewEntry::new(owner, rel("notes/old/a.txt"), EntryKind::File),
            NewEntry::new(owner, rel("notes_2"), EntryKind::Folder),
            NewEntry::new(owner, rel("notesXtodo"), EntryKind::File),
        ])
        .await
        .unwrap();
        repo
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let owner = Uuid::new_v4();
        let repo = SqliteEntryRepository::new(test_pool().await);
        let entry = NewEntry::new(owner, rel("a/b.txt"), EntryKind::File);
        repo.upsert_entries(&[entry.clone()]).await.unwrap();
        repo.upsert_entries(&[entry.clone(), entry]).await.unwrap();

        let all = repo.list_subtree(&owner, &RelPath::root()).await.unwrap();
        assert_eq!(paths(&all), ["a/b.txt"]);
        assert_eq!(all[0].filename, "b.txt");
        assert_eq!(all[0].kind, EntryKind::File);
    }

    #[tokio::test]
    async fn upsert_overwrites_kind() {
        let owner = Uuid::new_v4();
        let repo = SqliteEntryRepository::new(test_pool().await);
        repo.upsert_entries(&[NewEntry::new(owner, rel("x"), EntryKind::File)])
            .await
            .unwrap();
        repo.upsert_entries(&[NewEntry::new(owner, rel("x"), EntryKind::Folder)])
            .await
            .unwrap();
        let entry = repo.query_entry(&owner, &rel("x")).await.unwrap().unwrap();
        assert_eq!(entry.kind, EntryKind::Folder);
    }

    #[tokio::test]
    async fn subtree_is_prefix_plus_separator() {
        let owner = Uuid::new_v4();
        let repo = seeded(owner).await;

        let subtree = repo.list_subtree(&owner, &rel("notes")).await.unwrap();
        assert_eq!(paths(&subtree), ["notes", "notes/old", "notes/old/a.txt", "notes/todo.txt"]);

        assert_eq!(repo.delete_subtree(&owner, &rel("notes")).await.unwrap(), 4);
        let rest = repo.list_subtree(&owner, &RelPath::root()).await.unwrap();
        assert_eq!(paths(&rest), ["notesXtodo", "notes_2"]);
    }

    #[tokio::test]
    async fn subtree_ignores_like_wildcards() {
        let owner = Uuid::new_v4();
        let repo = SqliteEntryRepository::new(test_pool().await);
        repo.upsert_entries(&[
            NewEntry::new(owner, rel("a_b"), EntryKind::Folder),
            NewEntry::new(owner, rel("a_b/c"), EntryKind::File),
            NewEntry::new(owner, rel("aXb/c"), EntryKind::File),
            NewEntry::new(owner, rel("a%/c"), EntryKind::File),
        ])
        .await
        .unwrap();
        assert_eq!(repo.delete_subtree(&owner, &rel("a_b")).await.unwrap(), 2);
        assert_eq!(repo.delete_subtree(&owner, &rel("a%")).await.unwrap(), 1);
        assert!(repo.query_entry(&owner, &rel("aXb/c")).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn owners_do_not_see_each_other() {
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());
        let repo = seeded(alice).await;
        assert!(repo.list_subtree(&bob, &RelPath::root()).await.unwrap().is_empty());
        assert_eq!(repo.delete_subtree(&bob, &rel("notes")).await.unwrap(), 0);
        assert_eq!(repo.delete_entry(&bob, &rel("notesXtodo")).await.unwrap(), 0);
        assert_eq!(repo.delete_entry(&alice, &rel("notesXtodo")).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn move_entry_updates_in_place() {
        let owner = Uuid::new_v4();
        let repo = seeded(owner).await;
        let before = repo.query_entry(&owner, &rel("notes/todo.txt")).await.unwrap().unwrap();

        assert!(repo.move_entry(&owner, &rel("notes/todo.txt"), &rel("done.txt")).await.unwrap());

        assert!(repo.query_entry(&owner, &rel("notes/todo.txt")).await.unwrap().is_none());
        let after = repo.query_entry(&owner, &rel("done.txt")).await.unwrap().unwrap();
        assert_eq!(after.id, before.id);
        assert_eq!(after.filename, "done.txt");
    }

    #[tokio::test]
    async fn move_entry_inserts_when_source_unindexed() {
        let owner = Uuid::new_v4();
        let repo = seeded(owner).await;
        let carried = repo
            .move_entry(&owner, &rel("ghost.txt"), &rel("notes/ghost.txt"))
            .await
            .unwrap();
        assert!(!carried);
        let entry = repo.query_entry(&owner, &rel("notes/ghost.txt")).await.unwrap().unwrap();
        assert_eq!(entry.kind, EntryKind::File);
    }

    #[tokio::test]
    async fn move_entry_replaces_destination_row() {
        let owner = Uuid::new_v4();
        let repo = seeded(owner).await;
        repo.move_entry(&owner, &rel("notesXtodo"), &rel("notes/todo.txt")).await.unwrap();
        let subtree = repo.list_subtree(&owner, &rel("notes")).await.unwrap();
        assert_eq!(subtree.iter().filter(|e| e.path == "notes/todo.txt").count(), 1);
        assert!(repo.query_entry(&owner, &rel("notesXtodo")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replace_subtree_rekeys_rows() {
        let owner = Uuid::new_v4();
        let repo = seeded(owner).await;
        let moved = [
            NewEntry::new(owner, rel("archive/notes"), EntryKind::Folder),
            NewEntry::new(owner, rel("archive/notes/todo.txt"), EntryKind::File),
        ];
        repo.replace_subtree(&owner, &rel("notes"), &moved).await.unwrap();
        repo.replace_subtree(&owner, &rel("notes"), &moved).await.unwrap();

        assert!(repo.list_subtree(&owner, &rel("notes")).await.unwrap().is_empty());
        let archived = repo.list_subtree(&owner, &rel("archive/notes")).await.unwrap();
        assert_eq!(paths(&archived), ["archive/notes", "archive/notes/todo.txt"]);
    }
}
