use crate::config::Config;
use crate::domain::entry::{EntryRepository, SqliteEntryRepository};
use crate::domain::record::{RecordRepository, SqliteRecordRepository};
use crate::domain::user::{SqliteUserRepository, UserRepository};
use crate::service::sync::MetadataSync;
use crate::storage::Storage;
use crate::storage::driver::filesystem::FilesystemStorage;
use crate::storage::paths::PathResolver;
use sqlx::SqlitePool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<dyn Storage>,
    pub resolver: PathResolver,
    pub sync: MetadataSync,
    pub user_storage: Arc<dyn UserRepository>,
    pub entry_storage: Arc<dyn EntryRepository>,
    pub record_storage: Arc<dyn RecordRepository>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config, pool: Arc<SqlitePool>) -> Self {
        let storage: Arc<dyn Storage> = Arc::new(FilesystemStorage::new());
        let entry_storage: Arc<dyn EntryRepository> =
            Arc::new(SqliteEntryRepository::new(pool.clone()));

        AppState {
            resolver: PathResolver::new(config.root_dir.clone()),
            sync: MetadataSync::new(storage.clone(), entry_storage.clone()),
            storage,
            user_storage: Arc::new(SqliteUserRepository::new(pool.clone())),
            entry_storage,
            record_storage: Arc::new(SqliteRecordRepository::new(pool)),
            config: Arc::new(config),
        }
    }
}
