use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::{AppError, MapToAppError};

pub mod entry;
pub mod record;
pub mod user;

pub static MIGRATOR: Migrator = sqlx::migrate!();

/// Opens the metadata database and brings its schema up to date.
pub async fn connect(db_url: &str, max_connections: u32) -> Result<SqlitePool, AppError> {
    let options = SqliteConnectOptions::from_str(db_url)
        .map_to_internal()?
        .create_if_missing(true)
        .busy_timeout(Duration::from_secs(5));

    let mut pool_options = SqlitePoolOptions::new().max_connections(max_connections);
    if db_url.contains(":memory:") {
        // An in-memory database lives only as long as its connection.
        pool_options = pool_options.idle_timeout(None).max_lifetime(None);
    }
    let pool = pool_options.connect_with(options).await.map_to_internal()?;

    MIGRATOR.run(&pool).await.map_to_internal()?;
    tracing::info!("metadata database ready at {db_url}");
    Ok(pool)
}

#[cfg(test)]
pub(crate) async fn test_pool() -> std::sync::Arc<SqlitePool> {
    std::sync::Arc::new(connect("sqlite::memory:", 1).await.unwrap())
}
