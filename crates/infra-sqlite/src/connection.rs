// SQLite Connection Pool Setup

use crate::store::map_sqlx_error;
use qafka_core::error::{AppError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

const MAX_CONNECTIONS: u32 = 10;

/// Create SQLite connection pool with WAL mode and foreign keys enforced
///
/// An in-memory database lives per connection, so memory URLs get a
/// single-connection pool that every handle shares.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(|e| AppError::Config(format!("Invalid database URL '{}': {}", database_url, e)))?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true)
        .create_if_missing(true);

    let pool_options = if is_memory_url(database_url) {
        // Closing the only connection would drop the database
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
    } else {
        SqlitePoolOptions::new().max_connections(MAX_CONNECTIONS)
    };

    pool_options
        .connect_with(options)
        .await
        .map_err(map_sqlx_error)
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}
