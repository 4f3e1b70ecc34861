// SQLite store handle and error mapping

use crate::SqliteStoreTransaction;
use async_trait::async_trait;
use qafka_core::error::{AppError, Result};
use qafka_core::port::{StoreTransaction, TransactionalStore};
use sqlx::SqlitePool;

/// Convert sqlx::Error to AppError
///
/// Constraint violations keep their meaning (`Conflict`, `NotFound`,
/// `Validation`); everything else means the store could not serve the call.
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> AppError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().map(|c| c.to_string()).unwrap_or_default();

            // SQLite extended result codes: https://www.sqlite.org/rescode.html
            match code.as_str() {
                // UNIQUE / PRIMARY KEY constraint failed
                "2067" | "1555" => AppError::Conflict(format!(
                    "Unique constraint violation: {}",
                    db_err.message()
                )),
                // FOREIGN KEY constraint failed: referenced row is missing
                "787" => AppError::NotFound(format!(
                    "Referenced row does not exist: {}",
                    db_err.message()
                )),
                // CHECK constraint failed
                "275" => AppError::Validation(format!(
                    "Check constraint violation: {}",
                    db_err.message()
                )),
                "5" | "517" => AppError::StoreUnavailable(format!(
                    "Database locked (SQLITE_BUSY): {}",
                    db_err.message()
                )),
                "13" => AppError::StoreUnavailable(format!("Database full: {}", db_err.message())),
                _ => AppError::StoreUnavailable(format!(
                    "Database error [{}]: {}",
                    code,
                    db_err.message()
                )),
            }
        }
        sqlx::Error::ColumnNotFound(col) => {
            AppError::Internal(format!("Column not found: {}", col))
        }
        sqlx::Error::ColumnDecode { index, source } => {
            AppError::Internal(format!("Failed to decode column {}: {}", index, source))
        }
        // Connection, pool, protocol errors
        _ => AppError::StoreUnavailable(err.to_string()),
    }
}

/// Transaction entry point over the shared pool
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionalStore for SqliteStore {
    async fn begin_transaction(&self) -> Result<Box<dyn StoreTransaction>> {
        let tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        Ok(Box::new(SqliteStoreTransaction::new(tx)))
    }
}
