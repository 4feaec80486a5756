//! Storage bootstrap.
//!
//! Opens the SQLite pool with foreign keys enforced and applies the embedded
//! migrations. Any failure here is fatal to startup.

use std::{str::FromStr, time::Duration};

use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Connection acquire timeout.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

/// Connects to `url` and runs migrations.
///
/// `sqlite::memory:` yields a single, never-recycled connection: an in-memory
/// database lives exactly as long as its connection, and every pooled connection
/// would otherwise see its own empty database.
pub async fn connect(url: &str) -> Result<SqlitePool, DbError> {
    let options = SqliteConnectOptions::from_str(url)?.foreign_keys(true);

    let pool = if url.contains(":memory:") {
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect_with(options.create_if_missing(true))
            .await?
    };

    info!(url = %url, "Database connected");

    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Database migrations checked/applied");

    Ok(pool)
}
