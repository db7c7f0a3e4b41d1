use crate::config::AppConfig;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions},
    SqlitePool,
};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database connection error: {0}")]
    Connection(#[from] sqlx::Error),
    #[error("Invalid database URL: {0}")]
    InvalidUrl(String),
}

/// Initialize database connection pool with proper SQLite configuration
pub async fn create_pool(config: &AppConfig) -> Result<SqlitePool, DatabaseError> {
    info!("Initializing database connection pool");

    let connect_options = SqliteConnectOptions::from_str(&config.database.url)
        .map_err(|e| DatabaseError::InvalidUrl(format!("Invalid database URL: {}", e)))?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.database.max_connections)
        .connect_with(connect_options)
        .await?;

    info!(
        "Database connection pool created with max connections: {}",
        config.database.max_connections
    );

    Ok(pool)
}

/// Initialize database with connection pool and tables
pub async fn initialize_database(config: &AppConfig) -> Result<SqlitePool, DatabaseError> {
    let pool = create_pool(config).await?;

    create_tables(&pool).await?;

    info!("Database initialization completed successfully");

    Ok(pool)
}

/// Create the snippet and user tables when they are missing.
pub async fn create_tables(pool: &SqlitePool) -> Result<(), DatabaseError> {
    info!("Creating database tables");

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS snippets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            expires_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            hashed_password TEXT NOT NULL,
            created_at INTEGER NOT NULL,
            active INTEGER NOT NULL DEFAULT 1,
            CONSTRAINT users_uc_email UNIQUE (email)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_snippets_created_at ON snippets(created_at)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_snippets_expires_at ON snippets(expires_at)")
        .execute(pool)
        .await?;

    info!("Database tables created successfully");

    Ok(())
}

/// Single-connection in-memory database with the schema applied. One connection keeps every
/// query on the same `:memory:` database.
#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("in-memory sqlite pool");
    create_tables(&pool).await.expect("schema applies");
    pool
}
