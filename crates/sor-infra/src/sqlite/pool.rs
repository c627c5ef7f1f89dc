//! Split reader/writer SQLite pool.
//!
//! SQLite permits a single writer at a time, so writes go through a
//! one-connection pool while reads get a small concurrent pool. Both run
//! in WAL mode with foreign keys enforced. Migrations are applied on the
//! writer before the reader opens.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use std::time::Duration;

const MAX_READERS: u32 = 8;
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Read/write connection pools for one SQLite database.
#[derive(Clone)]
pub struct DatabasePool {
    pub reader: SqlitePool,
    pub writer: SqlitePool,
}

impl DatabasePool {
    /// Open (creating if missing) the database at `database_url`, run
    /// pending migrations, and return the split pools.
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        let opts = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(BUSY_TIMEOUT)
            .create_if_missing(true);

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts.clone())
            .await?;

        sqlx::migrate!("../../migrations").run(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(MAX_READERS)
            .connect_with(opts.read_only(true))
            .await?;

        Ok(Self { reader, writer })
    }

    /// Open the default per-device database (see [`default_database_url`]).
    pub async fn open_default() -> Result<Self, sqlx::Error> {
        Self::new(&default_database_url()).await
    }
}

/// Database URL from `SOR_DATA_DIR`, falling back to `~/.sor/sor.db`.
pub fn default_database_url() -> String {
    let data_dir = std::env::var("SOR_DATA_DIR").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        format!("{home}/.sor")
    });
    format!("sqlite://{data_dir}/sor.db")
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn temp_pool(name: &str) -> DatabasePool {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join(name);
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        std::mem::forget(dir);
        DatabasePool::new(&url).await.unwrap()
    }

    #[tokio::test]
    async fn test_migrations_create_schema() {
        let pool = temp_pool("schema.db").await;

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name != '_sqlx_migrations' ORDER BY name",
        )
        .fetch_all(&pool.reader)
        .await
        .unwrap();

        let names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        assert_eq!(names, vec!["app_state", "messages", "sessions", "users"]);
    }

    #[tokio::test]
    async fn test_wal_mode_and_foreign_keys() {
        let pool = temp_pool("pragmas.db").await;

        let journal: (String,) = sqlx::query_as("PRAGMA journal_mode")
            .fetch_one(&pool.writer)
            .await
            .unwrap();
        assert_eq!(journal.0.to_lowercase(), "wal");

        let fk: (i32,) = sqlx::query_as("PRAGMA foreign_keys")
            .fetch_one(&pool.writer)
            .await
            .unwrap();
        assert_eq!(fk.0, 1);
    }

    #[tokio::test]
    async fn test_reader_pool_rejects_writes() {
        let pool = temp_pool("readonly.db").await;

        let result = sqlx::query("INSERT INTO app_state (key, value) VALUES ('k', 'v')")
            .execute(&pool.reader)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_default_database_url() {
        let url = default_database_url();
        assert!(url.starts_with("sqlite://"));
        assert!(url.ends_with("sor.db"));
    }
}
