use anyhow::Result;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous},
    SqlitePool as SqlxSqlitePool,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub type SqlitePool = SqlxSqlitePool;

/// Default pool size for a single service process
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Clone)]
pub struct SqliteClient {
    pool: Arc<SqlitePool>,
    db_path: String,
}

impl SqliteClient {
    /// Open (creating if needed) the database with the default pool size
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self> {
        Self::with_max_connections(db_path, DEFAULT_MAX_CONNECTIONS).await
    }

    /// Open the database with WAL journaling and foreign keys enforced
    pub async fn with_max_connections(
        db_path: impl AsRef<Path>,
        max_connections: u32,
    ) -> Result<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect_with(options)
            .await?;

        // Set cache size to 2MB (negative value means KB)
        sqlx::query("PRAGMA cache_size = -2000")
            .execute(&pool)
            .await?;

        info!(
            "SQLite database connected with foreign keys enabled: {}",
            db_path_str
        );

        Ok(Self {
            pool: Arc::new(pool),
            db_path: db_path_str,
        })
    }

    /// Create from an existing pool
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self {
            pool: Arc::new(pool),
            db_path: "from_pool".to_string(),
        }
    }

    /// Get the underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Get database file path
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Check if database is accessible
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&*self.pool).await?;
        Ok(())
    }
}
