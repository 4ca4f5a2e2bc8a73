use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use tracing::info;

use crate::database::ports::watched_roots::WatchedRootStore;
use crate::error::{DiscoveryError, Result};
use crate::types::WatchedRoot;

/// Watched-root store backed by the `watched_roots` table.
///
/// `path` is the table's primary key; a duplicate insert is detected from
/// the database's unique-violation error rather than a prior lookup.
#[derive(Clone, Debug)]
pub struct PostgresWatchedRootStore {
    pool: PgPool,
}

impl PostgresWatchedRootStore {
    /// Wrap an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a small pool against `database_url`.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await
            .map_err(|e| {
                DiscoveryError::Database(format!("Failed to connect to database: {}", e))
            })?;
        Ok(Self { pool })
    }

    /// Apply the embedded migrations.
    pub async fn migrate(&self) -> Result<()> {
        crate::MIGRATOR
            .run(&self.pool)
            .await
            .map_err(|e| DiscoveryError::Database(format!("Failed to apply migrations: {}", e)))?;
        info!("watched_roots schema is up to date");
        Ok(())
    }

    /// Underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn encode_path(path: &Path) -> Result<&str> {
        path.to_str().ok_or_else(|| DiscoveryError::InvalidPath {
            path: path.to_path_buf(),
            reason: "path is not valid UTF-8".to_string(),
        })
    }

    fn decode_row(row: &PgRow) -> Result<WatchedRoot> {
        let path: String = row.try_get("path")?;
        let created_at: DateTime<Utc> = row.try_get("created_at")?;
        Ok(WatchedRoot {
            path: PathBuf::from(path),
            created_at,
        })
    }
}

#[async_trait]
impl WatchedRootStore for PostgresWatchedRootStore {
    async fn insert(&self, root: WatchedRoot) -> Result<()> {
        let path = Self::encode_path(&root.path)?;

        sqlx::query(
            r#"
            INSERT INTO watched_roots (path, created_at)
            VALUES ($1, $2)
            "#,
        )
        .bind(path)
        .bind(root.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let Some(db_err) = e.as_database_error()
                && db_err.is_unique_violation()
            {
                return DiscoveryError::DuplicateRoot(root.path.clone());
            }
            DiscoveryError::Database(format!("Failed to insert watched root: {}", e))
        })?;

        Ok(())
    }

    async fn find(&self, path: &Path) -> Result<Option<WatchedRoot>> {
        let key = Self::encode_path(path)?;

        let row = sqlx::query("SELECT path, created_at FROM watched_roots WHERE path = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DiscoveryError::Database(format!("Database query failed: {}", e)))?;

        row.as_ref().map(Self::decode_row).transpose()
    }

    async fn find_all(&self) -> Result<Vec<WatchedRoot>> {
        let rows = sqlx::query(
            "SELECT path, created_at FROM watched_roots ORDER BY created_at, path",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DiscoveryError::Database(format!("Database query failed: {}", e)))?;

        rows.iter().map(Self::decode_row).collect()
    }

    async fn delete(&self, path: &Path) -> Result<bool> {
        let key = Self::encode_path(path)?;

        let result = sqlx::query("DELETE FROM watched_roots WHERE path = $1")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                DiscoveryError::Database(format!("Failed to delete watched root: {}", e))
            })?;

        Ok(result.rows_affected() > 0)
    }
}
