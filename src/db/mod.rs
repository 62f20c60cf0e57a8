pub mod operations;
pub mod schema;

use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use tracing::info;

/// Thin wrapper around the scheduler's relational pool. The core never owns
/// in-memory state across calls; everything shared lives behind this pool.
#[derive(Debug, Clone)]
pub struct SchedulerDb {
    pool: SqlitePool,
}

impl SchedulerDb {
    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let options = SqliteConnectOptions::from_str(database_url)?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        schema::run_migrations(&pool).await?;
        info!(database_url, "scheduler database ready");

        Ok(Self { pool })
    }

    pub async fn from_env() -> Result<Self, sqlx::Error> {
        let url = std::env::var("DATABASE_URL")
            .unwrap_or_else(|_| "sqlite://./scheduler.db?mode=rwc".to_string());
        Self::connect(&url).await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
