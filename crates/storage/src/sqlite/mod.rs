use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use status_core::Clock;
use thiserror::Error;
use tokio::sync::broadcast;

use crate::feed::ChangeEvent;
use crate::repository::Storage;

mod mapping;
mod migrate;
mod progress_repo;

const FEED_CAPACITY: usize = 64;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// `SQLite`-backed progress store.
///
/// `SQLite` has no server push. Updates made through this repository (or
/// any clone of it) are announced at once on an in-process broadcast feed;
/// writes from other connections to the same file are picked up by polling
/// the row every `poll_interval`.
#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
    clock: Clock,
    changes: broadcast::Sender<ChangeEvent>,
    poll_interval: Duration,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Connect to `SQLite` using the given URL, creating the database file
    /// if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the URL is invalid, the connection cannot
    /// be established, or connection pragmas fail.
    pub async fn connect(database_url: &str, clock: Clock) -> Result<Self, SqliteInitError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect_with(options)
            .await?;
        let (changes, _) = broadcast::channel(FEED_CAPACITY);
        Ok(Self {
            pool,
            clock,
            changes,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// How often subscriptions re-read the row for writes made elsewhere.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`, migrated and with `row_id`
    /// provisioned. Subscriptions poll the row every `poll_interval`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection, migrations, or provisioning
    /// cannot be completed.
    pub async fn sqlite(
        database_url: &str,
        clock: Clock,
        row_id: status_core::model::ProgressRowId,
        poll_interval: Duration,
    ) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url, clock)
            .await?
            .with_poll_interval(poll_interval);
        repo.migrate().await?;
        repo.ensure_row(row_id).await?;
        Ok(Self::from_repository(repo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SqliteRepository>();
    }
}
