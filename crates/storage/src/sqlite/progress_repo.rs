use async_trait::async_trait;
use status_core::model::{Progress, ProgressRowId};

use super::mapping::map_progress_row;
use super::{SqliteInitError, SqliteRepository};
use crate::feed::{ChangeEvent, ChangeFilter, ChangeSubscription, poll_row};
use crate::repository::{ProgressRecord, ProgressRepository, StorageError};

impl SqliteRepository {
    /// Insert the row at 0% unless it already exists.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the insert fails.
    pub async fn ensure_row(&self, row_id: ProgressRowId) -> Result<(), SqliteInitError> {
        self.provision(row_id, Progress::ZERO).await?;
        Ok(())
    }

    /// Insert the row with `initial` unless it already exists.
    ///
    /// Returns `true` when a new row was created.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the insert fails.
    pub async fn provision(
        &self,
        row_id: ProgressRowId,
        initial: Progress,
    ) -> Result<bool, sqlx::Error> {
        let res = sqlx::query(
            r"
            INSERT INTO progress (id, current_progress, updated_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(id) DO NOTHING
            ",
        )
        .bind(row_id.to_string())
        .bind(i64::from(initial))
        .bind(self.clock.now())
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn fetch_progress(
        &self,
        row_id: ProgressRowId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let row = sqlx::query(
            r"
            SELECT id, current_progress, updated_at
            FROM progress
            WHERE id = ?1
            ",
        )
        .bind(row_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn update_progress(
        &self,
        row_id: ProgressRowId,
        progress: Progress,
    ) -> Result<(), StorageError> {
        let now = self.clock.now();
        let res = sqlx::query(
            r"
            UPDATE progress
            SET current_progress = ?2, updated_at = ?3
            WHERE id = ?1
            ",
        )
        .bind(row_id.to_string())
        .bind(i64::from(progress))
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|err| StorageError::Connection(err.to_string()))?;

        if res.rows_affected() == 0 {
            return Err(StorageError::NotFound);
        }

        let record = ProgressRecord {
            id: row_id,
            current_progress: progress,
            updated_at: Some(now),
        };
        let _ = self.changes.send(ChangeEvent::for_record(&record));
        Ok(())
    }

    async fn subscribe(&self, filter: ChangeFilter) -> Result<ChangeSubscription, StorageError> {
        let local = self.changes.subscribe();
        Ok(poll_row(
            self.clone(),
            filter,
            self.poll_interval,
            Some(local),
        ))
    }
}
