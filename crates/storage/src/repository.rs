use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use status_core::Clock;
use status_core::model::{Progress, ProgressRowId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::feed::{ChangeEvent, ChangeFilter, ChangeSubscription};

/// Buffered events per subscriber before it starts lagging.
const FEED_CAPACITY: usize = 64;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("remote store returned status {0}")]
    Http(u16),
}

/// Persisted shape of the single progress row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub id: ProgressRowId,
    pub current_progress: Progress,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    #[must_use]
    pub fn new(id: ProgressRowId, current_progress: Progress) -> Self {
        Self {
            id,
            current_progress,
            updated_at: None,
        }
    }
}

/// Repository contract for the remote progress row.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Fetch the row by id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be reached or the row
    /// cannot be decoded. A missing row is `Ok(None)`.
    async fn fetch_progress(
        &self,
        row_id: ProgressRowId,
    ) -> Result<Option<ProgressRecord>, StorageError>;

    /// Set the progress field of an existing row.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the row does not exist, or other
    /// storage errors.
    async fn update_progress(
        &self,
        row_id: ProgressRowId,
        progress: Progress,
    ) -> Result<(), StorageError>;

    /// Open a change feed scoped by `filter`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the feed cannot be established.
    async fn subscribe(&self, filter: ChangeFilter) -> Result<ChangeSubscription, StorageError>;
}

/// In-memory repository with a broadcast change feed, for tests and demos.
///
/// External writers are simulated with `publish_raw`; read and write failures
/// can be switched on to exercise the error paths.
#[derive(Clone)]
pub struct InMemoryRepository {
    rows: Arc<Mutex<HashMap<ProgressRowId, ProgressRecord>>>,
    changes: broadcast::Sender<ChangeEvent>,
    clock: Clock,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Clock::default())
    }

    #[must_use]
    pub fn with_clock(clock: Clock) -> Self {
        let (changes, _) = broadcast::channel(FEED_CAPACITY);
        Self {
            rows: Arc::new(Mutex::new(HashMap::new())),
            changes,
            clock,
            fail_reads: Arc::new(AtomicBool::new(false)),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Provision a row without emitting a change event.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Connection` if the row map lock is poisoned.
    pub fn seed(&self, row_id: ProgressRowId, progress: Progress) -> Result<(), StorageError> {
        let mut guard = self
            .rows
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(row_id, ProgressRecord::new(row_id, progress));
        Ok(())
    }

    /// Push an event onto the feed as if another writer produced it.
    ///
    /// Returns how many subscribers received it.
    pub fn publish_raw(&self, event: ChangeEvent) -> usize {
        self.changes.send(event).unwrap_or(0)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::Release);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Release);
    }

    /// Number of live change subscriptions.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }
}

impl Default for InMemoryRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn fetch_progress(
        &self,
        row_id: ProgressRowId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        if self.fail_reads.load(Ordering::Acquire) {
            return Err(StorageError::Connection("simulated read failure".into()));
        }
        let guard = self
            .rows
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(&row_id).cloned())
    }

    async fn update_progress(
        &self,
        row_id: ProgressRowId,
        progress: Progress,
    ) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::Acquire) {
            return Err(StorageError::Connection("simulated write failure".into()));
        }
        let record = {
            let mut guard = self
                .rows
                .lock()
                .map_err(|e| StorageError::Connection(e.to_string()))?;
            let record = guard.get_mut(&row_id).ok_or(StorageError::NotFound)?;
            record.current_progress = progress;
            record.updated_at = Some(self.clock.now());
            record.clone()
        };
        // No subscribers is not an error.
        let _ = self.changes.send(ChangeEvent::for_record(&record));
        Ok(())
    }

    async fn subscribe(&self, filter: ChangeFilter) -> Result<ChangeSubscription, StorageError> {
        Ok(ChangeSubscription::from_broadcast(
            filter,
            self.changes.subscribe(),
        ))
    }
}

/// The progress repository behind a trait object for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::from_repository(InMemoryRepository::new())
    }

    #[must_use]
    pub fn from_repository(repo: impl ProgressRepository + 'static) -> Self {
        Self {
            progress: Arc::new(repo),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::extract_progress;
    use status_core::time::fixed_now;

    #[tokio::test]
    async fn fetch_returns_none_for_unknown_row() {
        let repo = InMemoryRepository::new();
        let fetched = repo.fetch_progress(ProgressRowId::random()).await.unwrap();
        assert!(fetched.is_none());
    }

    #[tokio::test]
    async fn update_stamps_time_and_publishes_event() {
        let repo = InMemoryRepository::with_clock(Clock::fixed(fixed_now()));
        let row = ProgressRowId::random();
        repo.seed(row, Progress::ZERO).unwrap();
        let mut sub = repo
            .subscribe(ChangeFilter::progress_updates(row))
            .await
            .unwrap();

        repo.update_progress(row, Progress::clamped(55)).await.unwrap();

        let fetched = repo.fetch_progress(row).await.unwrap().expect("row");
        assert_eq!(fetched.current_progress, Progress::clamped(55));
        assert_eq!(fetched.updated_at, Some(fixed_now()));

        let event = sub.next().await.expect("event");
        assert_eq!(event.row_id, row);
        assert_eq!(
            extract_progress(&event.new_record),
            Some(Progress::clamped(55))
        );
    }

    #[tokio::test]
    async fn update_of_missing_row_is_not_found() {
        let repo = InMemoryRepository::new();
        let err = repo
            .update_progress(ProgressRowId::random(), Progress::COMPLETE)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound));
    }

    #[tokio::test]
    async fn failure_switches_affect_reads_and_writes() {
        let repo = InMemoryRepository::new();
        let row = ProgressRowId::random();
        repo.seed(row, Progress::clamped(10)).unwrap();

        repo.fail_reads(true);
        assert!(repo.fetch_progress(row).await.is_err());
        repo.fail_reads(false);

        repo.fail_writes(true);
        assert!(repo.update_progress(row, Progress::COMPLETE).await.is_err());
        let fetched = repo.fetch_progress(row).await.unwrap().expect("row");
        assert_eq!(fetched.current_progress, Progress::clamped(10));
    }

    #[tokio::test]
    async fn dropping_subscription_releases_receiver() {
        let repo = InMemoryRepository::new();
        let sub = repo
            .subscribe(ChangeFilter::progress_updates(ProgressRowId::DEFAULT))
            .await
            .unwrap();
        assert_eq!(repo.subscriber_count(), 1);
        drop(sub);
        assert_eq!(repo.subscriber_count(), 0);
    }

    #[test]
    fn record_deserializes_with_clamping() {
        let record: ProgressRecord = serde_json::from_str(
            r#"{"id":"a45e94bf-2558-485f-91da-80376e4087f6","current_progress":120}"#,
        )
        .unwrap();
        assert_eq!(record.id, ProgressRowId::DEFAULT);
        assert_eq!(record.current_progress, Progress::COMPLETE);
        assert_eq!(record.updated_at, None);
    }

    #[test]
    fn fractional_record_matches_pushed_payload() {
        let body = r#"{"id":"a45e94bf-2558-485f-91da-80376e4087f6","current_progress":41.6}"#;
        let record: ProgressRecord = serde_json::from_str(body).unwrap();
        let pushed = crate::feed::extract_progress(&serde_json::from_str(body).unwrap());
        assert_eq!(record.current_progress, Progress::clamped(42));
        assert_eq!(Some(record.current_progress), pushed);
    }
}
