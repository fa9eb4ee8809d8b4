//! The single authoritative progress value and its remote mirror.
//!
//! `ProgressSynchronizer` owns one progress cell with two writers: local
//! `set_progress` calls and pushes from the remote change feed. Every applied
//! value is announced to registered observers.
//!
//! Local writes are optimistic. The cell and observers are updated before the
//! remote write is attempted, and a failed remote write is logged but never
//! rolled back: the operator keeps seeing the value they asked for, and the
//! next push from the store is the only correction path. This is intended.
//! Concurrent writers are last-write-wins.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use status_core::model::{Milestone, MilestoneTable, Progress, ProgressRowId};
use storage::feed::PROGRESS_TABLE;
use storage::{
    ChangeEvent, ChangeFilter, ChangeKind, ChangeSubscription, ProgressRepository,
    extract_progress,
};
use tokio::task::JoinHandle;

use crate::observers::{ObserverGuard, ObserverRegistry};

/// What happened to a `set_progress` call after its local update.
///
/// Informational only: the local value is never rolled back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The remote row now holds this value.
    Persisted(Progress),
    /// The remote write failed; the local value stays.
    PersistFailed(Progress),
    /// The synchronizer was already shut down; nothing was applied or sent.
    Detached,
}

/// Cheap-to-clone handle to the shared progress state.
#[derive(Clone)]
pub struct ProgressSynchronizer {
    inner: Arc<SyncInner>,
}

struct SyncInner {
    repo: Arc<dyn ProgressRepository>,
    row_id: ProgressRowId,
    milestones: Arc<MilestoneTable>,
    value: AtomicU8,
    observers: Arc<ObserverRegistry>,
    /// Created by `new` rather than injected; cleared on shutdown.
    owns_observers: bool,
    torn_down: AtomicBool,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl ProgressSynchronizer {
    /// A synchronizer at 0% with its own observer registry. Call `start` to
    /// load the remote value and begin listening for changes.
    #[must_use]
    pub fn new(
        repo: Arc<dyn ProgressRepository>,
        row_id: ProgressRowId,
        milestones: MilestoneTable,
    ) -> Self {
        Self::build(repo, row_id, milestones, ObserverRegistry::new(), true)
    }

    /// Like `new`, but notifying through a registry owned by the caller.
    /// `shutdown` leaves that registry's observers in place.
    #[must_use]
    pub fn with_registry(
        repo: Arc<dyn ProgressRepository>,
        row_id: ProgressRowId,
        milestones: MilestoneTable,
        observers: Arc<ObserverRegistry>,
    ) -> Self {
        Self::build(repo, row_id, milestones, observers, false)
    }

    fn build(
        repo: Arc<dyn ProgressRepository>,
        row_id: ProgressRowId,
        milestones: MilestoneTable,
        observers: Arc<ObserverRegistry>,
        owns_observers: bool,
    ) -> Self {
        Self {
            inner: Arc::new(SyncInner {
                repo,
                row_id,
                milestones: Arc::new(milestones),
                value: AtomicU8::new(Progress::ZERO.value()),
                observers,
                owns_observers,
                torn_down: AtomicBool::new(false),
                listener: Mutex::new(None),
            }),
        }
    }

    /// Fetch the current remote value, then open the change feed.
    ///
    /// Failures are logged and leave the synchronizer usable: a failed fetch
    /// keeps the current value, a failed subscription means no live updates.
    pub async fn start(&self) {
        let inner = &self.inner;
        match inner.repo.fetch_progress(inner.row_id).await {
            Ok(Some(record)) => {
                if inner.apply(record.current_progress) {
                    tracing::info!(
                        row_id = %inner.row_id,
                        progress = record.current_progress.value(),
                        "loaded progress"
                    );
                }
            }
            Ok(None) => {
                tracing::warn!(row_id = %inner.row_id, "progress row not found; keeping default");
            }
            Err(err) => {
                tracing::warn!(row_id = %inner.row_id, error = %err, "failed to fetch progress");
            }
        }

        if inner.is_torn_down() {
            return;
        }

        match inner
            .repo
            .subscribe(ChangeFilter::progress_updates(inner.row_id))
            .await
        {
            Ok(subscription) => self.listen(subscription),
            Err(err) => {
                tracing::warn!(
                    row_id = %inner.row_id,
                    error = %err,
                    "failed to subscribe to progress changes"
                );
            }
        }
    }

    fn listen(&self, mut subscription: ChangeSubscription) {
        let mut slot = self.inner.listener_slot();
        if self.inner.is_torn_down() {
            // Dropping the subscription here releases it.
            return;
        }

        let weak: Weak<SyncInner> = Arc::downgrade(&self.inner);
        let task = tokio::spawn(async move {
            while let Some(event) = subscription.next().await {
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                inner.apply_remote(&event);
            }
            tracing::debug!("progress change feed closed");
        });

        if let Some(previous) = slot.replace(task) {
            previous.abort();
        }
    }

    /// Last known value. Never blocks.
    #[must_use]
    pub fn current_value(&self) -> Progress {
        self.inner.current()
    }

    #[must_use]
    pub fn current_milestone(&self) -> Milestone {
        self.inner.milestones.resolve(self.current_value()).clone()
    }

    #[must_use]
    pub fn milestones(&self) -> Arc<MilestoneTable> {
        Arc::clone(&self.inner.milestones)
    }

    #[must_use]
    pub fn row_id(&self) -> ProgressRowId {
        self.inner.row_id
    }

    /// Register `observer` for every subsequently applied value.
    ///
    /// The observer is not called for the current value.
    pub fn subscribe(&self, observer: impl Fn(Progress) + Send + Sync + 'static) -> ObserverGuard {
        self.inner.observers.register(observer)
    }

    /// Clamp `requested`, apply it locally, and notify observers, all before
    /// returning. The returned future performs the remote write.
    ///
    /// A caller's next `current_value` reflects the write immediately, whether
    /// or not the future is ever awaited.
    pub fn set_progress(
        &self,
        requested: i64,
    ) -> impl Future<Output = WriteOutcome> + Send + 'static {
        let progress = Progress::clamped(requested);
        let applied = self.inner.apply(progress);
        let inner = Arc::clone(&self.inner);

        async move {
            if !applied {
                tracing::debug!(progress = progress.value(), "ignoring write after shutdown");
                return WriteOutcome::Detached;
            }
            match inner.repo.update_progress(inner.row_id, progress).await {
                Ok(()) => {
                    tracing::info!(row_id = %inner.row_id, progress = progress.value(), "progress saved");
                    WriteOutcome::Persisted(progress)
                }
                Err(err) => {
                    tracing::warn!(
                        row_id = %inner.row_id,
                        progress = progress.value(),
                        error = %err,
                        "failed to persist progress; keeping local value"
                    );
                    WriteOutcome::PersistFailed(progress)
                }
            }
        }
    }

    /// Apply a change-feed event. Returns `true` if the value was updated.
    ///
    /// Events for another table, row, or kind and payloads without a numeric
    /// progress field are ignored.
    pub fn apply_remote(&self, event: &ChangeEvent) -> bool {
        self.inner.apply_remote(event)
    }

    /// True while a change-feed listener is running.
    #[must_use]
    pub fn is_listening(&self) -> bool {
        self.inner
            .listener_slot()
            .as_ref()
            .is_some_and(|task| !task.is_finished())
    }

    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.inner.is_torn_down()
    }

    /// Release the change feed, clear observers of an owned registry, and
    /// stop applying values.
    ///
    /// Later writes, pushes, and in-flight fetches become no-ops. Idempotent.
    pub fn shutdown(&self) {
        if self.inner.torn_down.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(task) = self.inner.listener_slot().take() {
            task.abort();
        }
        if self.inner.owns_observers {
            self.inner.observers.clear();
        }
        tracing::info!(row_id = %self.inner.row_id, "progress synchronizer shut down");
    }
}

impl SyncInner {
    fn current(&self) -> Progress {
        Progress::clamped(i64::from(self.value.load(Ordering::Acquire)))
    }

    fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    fn listener_slot(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the value and notify. No-op after shutdown.
    fn apply(&self, progress: Progress) -> bool {
        if self.is_torn_down() {
            return false;
        }
        self.value.store(progress.value(), Ordering::Release);
        self.observers.notify(progress);
        true
    }

    fn apply_remote(&self, event: &ChangeEvent) -> bool {
        if event.table != PROGRESS_TABLE
            || event.row_id != self.row_id
            || event.kind != ChangeKind::Update
        {
            tracing::debug!(
                table = %event.table,
                row_id = %event.row_id,
                kind = ?event.kind,
                "ignoring out-of-scope change event"
            );
            return false;
        }

        match extract_progress(&event.new_record) {
            Some(progress) => self.apply(progress),
            None => {
                tracing::debug!(
                    payload = %event.new_record,
                    "ignoring malformed progress notification"
                );
                false
            }
        }
    }
}

impl Drop for SyncInner {
    fn drop(&mut self) {
        let slot = self
            .listener
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = slot.take() {
            task.abort();
        }
    }
}
