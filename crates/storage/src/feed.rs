//! Push-change feed for the progress row.
//!
//! A `ChangeSubscription` is scoped by a `ChangeFilter` (table, row, event
//! kind) and yields the post-change record exactly as the backend delivered
//! it. Payloads stay as raw JSON so the consumer decides what counts as
//! well-formed. Dropping the subscription releases whatever keeps it alive:
//! a broadcast receiver or a polling task.
//!
//! Backends that other processes can write to are polled with
//! [`poll_row`], so a change made anywhere reaches every subscriber.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use status_core::model::{Progress, ProgressRowId};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::repository::{ProgressRecord, ProgressRepository};

const POLL_FEED_CAPACITY: usize = 16;

pub const PROGRESS_TABLE: &str = "progress";
pub const PROGRESS_FIELD: &str = "current_progress";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// One change notification as delivered by a backend.
#[derive(Clone, Debug, PartialEq)]
pub struct ChangeEvent {
    pub table: String,
    pub row_id: ProgressRowId,
    pub kind: ChangeKind,
    pub new_record: Value,
}

impl ChangeEvent {
    /// An update event on the progress table carrying an arbitrary payload.
    #[must_use]
    pub fn update(row_id: ProgressRowId, new_record: Value) -> Self {
        Self {
            table: PROGRESS_TABLE.to_string(),
            row_id,
            kind: ChangeKind::Update,
            new_record,
        }
    }

    /// The update event a backend emits after persisting `record`.
    #[must_use]
    pub fn for_record(record: &ProgressRecord) -> Self {
        Self::update(
            record.id,
            json!({
                "id": record.id.to_string(),
                PROGRESS_FIELD: record.current_progress.value(),
                "updated_at": record.updated_at.map(|at| at.to_rfc3339()),
            }),
        )
    }
}

/// Scope of a subscription.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangeFilter {
    pub table: String,
    pub row_id: ProgressRowId,
    pub kind: ChangeKind,
}

impl ChangeFilter {
    /// Update events for one row of the progress table.
    #[must_use]
    pub fn progress_updates(row_id: ProgressRowId) -> Self {
        Self {
            table: PROGRESS_TABLE.to_string(),
            row_id,
            kind: ChangeKind::Update,
        }
    }

    #[must_use]
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        event.table == self.table && event.row_id == self.row_id && event.kind == self.kind
    }
}

enum Source {
    Broadcast(broadcast::Receiver<ChangeEvent>),
    Poller {
        events: mpsc::Receiver<ChangeEvent>,
        task: JoinHandle<()>,
    },
}

/// A live, cancellable stream of change events matching one filter.
pub struct ChangeSubscription {
    filter: ChangeFilter,
    source: Source,
}

impl ChangeSubscription {
    /// Wrap a broadcast receiver; events outside `filter` are skipped.
    #[must_use]
    pub fn from_broadcast(filter: ChangeFilter, receiver: broadcast::Receiver<ChangeEvent>) -> Self {
        Self {
            filter,
            source: Source::Broadcast(receiver),
        }
    }

    /// Wrap a channel fed by a background task. The task is aborted when the
    /// subscription goes away.
    #[must_use]
    pub fn from_poller(
        filter: ChangeFilter,
        events: mpsc::Receiver<ChangeEvent>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            filter,
            source: Source::Poller { events, task },
        }
    }

    #[must_use]
    pub fn filter(&self) -> &ChangeFilter {
        &self.filter
    }

    /// Wait for the next matching event. `None` once the feed is closed.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        loop {
            let event = match &mut self.source {
                Source::Broadcast(receiver) => match receiver.recv().await {
                    Ok(event) => event,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "change feed lagged; dropped events");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => return None,
                },
                Source::Poller { events, .. } => events.recv().await?,
            };

            if self.filter.matches(&event) {
                return Some(event);
            }
        }
    }

    /// Release the subscription now.
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for ChangeSubscription {
    fn drop(&mut self) {
        if let Source::Poller { task, .. } = &self.source {
            task.abort();
        }
    }
}

/// Follow one row by re-fetching it every `period` and emitting an update
/// whenever the fetched record differs from the last one seen.
///
/// `local` carries events for writes made in this process; they are
/// forwarded as soon as they arrive and count as seen, so the next poll does
/// not report them again.
pub(crate) fn poll_row<R>(
    repo: R,
    filter: ChangeFilter,
    period: Duration,
    mut local: Option<broadcast::Receiver<ChangeEvent>>,
) -> ChangeSubscription
where
    R: ProgressRepository + Clone + 'static,
{
    let (tx, rx) = mpsc::channel(POLL_FEED_CAPACITY);
    let row_id = filter.row_id;

    let task = tokio::spawn(async move {
        let mut last = repo.fetch_progress(row_id).await.ok().flatten();
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                event = recv_local(&mut local) => {
                    let Some(event) = event else {
                        local = None;
                        continue;
                    };
                    if event.row_id == row_id {
                        if let Ok(record) = serde_json::from_value(event.new_record.clone()) {
                            last = Some(record);
                        }
                    }
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
                _ = ticker.tick() => match repo.fetch_progress(row_id).await {
                    Ok(Some(record)) if last.as_ref() != Some(&record) => {
                        let event = ChangeEvent::for_record(&record);
                        last = Some(record);
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Ok(Some(_)) => {}
                    Ok(None) => tracing::debug!(%row_id, "polled progress row is missing"),
                    Err(err) => tracing::warn!(%row_id, error = %err, "progress poll failed"),
                },
            }
        }
    });

    ChangeSubscription::from_poller(filter, rx, task)
}

/// Next in-process event; pends forever once there is no local feed.
async fn recv_local(local: &mut Option<broadcast::Receiver<ChangeEvent>>) -> Option<ChangeEvent> {
    let Some(receiver) = local.as_mut() else {
        return std::future::pending().await;
    };
    loop {
        match receiver.recv().await {
            Ok(event) => return Some(event),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "local change feed lagged; dropped events");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

/// Read the progress field out of a delivered record.
///
/// Integers are clamped; finite floats are rounded first. Missing, null,
/// non-numeric, or non-finite values yield `None`.
#[must_use]
pub fn extract_progress(record: &Value) -> Option<Progress> {
    let field = record.get(PROGRESS_FIELD)?;
    if let Some(raw) = field.as_i64() {
        return Some(Progress::clamped(raw));
    }
    field.as_f64().and_then(Progress::rounded)
}
