use std::sync::Arc;

use status_core::model::{Backend, MilestoneTable, StatusSettings};
use storage::Storage;
use storage::rest::RestConfig;

use crate::Clock;
use crate::admin::AdminGate;
use crate::error::AppServicesError;
use crate::progress_sync::ProgressSynchronizer;

/// Assembles app-facing services from validated settings.
#[derive(Clone)]
pub struct AppServices {
    progress: ProgressSynchronizer,
    admin: Arc<AdminGate>,
}

impl AppServices {
    /// Open the configured backend and start the synchronizer.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if the `SQLite` store cannot be opened or
    /// migrated. Remote read and subscription failures are only logged.
    pub async fn from_settings(
        settings: &StatusSettings,
        clock: Clock,
    ) -> Result<Self, AppServicesError> {
        let storage = match settings.backend() {
            Backend::Sqlite { url } => {
                Storage::sqlite(url, clock, settings.row_id(), settings.poll_interval()).await?
            }
            Backend::Rest { base_url } => Storage::rest(RestConfig {
                base_url: base_url.clone(),
                api_key: settings.api_key().map(ToString::to_string),
                poll_interval: settings.poll_interval(),
            }),
        };
        Ok(Self::from_storage(&storage, settings).await)
    }

    /// Build services over an existing storage handle and start syncing.
    pub async fn from_storage(storage: &Storage, settings: &StatusSettings) -> Self {
        let progress = ProgressSynchronizer::new(
            Arc::clone(&storage.progress),
            settings.row_id(),
            MilestoneTable::standard(),
        );
        progress.start().await;

        Self {
            progress,
            admin: Arc::new(AdminGate::new(settings.admin_secret())),
        }
    }

    #[must_use]
    pub fn progress(&self) -> ProgressSynchronizer {
        self.progress.clone()
    }

    #[must_use]
    pub fn admin(&self) -> Arc<AdminGate> {
        Arc::clone(&self.admin)
    }

    /// Release the change feed.
    pub fn shutdown(&self) {
        self.progress.shutdown();
    }
}
