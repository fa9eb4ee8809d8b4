//! PostgREST-compatible remote store.
//!
//! Reads and writes go through the `/rest/v1/progress` endpoint filtered by
//! row id. The change feed polls the row and emits an update event whenever
//! the fetched record differs from the previous one.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde_json::json;
use status_core::model::{Progress, ProgressRowId};

use crate::feed::{ChangeFilter, ChangeSubscription, PROGRESS_FIELD, PROGRESS_TABLE, poll_row};
use crate::repository::{ProgressRecord, ProgressRepository, Storage, StorageError};

const SELECT_COLUMNS: &str = "id,current_progress,updated_at";

#[derive(Clone, Debug)]
pub struct RestConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub poll_interval: Duration,
}

#[derive(Clone)]
pub struct RestRepository {
    client: Client,
    config: RestConfig,
}

impl RestRepository {
    #[must_use]
    pub fn new(config: RestConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{PROGRESS_TABLE}",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.config.api_key.as_deref() {
            Some(key) => request.header("apikey", key).bearer_auth(key),
            None => request,
        }
    }

    async fn send_for_rows(
        &self,
        request: RequestBuilder,
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(|err| StorageError::Connection(err.to_string()))?;

        if !response.status().is_success() {
            return Err(StorageError::Http(response.status().as_u16()));
        }

        response
            .json::<Vec<ProgressRecord>>()
            .await
            .map_err(|err| StorageError::Serialization(err.to_string()))
    }
}

fn row_filter(row_id: ProgressRowId) -> [(&'static str, String); 2] {
    [
        ("id", format!("eq.{row_id}")),
        ("select", SELECT_COLUMNS.to_string()),
    ]
}

#[async_trait]
impl ProgressRepository for RestRepository {
    async fn fetch_progress(
        &self,
        row_id: ProgressRowId,
    ) -> Result<Option<ProgressRecord>, StorageError> {
        let request = self.client.get(self.table_url()).query(&row_filter(row_id));
        let rows = self.send_for_rows(request).await?;
        Ok(rows.into_iter().next())
    }

    async fn update_progress(
        &self,
        row_id: ProgressRowId,
        progress: Progress,
    ) -> Result<(), StorageError> {
        let request = self
            .client
            .patch(self.table_url())
            .query(&row_filter(row_id))
            .header("Prefer", "return=representation")
            .json(&json!({ PROGRESS_FIELD: progress.value() }));
        let rows = self.send_for_rows(request).await?;
        if rows.is_empty() {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn subscribe(&self, filter: ChangeFilter) -> Result<ChangeSubscription, StorageError> {
        Ok(poll_row(
            self.clone(),
            filter,
            self.config.poll_interval,
            None,
        ))
    }
}

impl Storage {
    /// Build a `Storage` backed by a PostgREST endpoint.
    #[must_use]
    pub fn rest(config: RestConfig) -> Self {
        Self::from_repository(RestRepository::new(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(base_url: &str) -> RestRepository {
        RestRepository::new(RestConfig {
            base_url: base_url.into(),
            api_key: None,
            poll_interval: Duration::from_secs(1),
        })
    }

    #[test]
    fn table_url_ignores_trailing_slash() {
        assert_eq!(
            repo("https://demo.supabase.co/").table_url(),
            "https://demo.supabase.co/rest/v1/progress"
        );
    }

    #[test]
    fn row_filter_targets_single_row() {
        let [id, select] = row_filter(ProgressRowId::DEFAULT);
        assert_eq!(id, ("id", "eq.a45e94bf-2558-485f-91da-80376e4087f6".to_string()));
        assert_eq!(select.1, SELECT_COLUMNS);
    }

    #[tokio::test]
    async fn unreachable_store_reports_connection_error() {
        let err = repo("http://127.0.0.1:9")
            .fetch_progress(ProgressRowId::DEFAULT)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Connection(_)));
    }
}
