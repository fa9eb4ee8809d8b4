use std::time::Duration;

use thiserror::Error;
use url::Url;

use super::ProgressRowId;

/// Store URL used when nothing is configured.
pub const DEFAULT_STORE_URL: &str = "sqlite://status.sqlite3";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
pub const MIN_POLL_INTERVAL_MS: u64 = 100;

/// Where the progress row lives.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Backend {
    /// PostgREST-compatible HTTP endpoint.
    Rest { base_url: String },
    Sqlite { url: String },
}

/// Validated runtime configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusSettings {
    row_id: ProgressRowId,
    backend: Backend,
    api_key: Option<String>,
    admin_secret: Option<String>,
    poll_interval: Duration,
}

/// Raw configuration as collected from flags and environment.
#[derive(Clone, Debug, Default)]
pub struct StatusSettingsDraft {
    pub row_id: Option<String>,
    pub store_url: Option<String>,
    pub api_key: Option<String>,
    pub admin_secret: Option<String>,
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("invalid progress row id: {0}")]
    InvalidRowId(String),
    #[error("invalid store URL: {0}")]
    InvalidStoreUrl(String),
    #[error("unsupported store URL scheme: {0}")]
    UnsupportedScheme(String),
    #[error("poll interval must be at least {MIN_POLL_INTERVAL_MS}ms, got {0}ms")]
    PollIntervalTooShort(u64),
}

impl StatusSettingsDraft {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and normalize the draft.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if the row id is not a UUID, the store URL does
    /// not parse or uses an unknown scheme, or the poll interval is too short.
    pub fn validate(self) -> Result<StatusSettings, SettingsError> {
        let row_id = match normalize_optional(self.row_id) {
            Some(raw) => raw
                .parse::<ProgressRowId>()
                .map_err(|_| SettingsError::InvalidRowId(raw))?,
            None => ProgressRowId::DEFAULT,
        };

        let store_url =
            normalize_optional(self.store_url).unwrap_or_else(|| DEFAULT_STORE_URL.to_string());
        let backend = backend_for(&store_url)?;

        let poll_interval_ms = self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS);
        if poll_interval_ms < MIN_POLL_INTERVAL_MS {
            return Err(SettingsError::PollIntervalTooShort(poll_interval_ms));
        }

        Ok(StatusSettings {
            row_id,
            backend,
            api_key: normalize_optional(self.api_key),
            admin_secret: normalize_optional(self.admin_secret),
            poll_interval: Duration::from_millis(poll_interval_ms),
        })
    }
}

impl StatusSettings {
    #[must_use]
    pub fn row_id(&self) -> ProgressRowId {
        self.row_id
    }

    #[must_use]
    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    #[must_use]
    pub fn admin_secret(&self) -> Option<&str> {
        self.admin_secret.as_deref()
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for StatusSettings {
    fn default() -> Self {
        Self {
            row_id: ProgressRowId::DEFAULT,
            backend: Backend::Sqlite {
                url: DEFAULT_STORE_URL.to_string(),
            },
            api_key: None,
            admin_secret: None,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

fn backend_for(raw: &str) -> Result<Backend, SettingsError> {
    if raw.starts_with("sqlite:") {
        return Ok(Backend::Sqlite {
            url: raw.to_string(),
        });
    }

    let url = Url::parse(raw).map_err(|_| SettingsError::InvalidStoreUrl(raw.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(Backend::Rest {
            base_url: raw.trim_end_matches('/').to_string(),
        }),
        other => Err(SettingsError::UnsupportedScheme(other.to_string())),
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_draft_uses_defaults() {
        let settings = StatusSettingsDraft::new().validate().unwrap();
        assert_eq!(settings, StatusSettings::default());
    }

    #[test]
    fn blank_values_are_treated_as_missing() {
        let settings = StatusSettingsDraft {
            api_key: Some("   ".into()),
            admin_secret: Some(" hunter2 ".into()),
            ..StatusSettingsDraft::default()
        }
        .validate()
        .unwrap();
        assert_eq!(settings.api_key(), None);
        assert_eq!(settings.admin_secret(), Some("hunter2"));
    }

    #[test]
    fn http_url_selects_rest_backend() {
        let settings = StatusSettingsDraft {
            store_url: Some("https://example.supabase.co/".into()),
            ..StatusSettingsDraft::default()
        }
        .validate()
        .unwrap();
        assert_eq!(
            settings.backend(),
            &Backend::Rest {
                base_url: "https://example.supabase.co".into()
            }
        );
    }

    #[test]
    fn rejects_bad_values() {
        let bad_row = StatusSettingsDraft {
            row_id: Some("nope".into()),
            ..StatusSettingsDraft::default()
        };
        assert_eq!(
            bad_row.validate(),
            Err(SettingsError::InvalidRowId("nope".into()))
        );

        let bad_scheme = StatusSettingsDraft {
            store_url: Some("ftp://example.com".into()),
            ..StatusSettingsDraft::default()
        };
        assert_eq!(
            bad_scheme.validate(),
            Err(SettingsError::UnsupportedScheme("ftp".into()))
        );

        let fast_poll = StatusSettingsDraft {
            poll_interval_ms: Some(5),
            ..StatusSettingsDraft::default()
        };
        assert_eq!(
            fast_poll.validate(),
            Err(SettingsError::PollIntervalTooShort(5))
        );
    }
}
