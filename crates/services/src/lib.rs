#![forbid(unsafe_code)]

pub mod admin;
pub mod app_services;
pub mod error;
pub mod observers;
pub mod progress_sync;

pub use status_core::Clock;

pub use admin::AdminGate;
pub use app_services::AppServices;
pub use error::{AdminAuthError, AppServicesError};
pub use observers::{ObserverGuard, ObserverId, ObserverRegistry};
pub use progress_sync::{ProgressSynchronizer, WriteOutcome};
