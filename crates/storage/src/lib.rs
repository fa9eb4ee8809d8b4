#![forbid(unsafe_code)]

pub mod feed;
pub mod repository;
pub mod rest;
pub mod sqlite;

pub use feed::{ChangeEvent, ChangeFilter, ChangeKind, ChangeSubscription, extract_progress};
pub use repository::{InMemoryRepository, ProgressRecord, ProgressRepository, Storage, StorageError};
