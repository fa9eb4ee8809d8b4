use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use status_core::model::{Progress, ProgressRowId};

use crate::repository::{ProgressRecord, StorageError};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<ProgressRecord, StorageError> {
    let id: String = row.try_get("id").map_err(ser)?;
    let id: ProgressRowId = id.parse().map_err(ser)?;
    let current_progress: i64 = row.try_get("current_progress").map_err(ser)?;
    let updated_at = row.try_get("updated_at").map_err(ser)?;

    Ok(ProgressRecord {
        id,
        current_progress: Progress::clamped(current_progress),
        updated_at,
    })
}
