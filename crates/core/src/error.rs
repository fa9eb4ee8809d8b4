use thiserror::Error;

use crate::model::{MilestoneError, SettingsError};

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Milestones(#[from] MilestoneError),
    #[error(transparent)]
    Settings(#[from] SettingsError),
}
