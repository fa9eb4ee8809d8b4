mod ids;
mod milestone;
mod progress;
mod settings;

pub use ids::{ParseRowIdError, ProgressRowId};
pub use milestone::{Milestone, MilestoneError, MilestoneStatus, MilestoneTable, TimelineEntry};
pub use progress::{NonFiniteProgress, Progress};
pub use settings::{Backend, SettingsError, StatusSettings, StatusSettingsDraft};
