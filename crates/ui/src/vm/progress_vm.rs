use status_core::model::{Milestone, MilestoneStatus, MilestoneTable, Progress};

/// One row of the client-facing timeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MilestoneRowVm {
    pub id: String,
    pub name: String,
    pub description: String,
    pub threshold_label: String,
    pub status: MilestoneStatus,
}

impl MilestoneRowVm {
    #[must_use]
    pub fn new(milestone: &Milestone, status: MilestoneStatus) -> Self {
        Self {
            id: milestone.id().to_owned(),
            name: milestone.name().to_owned(),
            description: milestone.description().to_owned(),
            threshold_label: format!("{}%", milestone.threshold()),
            status,
        }
    }

    #[must_use]
    pub fn row_class(&self) -> &'static str {
        match self.status {
            MilestoneStatus::Current => "milestone milestone--current",
            MilestoneStatus::Completed => "milestone milestone--completed",
            MilestoneStatus::Upcoming => "milestone",
        }
    }

    /// Current counts as reached: its threshold is at or below the value.
    #[must_use]
    pub fn is_reached(&self) -> bool {
        !matches!(self.status, MilestoneStatus::Upcoming)
    }
}

/// Everything the client status page renders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProgressVm {
    pub percent: u8,
    pub bar_style: String,
    pub current: MilestoneRowVm,
    pub timeline: Vec<MilestoneRowVm>,
}

#[must_use]
pub fn map_progress(table: &MilestoneTable, progress: Progress) -> ProgressVm {
    let current = MilestoneRowVm::new(table.resolve(progress), MilestoneStatus::Current);
    let timeline = table
        .timeline(progress)
        .into_iter()
        .map(|entry| MilestoneRowVm::new(entry.milestone, entry.status))
        .collect();

    ProgressVm {
        percent: progress.value(),
        bar_style: format!("width: {}%;", progress.value()),
        current,
        timeline,
    }
}
