use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use super::Progress;

/// A named project phase that becomes current once progress reaches `threshold`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    id: String,
    name: String,
    description: String,
    threshold: u8,
}

impl Milestone {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        threshold: u8,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            threshold,
        }
    }

    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// True once `progress` has reached this milestone's threshold.
    #[must_use]
    pub fn is_reached(&self, progress: Progress) -> bool {
        progress.value() >= self.threshold
    }
}

/// Configuration defects in a milestone table.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum MilestoneError {
    #[error("milestone table is empty")]
    Empty,
    #[error("first milestone must start at 0%, found {0}%")]
    FirstThresholdNotZero(u8),
    #[error("milestone {id} has threshold {threshold}% above 100%")]
    ThresholdOutOfRange { id: String, threshold: u8 },
    #[error("milestone {id} threshold {threshold}% is below the previous {previous}%")]
    ThresholdsDecreasing {
        id: String,
        threshold: u8,
        previous: u8,
    },
    #[error("duplicate milestone id: {0}")]
    DuplicateId(String),
}

/// Where a milestone sits relative to the current progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MilestoneStatus {
    Completed,
    Current,
    Upcoming,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimelineEntry<'a> {
    pub milestone: &'a Milestone,
    pub status: MilestoneStatus,
}

/// Ordered, validated list of project phases.
///
/// Order is display order. Thresholds never decrease and the first one is 0,
/// so every progress value resolves to some milestone.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MilestoneTable {
    milestones: Vec<Milestone>,
}

impl MilestoneTable {
    /// Validate and wrap an ordered milestone list.
    ///
    /// # Errors
    ///
    /// Returns `MilestoneError` if the list is empty, does not start at 0%,
    /// has a threshold above 100%, has decreasing thresholds, or repeats an id.
    pub fn new(milestones: Vec<Milestone>) -> Result<Self, MilestoneError> {
        validate_order(&milestones)?;
        Ok(Self { milestones })
    }

    /// The production phase list.
    ///
    /// # Panics
    ///
    /// Panics if the built-in table violates the ordering invariant, which is
    /// a defect in this file rather than a runtime condition.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(vec![
            Milestone::new(
                "planning",
                "Project Planning",
                "Defining objectives, scope, and strategy for project execution",
                0,
            ),
            Milestone::new(
                "preparation",
                "Preparation",
                "Organizing resources, infrastructure, and necessary tools",
                10,
            ),
            Milestone::new(
                "designing",
                "Designing",
                "Creating and finalizing design layouts for application portals",
                20,
            ),
            Milestone::new(
                "development",
                "Development",
                "Implementing core features and functionalities of web portals",
                85,
            ),
            Milestone::new(
                "testing",
                "Testing",
                "Conducting quality assurance and performance validation",
                90,
            ),
            Milestone::new(
                "delivery",
                "Final Delivery",
                "Deploying and handing over production-ready applications",
                100,
            ),
        ])
        .expect("standard milestone table should be valid")
    }

    /// The last milestone whose threshold is at or below `progress`.
    ///
    /// Falls back to the first milestone when nothing qualifies.
    #[must_use]
    pub fn resolve(&self, progress: Progress) -> &Milestone {
        self.milestones
            .iter()
            .rev()
            .find(|milestone| milestone.is_reached(progress))
            .unwrap_or_else(|| self.first())
    }

    /// Every milestone tagged as completed, current, or upcoming for `progress`.
    #[must_use]
    pub fn timeline(&self, progress: Progress) -> Vec<TimelineEntry<'_>> {
        let current = self.resolve(progress);
        self.milestones
            .iter()
            .map(|milestone| {
                let status = if milestone.id == current.id {
                    MilestoneStatus::Current
                } else if milestone.is_reached(progress) {
                    MilestoneStatus::Completed
                } else {
                    MilestoneStatus::Upcoming
                };
                TimelineEntry { milestone, status }
            })
            .collect()
    }

    #[must_use]
    pub fn first(&self) -> &Milestone {
        // Non-empty by construction.
        &self.milestones[0]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Milestone> {
        self.milestones.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.milestones.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.milestones.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Milestone> {
        self.milestones.iter().find(|milestone| milestone.id == id)
    }
}

impl Default for MilestoneTable {
    fn default() -> Self {
        Self::standard()
    }
}

fn validate_order(milestones: &[Milestone]) -> Result<(), MilestoneError> {
    let first = milestones.first().ok_or(MilestoneError::Empty)?;
    if first.threshold != 0 {
        return Err(MilestoneError::FirstThresholdNotZero(first.threshold));
    }

    let mut seen = HashSet::with_capacity(milestones.len());
    let mut previous = 0;
    for milestone in milestones {
        if milestone.threshold > 100 {
            return Err(MilestoneError::ThresholdOutOfRange {
                id: milestone.id.clone(),
                threshold: milestone.threshold,
            });
        }
        if milestone.threshold < previous {
            return Err(MilestoneError::ThresholdsDecreasing {
                id: milestone.id.clone(),
                threshold: milestone.threshold,
                previous,
            });
        }
        if !seen.insert(milestone.id.as_str()) {
            return Err(MilestoneError::DuplicateId(milestone.id.clone()));
        }
        previous = milestone.threshold;
    }
    Ok(())
}
