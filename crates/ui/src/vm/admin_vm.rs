use status_core::model::{MilestoneTable, Progress};

/// How the draft value will look to clients once saved.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminPreviewVm {
    pub percent: u8,
    pub bar_style: String,
    pub phase_name: String,
}

#[must_use]
pub fn map_admin_preview(table: &MilestoneTable, draft: Progress) -> AdminPreviewVm {
    AdminPreviewVm {
        percent: draft.value(),
        bar_style: format!("width: {}%;", draft.value()),
        phase_name: table.resolve(draft).name().to_owned(),
    }
}

/// A button that jumps the draft to a milestone's threshold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuickSetVm {
    pub id: String,
    pub name: String,
    pub threshold: u8,
    pub selected: bool,
}

#[must_use]
pub fn map_quick_sets(table: &MilestoneTable, draft: Progress) -> Vec<QuickSetVm> {
    table
        .iter()
        .map(|milestone| QuickSetVm {
            id: milestone.id().to_owned(),
            name: milestone.name().to_owned(),
            threshold: milestone.threshold(),
            selected: milestone.threshold() == draft.value(),
        })
        .collect()
}

/// Parse a slider/number input; anything unparsable counts as 0.
#[must_use]
pub fn parse_draft(raw: &str) -> Progress {
    raw.trim()
        .parse::<i64>()
        .map_or(Progress::ZERO, Progress::clamped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_uses_tightest_milestone() {
        let table = MilestoneTable::standard();
        assert_eq!(
            map_admin_preview(&table, Progress::clamped(86)).phase_name,
            "Development"
        );
        assert_eq!(
            map_admin_preview(&table, Progress::clamped(5)).phase_name,
            "Project Planning"
        );
    }

    #[test]
    fn quick_sets_mark_matching_threshold() {
        let quick = map_quick_sets(&MilestoneTable::standard(), Progress::clamped(20));
        let selected: Vec<_> = quick.iter().filter(|q| q.selected).map(|q| q.id.as_str()).collect();
        assert_eq!(selected, vec!["designing"]);
    }

    #[test]
    fn parse_draft_clamps_and_defaults() {
        assert_eq!(parse_draft("42"), Progress::clamped(42));
        assert_eq!(parse_draft(" 250 "), Progress::COMPLETE);
        assert_eq!(parse_draft("-3"), Progress::ZERO);
        assert_eq!(parse_draft(""), Progress::ZERO);
        assert_eq!(parse_draft("abc"), Progress::ZERO);
    }
}
