mod admin_vm;
mod progress_vm;

pub use admin_vm::{AdminPreviewVm, QuickSetVm, map_admin_preview, map_quick_sets, parse_draft};
pub use progress_vm::{MilestoneRowVm, ProgressVm, map_progress};
