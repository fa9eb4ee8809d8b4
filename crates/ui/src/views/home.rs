use dioxus::prelude::*;
use status_core::model::MilestoneStatus;

use crate::context::AppContext;
use crate::views::use_live_progress;
use crate::vm::{MilestoneRowVm, map_progress};

#[component]
pub fn HomeView() -> Element {
    let ctx = use_context::<AppContext>();
    let sync = ctx.progress();
    let milestones = sync.milestones();
    let progress = use_live_progress(sync);
    let vm = map_progress(&milestones, *progress.read());

    rsx! {
        div { class: "page",
            section { class: "hero",
                h1 { "Your Project is in Progress" }
                p { "Track the real-time progress of your project. We keep you updated every step of the way." }
            }

            section { class: "progress-summary",
                h2 { "Project Progress" }
                div { class: "progress-figure", "{vm.percent}%" }
                p { class: "muted", "Complete" }
            }

            div { class: "progress-bar",
                div { class: "progress-bar-fill", style: "{vm.bar_style}" }
            }
            div { class: "progress-scale",
                span { "0%" }
                span { "25%" }
                span { "50%" }
                span { "75%" }
                span { "100%" }
            }

            section { class: "card current-phase",
                h3 { "Current Phase" }
                h4 { "{vm.current.name}" }
                p { class: "muted", "{vm.current.description}" }
            }

            section { class: "timeline",
                h3 { "Project Timeline" }
                ul {
                    for row in vm.timeline {
                        TimelineRow { key: "{row.id}", row }
                    }
                }
            }
        }
    }
}

#[component]
fn TimelineRow(row: MilestoneRowVm) -> Element {
    let marker = if row.is_reached() { "✓" } else { "○" };
    let badge_class = if row.is_reached() { "badge badge--reached" } else { "badge" };
    let status_label = match row.status {
        MilestoneStatus::Completed => "Completed",
        MilestoneStatus::Current => "In progress",
        MilestoneStatus::Upcoming => "Upcoming",
    };

    rsx! {
        li { class: row.row_class(),
            span { class: "milestone-marker", "{marker}" }
            div { class: "milestone-body",
                h4 { "{row.name}" }
                p { class: "muted", "{row.description}" }
            }
            span { class: "milestone-status", "{status_label}" }
            span { class: badge_class, "{row.threshold_label}" }
        }
    }
}
