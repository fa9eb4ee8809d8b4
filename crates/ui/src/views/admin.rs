use dioxus::prelude::*;
use services::AdminAuthError;

use crate::context::AppContext;
use crate::views::use_live_progress;
use crate::vm::{map_admin_preview, map_quick_sets, parse_draft};

#[component]
pub fn AdminView() -> Element {
    let ctx = use_context::<AppContext>();
    let mut unlocked = use_signal(|| ctx.is_admin_unlocked());

    if !unlocked() {
        return rsx! {
            AdminLogin { on_login: move |()| unlocked.set(true) }
        };
    }

    let logout_ctx = ctx.clone();
    rsx! {
        AdminPanel {
            on_logout: move |()| {
                logout_ctx.set_admin_unlocked(false);
                unlocked.set(false);
            }
        }
    }
}

#[component]
fn AdminLogin(on_login: Callback<()>) -> Element {
    let ctx = use_context::<AppContext>();
    let mut secret = use_signal(String::new);
    let mut error = use_signal(|| None::<&'static str>);

    let submit = move |_| {
        match ctx.admin_gate().verify(&secret.read()) {
            Ok(()) => {
                ctx.set_admin_unlocked(true);
                secret.set(String::new());
                error.set(None);
                on_login.call(());
            }
            Err(AdminAuthError::Disabled) => {
                error.set(Some("Admin access is not configured."));
            }
            Err(_) => error.set(Some("Invalid password.")),
        }
    };

    rsx! {
        div { class: "page admin-login",
            h2 { "Admin Login" }
            p { class: "muted", "Enter the admin password to manage project progress." }
            input {
                r#type: "password",
                placeholder: "Password",
                value: "{secret}",
                oninput: move |evt| secret.set(evt.value()),
            }
            button { r#type: "button", onclick: submit, "Log in" }
            if let Some(message) = error() {
                p { class: "error", "{message}" }
            }
        }
    }
}

#[component]
fn AdminPanel(on_logout: Callback<()>) -> Element {
    let ctx = use_context::<AppContext>();
    let sync = ctx.progress();
    let milestones = sync.milestones();
    let current = use_live_progress(sync.clone());
    let mut draft = use_signal(|| sync.current_value());
    let mut notice = use_signal(|| None::<String>);

    let draft_value = *draft.read();
    let current_value = *current.read();
    let preview = map_admin_preview(&milestones, draft_value);
    let quick_sets = map_quick_sets(&milestones, draft_value);

    let save = move |_| {
        let value = *draft.read();
        let pending = sync.set_progress(i64::from(value.value()));
        notice.set(Some(format!("Project progress set to {value}")));
        spawn(async move {
            pending.await;
        });
    };

    rsx! {
        div { class: "page admin",
            header { class: "admin-header",
                div {
                    h1 { "Project Administration" }
                    p { class: "muted", "Update project progress to keep clients informed" }
                }
                button { r#type: "button", class: "outline", onclick: move |_| on_logout.call(()), "Logout" }
            }

            if let Some(message) = notice() {
                div { class: "notice",
                    strong { "Progress Updated" }
                    span { " {message}" }
                }
            }

            div { class: "admin-grid",
                section { class: "card",
                    h3 { "Update Progress" }
                    p { class: "muted", "Current progress: {current_value}" }

                    label { "Progress Percentage: {draft_value}" }
                    input {
                        r#type: "range",
                        min: "0",
                        max: "100",
                        step: "1",
                        value: "{draft_value.value()}",
                        oninput: move |evt| draft.set(parse_draft(&evt.value())),
                    }

                    label { "Or enter exact percentage:" }
                    input {
                        r#type: "number",
                        min: "0",
                        max: "100",
                        value: "{draft_value.value()}",
                        oninput: move |evt| draft.set(parse_draft(&evt.value())),
                    }

                    div { class: "actions",
                        button { r#type: "button", onclick: save, "Save Progress" }
                        button {
                            r#type: "button",
                            class: "outline",
                            onclick: move |_| draft.set(*current.read()),
                            "Reset"
                        }
                    }
                }

                section { class: "card",
                    h3 { "Quick Milestone Updates" }
                    p { class: "muted", "Set progress to specific milestones" }
                    for quick in quick_sets {
                        button {
                            key: "{quick.id}",
                            r#type: "button",
                            class: if quick.selected { "quick quick--selected" } else { "quick" },
                            onclick: move |_| draft.set(status_core::model::Progress::clamped(i64::from(quick.threshold))),
                            span { "{quick.name}" }
                            span { class: "muted", "{quick.threshold}%" }
                        }
                    }
                }
            }

            section { class: "card preview",
                h3 { "Progress Preview" }
                p { class: "muted", "See how the progress will appear to clients" }
                div { class: "progress-figure", "{preview.percent}%" }
                div { class: "progress-bar",
                    div { class: "progress-bar-fill", style: "{preview.bar_style}" }
                }
                p { "Current phase: "
                    strong { "{preview.phase_name}" }
                }
            }
        }
    }
}
