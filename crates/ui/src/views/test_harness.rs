use std::sync::Arc;

use dioxus::core::NoOpMutations;
use dioxus::prelude::*;
use dioxus_router::{Routable, Router};
use services::{AdminGate, ProgressSynchronizer};
use status_core::model::{MilestoneTable, Progress, ProgressRowId};
use storage::InMemoryRepository;

use crate::context::{UiApp, build_app_context};
use crate::views::{AdminView, HomeView};

pub const TEST_ADMIN_SECRET: &str = "let-me-in";

#[derive(Clone)]
struct TestApp {
    progress: ProgressSynchronizer,
    admin_gate: Arc<AdminGate>,
}

impl UiApp for TestApp {
    fn app_name(&self) -> String {
        "Project Status".to_string()
    }

    fn progress(&self) -> ProgressSynchronizer {
        self.progress.clone()
    }

    fn admin_gate(&self) -> Arc<AdminGate> {
        Arc::clone(&self.admin_gate)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Home,
    Admin,
    AdminUnlocked,
}

#[derive(Props, Clone)]
struct ViewHarnessProps {
    app: Arc<TestApp>,
    view: ViewKind,
}

impl PartialEq for ViewHarnessProps {
    fn eq(&self, _other: &Self) -> bool {
        true
    }
}

impl Eq for ViewHarnessProps {}

#[component]
fn ViewRouterHarness(props: ViewHarnessProps) -> Element {
    let app: Arc<dyn UiApp> = props.app.clone();
    let ctx = use_context_provider(|| build_app_context(&app));
    if props.view == ViewKind::AdminUnlocked {
        ctx.set_admin_unlocked(true);
    }
    use_context_provider(|| props.view);
    rsx! { Router::<TestRoute> {} }
}

#[derive(Clone, Routable, PartialEq)]
#[rustfmt::skip]
enum TestRoute {
    #[route("/")]
    Root {},
}

#[component]
fn Root() -> Element {
    let view = use_context::<ViewKind>();
    match view {
        ViewKind::Home => rsx! { HomeView {} },
        ViewKind::Admin | ViewKind::AdminUnlocked => rsx! { AdminView {} },
    }
}

pub struct ViewHarness {
    pub dom: VirtualDom,
    pub repo: Arc<InMemoryRepository>,
    pub row_id: ProgressRowId,
    pub progress: ProgressSynchronizer,
}

impl ViewHarness {
    pub fn rebuild(&mut self) {
        self.dom.rebuild_in_place();
        drive_dom(&mut self.dom);
    }

    pub async fn drive_async(&mut self) {
        let _ = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            self.dom.wait_for_work(),
        )
        .await;
        self.dom.render_immediate(&mut NoOpMutations);
        self.dom.process_events();
    }

    pub fn render(&self) -> String {
        dioxus_ssr::render(&self.dom)
    }

    /// Drive the dom until the rendered html contains `needle`, giving up
    /// after a bounded number of rounds.
    pub async fn render_until(&mut self, needle: &str) -> String {
        for _ in 0..20 {
            let html = self.render();
            if html.contains(needle) {
                return html;
            }
            self.drive_async().await;
        }
        self.render()
    }
}

pub fn drive_dom(dom: &mut VirtualDom) {
    dom.process_events();
    dom.render_immediate(&mut NoOpMutations);
    dom.process_events();
}

/// A started synchronizer over an in-memory row at `initial`, mounted behind
/// the requested view.
pub async fn setup_view_harness(view: ViewKind, initial: u8) -> ViewHarness {
    let row_id = ProgressRowId::default();
    let repo = Arc::new(InMemoryRepository::new());
    repo.seed(row_id, Progress::clamped(i64::from(initial))).expect("seed row");

    let progress = ProgressSynchronizer::new(repo.clone(), row_id, MilestoneTable::standard());
    progress.start().await;

    let app = Arc::new(TestApp {
        progress: progress.clone(),
        admin_gate: Arc::new(AdminGate::new(Some(TEST_ADMIN_SECRET))),
    });
    let dom = VirtualDom::new_with_props(ViewRouterHarness, ViewHarnessProps { app, view });

    ViewHarness {
        dom,
        repo,
        row_id,
        progress,
    }
}
