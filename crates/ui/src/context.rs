use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use services::{AdminGate, ProgressSynchronizer};

pub trait UiApp: Send + Sync {
    fn app_name(&self) -> String;
    fn progress(&self) -> ProgressSynchronizer;
    fn admin_gate(&self) -> Arc<AdminGate>;
}

#[derive(Clone)]
pub struct AppContext {
    app_name: String,
    progress: ProgressSynchronizer,
    admin_gate: Arc<AdminGate>,
    admin_unlocked: Arc<AtomicBool>,
}

impl AppContext {
    #[must_use]
    pub fn new(app: &Arc<dyn UiApp>) -> Self {
        Self {
            app_name: app.app_name(),
            progress: app.progress(),
            admin_gate: app.admin_gate(),
            admin_unlocked: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    #[must_use]
    pub fn progress(&self) -> ProgressSynchronizer {
        self.progress.clone()
    }

    #[must_use]
    pub fn admin_gate(&self) -> Arc<AdminGate> {
        Arc::clone(&self.admin_gate)
    }

    /// Whether this window has passed the admin gate.
    #[must_use]
    pub fn is_admin_unlocked(&self) -> bool {
        self.admin_unlocked.load(Ordering::Acquire)
    }

    pub fn set_admin_unlocked(&self, unlocked: bool) {
        self.admin_unlocked.store(unlocked, Ordering::Release);
    }
}

// This context is provided by the application composition root (e.g. `crates/app`).

/// Build an `AppContext` from a UI-facing app implementation.
#[must_use]
pub fn build_app_context(app: &Arc<dyn UiApp>) -> AppContext {
    AppContext::new(app)
}
