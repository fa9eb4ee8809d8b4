use status_core::model::Progress;
use storage::ProgressRepository;

use super::test_harness::{ViewKind, setup_view_harness};

#[tokio::test(flavor = "current_thread")]
async fn home_view_renders_percentage_and_current_phase() {
    let mut harness = setup_view_harness(ViewKind::Home, 35).await;

    harness.rebuild();
    let html = harness.render();
    assert!(html.contains("35%"), "missing percentage in {html}");
    assert!(html.contains("width: 35%"), "missing bar width in {html}");
    assert!(html.contains("Designing"), "missing current phase in {html}");
    assert!(html.contains("Project Timeline"), "missing timeline in {html}");
    assert!(html.contains("Final Delivery"), "missing last milestone in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn home_view_follows_remote_changes() {
    let mut harness = setup_view_harness(ViewKind::Home, 10).await;
    harness.rebuild();
    harness.drive_async().await;

    harness
        .repo
        .update_progress(harness.row_id, Progress::clamped(90))
        .await
        .expect("update row");

    let html = harness.render_until("90%").await;
    assert!(html.contains("90%"), "remote change not rendered in {html}");
    assert!(html.contains("Testing"), "phase did not follow in {html}");
    assert_eq!(harness.progress.current_value(), Progress::clamped(90));
}

#[tokio::test(flavor = "current_thread")]
async fn admin_view_starts_locked() {
    let mut harness = setup_view_harness(ViewKind::Admin, 35).await;

    harness.rebuild();
    let html = harness.render();
    assert!(html.contains("Admin Login"), "missing login in {html}");
    assert!(!html.contains("Update Progress"), "panel leaked in {html}");
}

#[tokio::test(flavor = "current_thread")]
async fn unlocked_admin_view_renders_panel() {
    let mut harness = setup_view_harness(ViewKind::AdminUnlocked, 35).await;

    harness.rebuild();
    let html = harness.render();
    assert!(html.contains("Update Progress"), "missing panel in {html}");
    assert!(html.contains("Current progress: 35%"), "missing current value in {html}");
    assert!(html.contains("Quick Milestone Updates"), "missing quick sets in {html}");
    assert!(html.contains("Progress Preview"), "missing preview in {html}");
    assert!(html.contains("Current phase: "), "missing preview phase in {html}");
}
