use dioxus::prelude::*;
use services::ProgressSynchronizer;
use status_core::model::Progress;
use tokio::sync::mpsc;

/// Mirror the synchronizer's value into a signal for as long as the calling
/// component is mounted.
pub fn use_live_progress(sync: ProgressSynchronizer) -> Signal<Progress> {
    let mut value = use_signal(|| sync.current_value());

    use_future(move || {
        let sync = sync.clone();
        async move {
            let (tx, mut rx) = mpsc::unbounded_channel();
            // Dropped with the future, which unsubscribes.
            let _guard = sync.subscribe(move |progress| {
                let _ = tx.send(progress);
            });
            // Catch anything applied between first render and subscribing.
            value.set(sync.current_value());
            while let Some(progress) = rx.recv().await {
                value.set(progress);
            }
        }
    });

    value
}
