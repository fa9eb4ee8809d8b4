use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use status_core::model::Progress;

pub type Observer = Arc<dyn Fn(Progress) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObserverId(u64);

/// Callbacks interested in progress changes.
///
/// Callbacks run outside the registry lock, so an observer may subscribe or
/// unsubscribe from inside its own callback. No ordering between observers.
#[derive(Default)]
pub struct ObserverRegistry {
    next_id: AtomicU64,
    observers: Mutex<BTreeMap<ObserverId, Observer>>,
}

impl ObserverRegistry {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Register `observer`; it stays registered until the guard is dropped.
    pub fn register(
        self: &Arc<Self>,
        observer: impl Fn(Progress) + Send + Sync + 'static,
    ) -> ObserverGuard {
        let id = ObserverId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().insert(id, Arc::new(observer));
        ObserverGuard {
            id,
            registry: Arc::downgrade(self),
        }
    }

    /// Returns `true` if `id` was registered.
    pub fn remove(&self, id: ObserverId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Invoke every registered observer with `progress`; returns how many ran.
    pub fn notify(&self, progress: Progress) -> usize {
        let snapshot: Vec<Observer> = self.lock().values().cloned().collect();
        for observer in &snapshot {
            observer(progress);
        }
        snapshot.len()
    }

    /// Drop every registration; returns how many were removed. Outstanding
    /// guards become no-ops.
    pub fn clear(&self) -> usize {
        let mut observers = self.lock();
        let removed = observers.len();
        observers.clear();
        removed
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<ObserverId, Observer>> {
        // Callbacks never run under the lock, so a poisoned map is still consistent.
        self.observers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keeps an observer registered. Dropping it unsubscribes.
#[must_use = "dropping the guard unsubscribes the observer"]
pub struct ObserverGuard {
    id: ObserverId,
    registry: Weak<ObserverRegistry>,
}

impl ObserverGuard {
    #[must_use]
    pub fn id(&self) -> ObserverId {
        self.id
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for ObserverGuard {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn notifies_all_registered_observers() {
        let registry = ObserverRegistry::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let first = Arc::clone(&seen);
        let _a = registry.register(move |p| first.lock().unwrap().push(("a", p.value())));
        let second = Arc::clone(&seen);
        let _b = registry.register(move |p| second.lock().unwrap().push(("b", p.value())));

        assert_eq!(registry.notify(Progress::clamped(40)), 2);
        let mut seen = seen.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, vec![("a", 40), ("b", 40)]);
    }

    #[test]
    fn dropping_guard_unsubscribes() {
        let registry = ObserverRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let guard = registry.register(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        registry.notify(Progress::ZERO);
        guard.unsubscribe();
        registry.notify(Progress::ZERO);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn registering_does_not_notify() {
        let registry = ObserverRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let _guard = registry.register(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn observer_may_unsubscribe_itself_during_notify() {
        let registry = ObserverRegistry::new();
        let slot: Arc<Mutex<Option<ObserverGuard>>> = Arc::new(Mutex::new(None));
        let inner = Arc::clone(&slot);
        let guard = registry.register(move |_| {
            inner.lock().unwrap().take();
        });
        *slot.lock().unwrap() = Some(guard);

        assert_eq!(registry.notify(Progress::ZERO), 1);
        assert!(registry.is_empty());
    }

    #[test]
    fn guard_outliving_registry_is_harmless() {
        let registry = ObserverRegistry::new();
        let guard = registry.register(|_| {});
        drop(registry);
        drop(guard);
    }

    #[test]
    fn clear_removes_everything_and_disarms_guards() {
        let registry = ObserverRegistry::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let guard = registry.register(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let _other = registry.register(|_| {});

        assert_eq!(registry.clear(), 2);
        assert_eq!(registry.notify(Progress::COMPLETE), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        drop(guard);
        assert!(registry.is_empty());
    }
}
