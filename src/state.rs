//! Observable mirror state.
//!
//! A [`SyncState`] is written only by the sync component that owns it; every
//! other holder reads. Each transition bumps a version and notifies watchers.

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Point-in-time copy of a [`SyncState`].
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StateSnapshot<T> {
    pub data: T,
    /// True from subscription start until the first delivery is applied.
    pub loading: bool,
    /// Last subscription or mutation failure; cleared by a good delivery.
    pub error: Option<String>,
}

struct StateCell<T> {
    current: RwLock<StateSnapshot<T>>,
    version: AtomicU64,
    watchers: Mutex<Vec<Sender<u64>>>,
}

/// Shared, observable `{ data, loading, error }` cell.
pub struct SyncState<T> {
    inner: Arc<StateCell<T>>,
}

impl<T> Clone for SyncState<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> SyncState<T> {
    /// A state that has not received anything yet: loading, no error.
    pub fn new(initial: T) -> Self {
        Self {
            inner: Arc::new(StateCell {
                current: RwLock::new(StateSnapshot {
                    data: initial,
                    loading: true,
                    error: None,
                }),
                version: AtomicU64::new(0),
                watchers: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn data(&self) -> T {
        self.inner.current.read().data.clone()
    }

    /// Borrow the data without cloning it.
    pub fn with_data<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.current.read().data)
    }

    pub fn loading(&self) -> bool {
        self.inner.current.read().loading
    }

    pub fn error(&self) -> Option<String> {
        self.inner.current.read().error.clone()
    }

    pub fn snapshot(&self) -> StateSnapshot<T> {
        self.inner.current.read().clone()
    }

    /// Number of transitions so far.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::SeqCst)
    }

    /// Receive the new version after every transition.
    pub fn watch(&self) -> Receiver<u64> {
        let (sender, receiver) = unbounded();
        self.inner.watchers.lock().push(sender);
        receiver
    }

    // --- Transitions (owner only) ---

    /// Start of a subscription cycle.
    pub(crate) fn reset(&self, data: T) {
        self.transition(|s| {
            s.data = data;
            s.loading = true;
            s.error = None;
        });
    }

    /// A delivery replaced the data.
    pub(crate) fn apply(&self, data: T) {
        self.transition(|s| {
            s.data = data;
            s.loading = false;
            s.error = None;
        });
    }

    /// A subscription failed; the last data is kept.
    pub(crate) fn fail(&self, message: String) {
        self.transition(|s| {
            s.loading = false;
            s.error = Some(message);
        });
    }

    /// A mutation failed; loading is left alone.
    pub(crate) fn record_error(&self, message: String) {
        self.transition(|s| s.error = Some(message));
    }

    fn transition(&self, f: impl FnOnce(&mut StateSnapshot<T>)) {
        let version = {
            let mut current = self.inner.current.write();
            f(&mut current);
            self.inner.version.fetch_add(1, Ordering::SeqCst) + 1
        };
        self.notify(version);
    }

    /// Send to every watcher, pruning the ones whose receiver is gone.
    fn notify(&self, version: u64) {
        self.inner
            .watchers
            .lock()
            .retain(|watcher| watcher.send(version).is_ok());
    }
}
