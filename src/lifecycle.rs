//! Ties subscriptions to the lifetime of their owner.

use crate::subscriptions::SubscriptionHandle;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

struct ScopeInner {
    name: String,
    torn_down: AtomicBool,
    handles: Mutex<Vec<SubscriptionHandle>>,
}

impl ScopeInner {
    fn teardown(&self) -> usize {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return 0;
        }
        let handles: Vec<SubscriptionHandle> = self.handles.lock().drain(..).collect();
        let cancelled = handles.iter().filter(|h| h.cancel()).count();
        debug!(scope = %self.name, cancelled, "scope torn down");
        cancelled
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// The lifetime of a consumer, e.g. one mounted view.
///
/// Every handle bound here is cancelled exactly once when the scope is torn
/// down, either explicitly or when the last clone is dropped.
#[derive(Clone)]
pub struct LifecycleScope {
    inner: Arc<ScopeInner>,
}

impl LifecycleScope {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ScopeInner {
                name: name.into(),
                torn_down: AtomicBool::new(false),
                handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// A view that does not keep the scope alive.
    pub(crate) fn downgrade(&self) -> WeakScope {
        WeakScope {
            name: self.inner.name.clone(),
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Cancel `handle` on teardown. A torn-down scope cancels it now and
    /// returns false.
    pub fn bind(&self, handle: &SubscriptionHandle) -> bool {
        let mut handles = self.inner.handles.lock();
        if self.is_torn_down() {
            drop(handles);
            handle.cancel();
            return false;
        }
        handles.retain(SubscriptionHandle::is_active);
        handles.push(handle.clone());
        true
    }

    /// Cancel everything bound. Returns how many handles this call cancelled;
    /// later calls return 0.
    pub fn teardown(&self) -> usize {
        self.inner.teardown()
    }

    pub fn is_torn_down(&self) -> bool {
        self.inner.torn_down.load(Ordering::SeqCst)
    }

    /// Bound handles that are still active.
    pub fn active_count(&self) -> usize {
        self.inner
            .handles
            .lock()
            .iter()
            .filter(|h| h.is_active())
            .count()
    }
}

/// Non-owning reference held by mirrors, so a mirror never outlives the
/// teardown of its owner's scope.
pub(crate) struct WeakScope {
    name: String,
    inner: Weak<ScopeInner>,
}

impl WeakScope {
    /// The scope, unless every owning clone is gone.
    pub(crate) fn upgrade(&self) -> Option<LifecycleScope> {
        self.inner.upgrade().map(|inner| LifecycleScope { inner })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }
}
