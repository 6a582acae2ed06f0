//! Handle owning one live-query registration.

use crate::remote::{ListenerId, RemoteStore};
use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;

/// Counter for generating subscription IDs.
static NEXT_SUBSCRIPTION_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a subscription.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

/// Non-owning view of a subscription, checked by every scheduled delivery.
///
/// Holding one never keeps the subscription alive.
#[derive(Clone)]
pub struct Liveness(Weak<HandleInner>);

impl Liveness {
    pub fn is_live(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.live.load(Ordering::SeqCst))
            .unwrap_or(false)
    }

    /// Mark the subscription dead after the store ended it on its side.
    /// Later `cancel` calls are no-ops. Returns whether this call ended it.
    pub(crate) fn end(&self) -> bool {
        match self.0.upgrade() {
            Some(inner) => inner.cancel(),
            None => false,
        }
    }
}

impl fmt::Debug for Liveness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Liveness({})", self.is_live())
    }
}

/// The store-side registration, known once the listener is open.
struct Registration {
    store: Arc<dyn RemoteStore>,
    listener: ListenerId,
}

struct HandleInner {
    id: SubscriptionId,
    live: AtomicBool,
    registration: Mutex<Option<Registration>>,
}

impl HandleInner {
    fn cancel(&self) -> bool {
        if !self.live.swap(false, Ordering::SeqCst) {
            return false;
        }
        if let Some(registration) = self.registration.lock().take() {
            registration.store.unlisten(registration.listener);
        }
        debug!(subscription = ?self.id, "subscription cancelled");
        true
    }
}

impl Drop for HandleInner {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Handle to one live query.
///
/// Clones share the subscription. `cancel` may be called any number of
/// times from any clone; only the first call has an effect. Dropping the
/// last clone cancels.
#[derive(Clone)]
pub struct SubscriptionHandle {
    inner: Arc<HandleInner>,
}

impl SubscriptionHandle {
    pub(crate) fn new() -> Self {
        let id = SubscriptionId(NEXT_SUBSCRIPTION_ID.fetch_add(1, Ordering::SeqCst));
        Self {
            inner: Arc::new(HandleInner {
                id,
                live: AtomicBool::new(true),
                registration: Mutex::new(None),
            }),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.inner.id
    }

    /// View for deliveries to check before touching state.
    pub(crate) fn liveness(&self) -> Liveness {
        Liveness(Arc::downgrade(&self.inner))
    }

    /// Record the store registration. A handle cancelled in the meantime
    /// releases it right away.
    pub(crate) fn attach(&self, store: Arc<dyn RemoteStore>, listener: ListenerId) {
        let mut registration = self.inner.registration.lock();
        if self.is_active() {
            *registration = Some(Registration { store, listener });
        } else {
            store.unlisten(listener);
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.live.load(Ordering::SeqCst)
    }

    /// Stop the live query. Returns whether this call did the cancelling.
    pub fn cancel(&self) -> bool {
        self.inner.cancel()
    }
}

impl fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("id", &self.inner.id)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::StorePath;
    use crate::remote::memory::MemoryStore;
    use crate::remote::Query;

    fn open(store: &Arc<MemoryStore>) -> SubscriptionHandle {
        let handle = SubscriptionHandle::new();
        let query = Query::collection(StorePath::new(["teams", "t1", "tasks"]));
        let listener = store.listen_query(&query, Box::new(|_| {})).unwrap();
        handle.attach(Arc::clone(store) as Arc<dyn RemoteStore>, listener);
        handle
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let handle = open(&store);
        let liveness = handle.liveness();
        assert_eq!(store.listener_count(), 1);

        assert!(handle.cancel());
        assert!(!handle.cancel());
        assert!(!handle.clone().cancel());
        assert!(!handle.is_active());
        assert!(!liveness.is_live());
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_drop_last_clone_cancels() {
        let store = Arc::new(MemoryStore::new());
        let handle = open(&store);
        let liveness = handle.liveness();
        let clone = handle.clone();

        drop(handle);
        assert!(liveness.is_live());
        drop(clone);
        assert!(!liveness.is_live());
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_attach_after_cancel_releases_listener() {
        let store = Arc::new(MemoryStore::new());
        let handle = SubscriptionHandle::new();
        handle.cancel();

        let query = Query::collection(StorePath::new(["teams", "t1", "tasks"]));
        let listener = store.listen_query(&query, Box::new(|_| {})).unwrap();
        handle.attach(Arc::clone(&store) as Arc<dyn RemoteStore>, listener);
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_end_releases_and_later_cancel_is_noop() {
        let store = Arc::new(MemoryStore::new());
        let handle = open(&store);
        let liveness = handle.liveness();

        assert!(liveness.end());
        assert!(!handle.is_active());
        assert_eq!(store.listener_count(), 0);
        assert!(!liveness.end());
        assert!(!handle.cancel());
    }

    #[test]
    fn test_liveness_does_not_keep_handle_alive() {
        let store = Arc::new(MemoryStore::new());
        let liveness = open(&store).liveness();
        assert!(!liveness.is_live());
        assert!(!liveness.end());
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(SubscriptionHandle::new().id(), SubscriptionHandle::new().id());
    }
}
