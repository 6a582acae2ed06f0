//! Live mirrors of remote collections and documents.
//!
//! Both components follow the same cycle:
//! - `start_listening` cancels any previous subscription, resets the state
//!   to loading, and opens a live query
//! - every delivery is scheduled onto the context's scheduler and applied
//!   only if its subscription is still live
//! - a failed setup or an error delivery sets `error` and clears `loading`,
//!   keeping the last data; an error delivery also ends the subscription
//! - the subscription is cancelled when the lifecycle scope tears down or is
//!   dropped, when `stop_listening` is called, or when the component is
//!   dropped

mod collection;
mod document;

pub use collection::CollectionSync;
pub use document::DocumentSync;

use crate::context::SyncContext;
use crate::error::Result;
use crate::event_loop::Scheduler;
use crate::lifecycle::{LifecycleScope, WeakScope};
use crate::path::StorePath;
use crate::remote::ListenerId;
use crate::state::SyncState;
use crate::subscriptions::{Liveness, SubscriptionHandle};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, warn};

/// Surface shared by every mirror.
pub trait LiveResource {
    type Data: Clone;

    fn state(&self) -> &SyncState<Self::Data>;

    /// Whether a live query is currently open.
    fn is_listening(&self) -> bool;

    /// Cancel the live query, keeping the last state.
    fn stop_listening(&self);

    fn data(&self) -> Self::Data {
        self.state().data()
    }

    fn loading(&self) -> bool {
        self.state().loading()
    }

    fn error(&self) -> Option<String> {
        self.state().error()
    }
}

/// The one active subscription of a mirror.
pub(crate) struct ListenerSlot {
    scope: WeakScope,
    current: Mutex<Option<SubscriptionHandle>>,
}

impl ListenerSlot {
    pub(crate) fn new(scope: &LifecycleScope) -> Self {
        Self {
            scope: scope.downgrade(),
            current: Mutex::new(None),
        }
    }

    /// Replace the active subscription with a fresh one.
    ///
    /// `open` registers the listener with the store. A setup failure lands in
    /// `state` exactly like an error delivery would.
    pub(crate) fn restart<T, F>(
        &self,
        ctx: &SyncContext,
        target: &StorePath,
        state: &SyncState<T>,
        empty: T,
        open: F,
    ) where
        T: Clone,
        F: FnOnce(Liveness) -> Result<ListenerId>,
    {
        let mut current = self.current.lock();
        if let Some(previous) = current.take() {
            previous.cancel();
        }

        let scope = match self.scope.upgrade() {
            Some(scope) if !scope.is_torn_down() => scope,
            _ => {
                warn!(path = %target, scope = self.scope.name(), "scope already torn down, not listening");
                return;
            }
        };

        state.reset(empty);
        let handle = SubscriptionHandle::new();
        match open(handle.liveness()) {
            Ok(listener) => {
                handle.attach(Arc::clone(ctx.store()), listener);
                scope.bind(&handle);
                debug!(subscription = ?handle.id(), path = %target, "listening");
                *current = Some(handle);
            }
            Err(err) => {
                handle.cancel();
                warn!(path = %target, error = %err, "error setting up listener");
                state.fail(err.message());
            }
        }
    }

    pub(crate) fn stop(&self) {
        if let Some(handle) = self.current.lock().take() {
            handle.cancel();
        }
    }

    pub(crate) fn is_listening(&self) -> bool {
        self.current
            .lock()
            .as_ref()
            .map(SubscriptionHandle::is_active)
            .unwrap_or(false)
    }
}

impl Drop for ListenerSlot {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Build a store listener that schedules each delivery onto the event loop
/// and applies it to `state` while the subscription is live.
pub(crate) fn scheduled_listener<S, T>(
    scheduler: &Arc<dyn Scheduler>,
    state: &SyncState<T>,
    live: Liveness,
    target: StorePath,
    to_data: fn(S) -> T,
) -> Box<dyn Fn(Result<S>) + Send + Sync>
where
    S: Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    let scheduler = Arc::clone(scheduler);
    let state = state.clone();
    Box::new(move |delivery: Result<S>| {
        let state = state.clone();
        let live = live.clone();
        let target = target.clone();
        scheduler.schedule(Box::new(move || {
            if !live.is_live() {
                return;
            }
            match delivery {
                Ok(snapshot) => {
                    state.apply(to_data(snapshot));
                    debug!(path = %target, version = state.version(), "snapshot applied");
                }
                Err(err) => {
                    // The store drops a listener after delivering an error
                    live.end();
                    warn!(path = %target, error = %err, "listener error, subscription ended");
                    state.fail(err.message());
                }
            }
        }));
    })
}
