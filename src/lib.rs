//! # Live Mirror
//!
//! Mirrors tenant-scoped collections and documents of a remote document store
//! into observable state, and writes back through the same store.
//!
//! ## Core Concepts
//!
//! - **Context**: store, scheduler, clock and tenant, passed explicitly
//! - **Mirrors**: [`CollectionSync`] and [`DocumentSync`] keep a
//!   [`SyncState`] equal to the latest delivered snapshot
//! - **Handles**: one [`SubscriptionHandle`] per live query, cancelled once
//! - **Scopes**: a [`LifecycleScope`] cancels every handle bound to it on
//!   teardown
//!
//! ## Example
//!
//! ```ignore
//! use livemirror::{EventLoop, LifecycleScope, LiveResource, MemoryStore, SyncConfig, SyncContext};
//!
//! let event_loop = EventLoop::new();
//! let ctx = SyncContext::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(event_loop.handle()),
//!     SyncConfig::new("acme"),
//! )?;
//!
//! let scope = LifecycleScope::new("task-list");
//! let tasks = ctx.collection("tasks", &scope);
//! tasks.start_listening(Some("timestamp"));
//!
//! let id = tasks.add_serialized(&json!({ "title": "Ship it" }))?;
//! event_loop.run_until_idle();
//! assert_eq!(tasks.data()[0].id, id);
//!
//! scope.teardown();
//! ```

pub mod clock;
pub mod config;
pub mod context;
pub mod error;
pub mod event_loop;
pub mod lifecycle;
pub mod mutations;
pub mod path;
pub mod remote;
pub mod state;
pub mod subscriptions;
pub mod sync;
pub mod types;

// Re-exports
pub use clock::{ManualClock, ServerClock, SystemClock};
pub use config::{DocumentUpdateMode, SyncConfig};
pub use context::SyncContext;
pub use error::{MutationKind, Result, SyncError};
pub use event_loop::{EventLoop, LoopHandle, Scheduler, Task};
pub use lifecycle::LifecycleScope;
pub use mutations::MutationGateway;
pub use path::{PathResolver, StorePath};
pub use remote::memory::MemoryStore;
pub use remote::{
    DocumentListener, DocumentSnapshot, ListenerId, Query, QueryListener, QuerySnapshot,
    RemoteStore,
};
pub use state::{StateSnapshot, SyncState};
pub use subscriptions::{Liveness, SubscriptionHandle, SubscriptionId};
pub use sync::{CollectionSync, DocumentSync, LiveResource};
pub use types::*;
