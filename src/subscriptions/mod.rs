//! Subscription handles for live queries.
//!
//! A [`SubscriptionHandle`] owns exactly one store registration:
//! - `cancel` releases it and is safe to call any number of times
//! - scheduled deliveries check the handle's [`Liveness`] before applying,
//!   so nothing is applied once `cancel` has returned
//! - dropping the last clone cancels
//!
//! # Example
//!
//! ```ignore
//! let sync = CollectionSync::new(&ctx, "tasks", &scope);
//! sync.start_listening(Some("timestamp"));
//!
//! // Later, when the owning view goes away
//! scope.teardown();
//! assert!(!sync.is_listening());
//! ```

mod handle;

pub use handle::{Liveness, SubscriptionHandle, SubscriptionId};
