//! Writes against a mirrored collection.
//!
//! Mutations return once the store has committed; the mirrored data only
//! changes when the live query delivers the next snapshot. Failures are
//! recorded into the shared state and returned to the caller.

use crate::clock::ServerClock;
use crate::context::SyncContext;
use crate::error::{MutationKind, Result, SyncError};
use crate::path::StorePath;
use crate::remote::RemoteStore;
use crate::state::SyncState;
use crate::types::{DocumentId, Fields};
use std::sync::Arc;
use tracing::{debug, error};

/// Stamps and submits writes for one collection.
pub struct MutationGateway<T> {
    store: Arc<dyn RemoteStore>,
    clock: Arc<dyn ServerClock>,
    collection: StorePath,
    created_field: String,
    updated_field: String,
    state: SyncState<T>,
}

impl<T: Clone> MutationGateway<T> {
    pub fn new(ctx: &SyncContext, collection: StorePath, state: SyncState<T>) -> Self {
        Self {
            store: Arc::clone(ctx.store()),
            clock: Arc::clone(ctx.clock()),
            collection,
            created_field: ctx.config().created_field.clone(),
            updated_field: ctx.config().updated_field.clone(),
            state,
        }
    }

    pub fn collection(&self) -> &StorePath {
        &self.collection
    }

    /// Create a document stamped with the creation time. Returns its id.
    pub fn add(&self, mut payload: Fields) -> Result<DocumentId> {
        payload.insert(
            self.created_field.clone(),
            self.clock.now_from_server().to_value(),
        );
        let id = self
            .store
            .add(&self.collection, payload)
            .map_err(|e| self.fail(MutationKind::Add, &e))?;
        debug!(collection = %self.collection, id = %id, "document added");
        Ok(id)
    }

    /// Overwrite fields of an existing document, stamping the update time.
    pub fn update(&self, id: &str, partial: Fields) -> Result<()> {
        let path = self.collection.child(id);
        self.store
            .update(&path, self.stamped(partial))
            .map_err(|e| self.fail(MutationKind::Update, &e))?;
        debug!(document = %path, "document updated");
        Ok(())
    }

    /// Merge-write fields into a document, creating it if needed.
    pub fn merge(&self, id: &str, fields: Fields) -> Result<()> {
        let path = self.collection.child(id);
        self.store
            .set_merge(&path, self.stamped(fields))
            .map_err(|e| self.fail(MutationKind::Merge, &e))?;
        debug!(document = %path, "document merged");
        Ok(())
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        let path = self.collection.child(id);
        self.store
            .delete(&path)
            .map_err(|e| self.fail(MutationKind::Remove, &e))?;
        debug!(document = %path, "document removed");
        Ok(())
    }

    /// Record a failure in state and turn it into the caller's error.
    pub(crate) fn fail(&self, op: MutationKind, err: &SyncError) -> SyncError {
        error!(collection = %self.collection, %op, error = %err, "mutation failed");
        self.state.record_error(err.message());
        SyncError::mutation(op, err)
    }

    fn stamped(&self, mut fields: Fields) -> Fields {
        fields.insert(
            self.updated_field.clone(),
            self.clock.now_from_server().to_value(),
        );
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::config::SyncConfig;
    use crate::event_loop::EventLoop;
    use crate::remote::memory::MemoryStore;
    use crate::types::{Record, Timestamp};
    use serde_json::{json, Value};

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    fn setup() -> (Arc<MemoryStore>, MutationGateway<Vec<Record>>, SyncState<Vec<Record>>) {
        let store = Arc::new(MemoryStore::new());
        let scheduler = Arc::new(EventLoop::new().handle());
        let ctx = SyncContext::new(store.clone(), scheduler, SyncConfig::new("t1"))
            .unwrap()
            .with_clock(Arc::new(ManualClock::new(Timestamp(1_000))));
        let state = SyncState::new(Vec::new());
        let gateway = MutationGateway::new(&ctx, ctx.resolver().collection("tasks"), state.clone());
        (store, gateway, state)
    }

    #[test]
    fn test_add_stamps_creation_time() {
        let (store, gateway, _) = setup();
        let id = gateway.add(fields(json!({"name": "x", "timestamp": "client"}))).unwrap();

        let doc = store.document(&gateway.collection().child(id.as_str())).unwrap();
        assert_eq!(doc["name"], json!("x"));
        assert_eq!(doc["timestamp"], json!(1_000));
    }

    #[test]
    fn test_update_stamps_updated_at_and_keeps_fields() {
        let (store, gateway, _) = setup();
        let id = gateway.add(fields(json!({"name": "x", "done": false}))).unwrap();
        gateway.update(id.as_str(), fields(json!({"done": true}))).unwrap();

        let doc = store.document(&gateway.collection().child(id.as_str())).unwrap();
        assert_eq!(doc["name"], json!("x"));
        assert_eq!(doc["done"], json!(true));
        assert_eq!(doc["updatedAt"], json!(1_000));
    }

    #[test]
    fn test_failure_is_recorded_and_returned() {
        let (store, gateway, state) = setup();
        store.fail_next_write("offline");

        let err = gateway.add(fields(json!({}))).unwrap_err();
        assert_eq!(
            err,
            SyncError::Mutation {
                op: MutationKind::Add,
                message: "Store unavailable: offline".into()
            }
        );
        assert_eq!(state.error().as_deref(), Some("Store unavailable: offline"));
    }

    #[test]
    fn test_update_missing_document_fails() {
        let (_, gateway, state) = setup();
        let err = gateway.update("ghost", fields(json!({"a": 1}))).unwrap_err();
        assert!(matches!(err, SyncError::Mutation { op: MutationKind::Update, .. }));
        assert!(state.error().is_some());
    }

    #[test]
    fn test_remove() {
        let (store, gateway, _) = setup();
        let id = gateway.add(fields(json!({}))).unwrap();
        gateway.remove(id.as_str()).unwrap();
        assert!(store.documents(gateway.collection()).is_empty());
    }
}
