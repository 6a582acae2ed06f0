//! Mirror of a whole collection.

use crate::context::SyncContext;
use crate::error::{MutationKind, Result};
use crate::lifecycle::LifecycleScope;
use crate::mutations::MutationGateway;
use crate::path::StorePath;
use crate::remote::{Query, QuerySnapshot};
use crate::state::SyncState;
use crate::types::{to_fields, DocumentId, Fields, Record};
use serde::Serialize;

use super::{scheduled_listener, ListenerSlot, LiveResource};

fn snapshot_records(snapshot: QuerySnapshot) -> Vec<Record> {
    snapshot.documents
}

/// Mirrors every document of one tenant resource as an ordered list.
///
/// The list is replaced wholesale by each delivery. Mutations go straight to
/// the store and show up in [`data`](LiveResource::data) only once the live
/// query re-delivers.
pub struct CollectionSync {
    ctx: SyncContext,
    collection: StorePath,
    state: SyncState<Vec<Record>>,
    gateway: MutationGateway<Vec<Record>>,
    slot: ListenerSlot,
}

impl CollectionSync {
    pub fn new(ctx: &SyncContext, resource: &str, scope: &LifecycleScope) -> Self {
        let collection = ctx.resolver().collection(resource);
        let state = SyncState::new(Vec::new());
        let gateway = MutationGateway::new(ctx, collection.clone(), state.clone());
        Self {
            ctx: ctx.clone(),
            collection,
            state,
            gateway,
            slot: ListenerSlot::new(scope),
        }
    }

    pub fn collection(&self) -> &StorePath {
        &self.collection
    }

    /// Open the live query, ordered by `sort_field` descending when given.
    ///
    /// Never fails: setup errors are reported through the state.
    pub fn start_listening(&self, sort_field: Option<&str>) {
        let mut query = Query::collection(self.collection.clone());
        if let Some(field) = sort_field {
            query = query.order_by_desc(field);
        }

        self.slot
            .restart(&self.ctx, &self.collection, &self.state, Vec::new(), |live| {
                let listener = scheduled_listener(
                    self.ctx.scheduler(),
                    &self.state,
                    live,
                    self.collection.clone(),
                    snapshot_records,
                );
                self.ctx.store().listen_query(&query, listener)
            });
    }

    /// Create a document. Returns the id the store assigned.
    pub fn add(&self, payload: Fields) -> Result<DocumentId> {
        self.gateway.add(payload)
    }

    pub fn add_serialized<S: Serialize>(&self, payload: &S) -> Result<DocumentId> {
        let fields = to_fields(payload).map_err(|e| self.gateway.fail(MutationKind::Add, &e))?;
        self.gateway.add(fields)
    }

    /// Overwrite the given fields of an existing document.
    pub fn update(&self, id: &str, partial: Fields) -> Result<()> {
        self.gateway.update(id, partial)
    }

    pub fn update_serialized<S: Serialize>(&self, id: &str, partial: &S) -> Result<()> {
        let fields =
            to_fields(partial).map_err(|e| self.gateway.fail(MutationKind::Update, &e))?;
        self.gateway.update(id, fields)
    }

    pub fn remove(&self, id: &str) -> Result<()> {
        self.gateway.remove(id)
    }

    /// Mirrored record by id.
    pub fn get(&self, id: &str) -> Option<Record> {
        self.state
            .with_data(|records| records.iter().find(|r| r.id.as_str() == id).cloned())
    }
}

impl LiveResource for CollectionSync {
    type Data = Vec<Record>;

    fn state(&self) -> &SyncState<Vec<Record>> {
        &self.state
    }

    fn is_listening(&self) -> bool {
        self.slot.is_listening()
    }

    fn stop_listening(&self) {
        self.slot.stop();
    }
}
