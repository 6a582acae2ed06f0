//! Mirror of a single document.

use crate::config::DocumentUpdateMode;
use crate::context::SyncContext;
use crate::error::{MutationKind, Result};
use crate::lifecycle::LifecycleScope;
use crate::mutations::MutationGateway;
use crate::path::StorePath;
use crate::remote::DocumentSnapshot;
use crate::state::SyncState;
use crate::types::{to_fields, Fields};
use serde::Serialize;

use super::{scheduled_listener, ListenerSlot, LiveResource};

/// A missing document mirrors as an empty map.
fn snapshot_fields(snapshot: DocumentSnapshot) -> Fields {
    snapshot.fields.unwrap_or_default()
}

/// Mirrors one document's fields, e.g. a tenant's settings.
pub struct DocumentSync {
    ctx: SyncContext,
    document: StorePath,
    document_id: String,
    state: SyncState<Fields>,
    gateway: MutationGateway<Fields>,
    slot: ListenerSlot,
}

impl DocumentSync {
    /// Mirror the configured default document of `resource`.
    pub fn new(ctx: &SyncContext, resource: &str, scope: &LifecycleScope) -> Self {
        let document_id = ctx.config().default_document_id.clone();
        Self::with_document(ctx, resource, &document_id, scope)
    }

    pub fn with_document(
        ctx: &SyncContext,
        resource: &str,
        document_id: &str,
        scope: &LifecycleScope,
    ) -> Self {
        let collection = ctx.resolver().collection(resource);
        let document = collection.child(document_id);
        let state = SyncState::new(Fields::new());
        let gateway = MutationGateway::new(ctx, collection, state.clone());
        Self {
            ctx: ctx.clone(),
            document,
            document_id: document_id.to_string(),
            state,
            gateway,
            slot: ListenerSlot::new(scope),
        }
    }

    pub fn document(&self) -> &StorePath {
        &self.document
    }

    /// Open the live query on the document.
    ///
    /// Never fails: setup errors are reported through the state.
    pub fn start_listening(&self) {
        self.slot
            .restart(&self.ctx, &self.document, &self.state, Fields::new(), |live| {
                let listener = scheduled_listener(
                    self.ctx.scheduler(),
                    &self.state,
                    live,
                    self.document.clone(),
                    snapshot_fields,
                );
                self.ctx.store().listen_document(&self.document, listener)
            });
    }

    /// Merge `partial` into the document, creating it if needed. Fields not
    /// named are never removed.
    ///
    /// With [`DocumentUpdateMode::LocalSnapshot`] the mirrored fields are
    /// written back too, so a concurrent writer's change to them is lost.
    pub fn update(&self, partial: Fields) -> Result<()> {
        let fields = match self.ctx.config().document_update {
            DocumentUpdateMode::PartialMerge => partial,
            DocumentUpdateMode::LocalSnapshot => {
                let mut merged = self.state.data();
                merged.extend(partial);
                merged
            }
        };
        self.gateway.merge(&self.document_id, fields)
    }

    pub fn update_serialized<S: Serialize>(&self, partial: &S) -> Result<()> {
        let fields = to_fields(partial).map_err(|e| self.gateway.fail(MutationKind::Merge, &e))?;
        self.update(fields)
    }

    /// Delete the document. The mirror then holds an empty map.
    pub fn remove(&self) -> Result<()> {
        self.gateway.remove(&self.document_id)
    }
}

impl LiveResource for DocumentSync {
    type Data = Fields;

    fn state(&self) -> &SyncState<Fields> {
        &self.state
    }

    fn is_listening(&self) -> bool {
        self.slot.is_listening()
    }

    fn stop_listening(&self) {
        self.slot.stop();
    }
}
