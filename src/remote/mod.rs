//! Contract of the remote document store being mirrored.
//!
//! The store supports:
//! - Live queries over a collection, optionally ordered by one field descending
//! - Live queries over a single document
//! - Point writes: add, update, merge-write and delete
//!
//! Live listeners receive the full current result after every committed
//! change, in commit order. Delivering an error ends the listener.
//!
//! [`memory::MemoryStore`] is an in-process implementation.

pub mod memory;
mod query;

pub use query::{compare_values, Query};

use crate::error::Result;
use crate::path::StorePath;
use crate::types::{DocumentId, Fields, Record};
use std::fmt;

/// Identifier of one live-query registration inside a store.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

impl fmt::Debug for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ListenerId({})", self.0)
    }
}

/// Current result of a collection query.
#[derive(Clone, Debug, Default)]
pub struct QuerySnapshot {
    /// Documents in query order.
    pub documents: Vec<Record>,
}

impl QuerySnapshot {
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Current state of one document.
#[derive(Clone, Debug)]
pub struct DocumentSnapshot {
    pub id: DocumentId,
    /// `None` when the document does not exist.
    pub fields: Option<Fields>,
}

impl DocumentSnapshot {
    pub fn exists(&self) -> bool {
        self.fields.is_some()
    }
}

/// Receives every delivery of a collection query.
pub type QueryListener = Box<dyn Fn(Result<QuerySnapshot>) + Send + Sync>;

/// Receives every delivery of a document listener.
pub type DocumentListener = Box<dyn Fn(Result<DocumentSnapshot>) + Send + Sync>;

/// The remote store being mirrored.
///
/// Listeners may be invoked from any thread, including synchronously from
/// within `listen_*` or a write. They must not call back into the store.
pub trait RemoteStore: Send + Sync {
    /// Open a live query over a collection.
    fn listen_query(&self, query: &Query, listener: QueryListener) -> Result<ListenerId>;

    /// Open a live query over one document.
    fn listen_document(&self, path: &StorePath, listener: DocumentListener)
        -> Result<ListenerId>;

    /// Remove a registration. Unknown ids are ignored.
    fn unlisten(&self, id: ListenerId);

    /// Create a document with a store-assigned id.
    fn add(&self, collection: &StorePath, fields: Fields) -> Result<DocumentId>;

    /// Overwrite the given fields of an existing document.
    fn update(&self, document: &StorePath, fields: Fields) -> Result<()>;

    /// Write the given fields, creating the document if needed and leaving
    /// unmentioned fields untouched.
    fn set_merge(&self, document: &StorePath, fields: Fields) -> Result<()>;

    /// Delete a document. Deleting a missing document succeeds.
    fn delete(&self, document: &StorePath) -> Result<()>;
}
