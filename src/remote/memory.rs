//! In-process remote store.
//!
//! Holds documents in memory, serves live queries and re-broadcasts the
//! affected results after every committed write. Writes and deliveries are
//! serialized by one lock, so every listener observes changes in commit
//! order.

use crate::error::{Result, SyncError};
use crate::path::StorePath;
use crate::types::{DocumentId, Fields, Record, Timestamp};
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use super::{
    DocumentListener, DocumentSnapshot, ListenerId, Query, QueryListener, QuerySnapshot,
    RemoteStore,
};

/// Length of generated document ids (hex characters).
const GENERATED_ID_LEN: usize = 20;

type QueryCallback = Arc<dyn Fn(Result<QuerySnapshot>) + Send + Sync>;
type DocumentCallback = Arc<dyn Fn(Result<DocumentSnapshot>) + Send + Sync>;

/// Internal registration state.
enum Listener {
    Query {
        query: Query,
        callback: QueryCallback,
    },
    Document {
        path: StorePath,
        callback: DocumentCallback,
    },
}

impl Listener {
    fn path(&self) -> &StorePath {
        match self {
            Listener::Query { query, .. } => &query.collection,
            Listener::Document { path, .. } => path,
        }
    }
}

/// A pending call to one listener, built under the locks and run after.
enum Delivery {
    Query(QueryCallback, Result<QuerySnapshot>),
    Document(DocumentCallback, Result<DocumentSnapshot>),
}

impl Delivery {
    fn run(self) {
        match self {
            Delivery::Query(callback, result) => callback(result),
            Delivery::Document(callback, result) => callback(result),
        }
    }
}

#[derive(Default)]
struct Faults {
    next_write: Option<String>,
    listens: Option<String>,
}

/// Documents per collection, each collection in document-id order.
type Collections = BTreeMap<StorePath, BTreeMap<DocumentId, Fields>>;

/// In-memory [`RemoteStore`].
pub struct MemoryStore {
    collections: RwLock<Collections>,
    listeners: RwLock<HashMap<ListenerId, Listener>>,
    next_listener_id: AtomicU64,
    /// Feeds generated document ids.
    next_sequence: AtomicU64,
    faults: Mutex<Faults>,
    /// Serializes commits with their deliveries.
    write_lock: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            collections: RwLock::new(BTreeMap::new()),
            listeners: RwLock::new(HashMap::new()),
            next_listener_id: AtomicU64::new(1),
            next_sequence: AtomicU64::new(1),
            faults: Mutex::new(Faults::default()),
            write_lock: Mutex::new(()),
        }
    }

    // --- Fault Injection ---

    /// Fail the next write with `Unavailable(message)`.
    pub fn fail_next_write(&self, message: impl Into<String>) {
        self.faults.lock().next_write = Some(message.into());
    }

    /// Refuse every new listener until [`accept_listens`](Self::accept_listens).
    pub fn reject_listens(&self, message: impl Into<String>) {
        self.faults.lock().listens = Some(message.into());
    }

    pub fn accept_listens(&self) {
        self.faults.lock().listens = None;
    }

    /// Deliver `PermissionDenied(message)` to every listener under `prefix`
    /// and drop them. Returns how many were revoked.
    pub fn revoke(&self, prefix: &StorePath, message: impl Into<String>) -> usize {
        let _lock = self.write_lock.lock();
        let message = message.into();

        let revoked: Vec<Listener> = {
            let mut listeners = self.listeners.write();
            let ids: Vec<ListenerId> = listeners
                .iter()
                .filter(|(_, l)| l.path().starts_with(prefix))
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter()
                .filter_map(|id| listeners.remove(&id))
                .collect()
        };

        let count = revoked.len();
        for listener in revoked {
            let err = SyncError::PermissionDenied(message.clone());
            match listener {
                Listener::Query { callback, .. } => callback(Err(err)),
                Listener::Document { callback, .. } => callback(Err(err)),
            }
        }
        debug!(prefix = %prefix, count, "revoked listeners");
        count
    }

    // --- Inspection ---

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Fields of one document, if it exists.
    pub fn document(&self, path: &StorePath) -> Option<Fields> {
        let (collection, id) = split_document(path)?;
        self.collections
            .read()
            .get(&collection)
            .and_then(|docs| docs.get(&id))
            .cloned()
    }

    /// All documents of a collection in id order.
    pub fn documents(&self, collection: &StorePath) -> Vec<Record> {
        self.collections
            .read()
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Record::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    // --- Internals ---

    fn take_write_fault(&self) -> Result<()> {
        match self.faults.lock().next_write.take() {
            Some(message) => Err(SyncError::Unavailable(message)),
            None => Ok(()),
        }
    }

    fn check_listens(&self) -> Result<()> {
        match &self.faults.lock().listens {
            Some(message) => Err(SyncError::SubscriptionSetup(message.clone())),
            None => Ok(()),
        }
    }

    fn generate_id(
        &self,
        collection: &StorePath,
        existing: &BTreeMap<DocumentId, Fields>,
    ) -> DocumentId {
        loop {
            let sequence = self.next_sequence.fetch_add(1, Ordering::SeqCst);
            let mut hasher = Sha256::new();
            hasher.update(collection.to_string().as_bytes());
            hasher.update(sequence.to_le_bytes());
            hasher.update(Timestamp::now().0.to_le_bytes());
            let digest = hex::encode(hasher.finalize());
            let id = DocumentId(digest[..GENERATED_ID_LEN].to_string());
            if !existing.contains_key(&id) {
                return id;
            }
        }
    }

    fn query_snapshot(collections: &Collections, query: &Query) -> QuerySnapshot {
        let documents = collections
            .get(&query.collection)
            .map(|docs| {
                query.apply(
                    docs.iter()
                        .map(|(id, fields)| Record::new(id.clone(), fields.clone())),
                )
            })
            .unwrap_or_default();
        QuerySnapshot { documents }
    }

    fn document_snapshot(collections: &Collections, path: &StorePath) -> DocumentSnapshot {
        let id = DocumentId(path.last().unwrap_or_default().to_string());
        let fields = path
            .parent()
            .and_then(|collection| collections.get(&collection))
            .and_then(|docs| docs.get(&id))
            .cloned();
        DocumentSnapshot { id, fields }
    }

    /// Deliver fresh results to every listener watching `document` or its
    /// collection. Caller holds the write lock.
    fn broadcast(&self, collection: &StorePath, document: &StorePath) {
        let deliveries: Vec<Delivery> = {
            let collections = self.collections.read();
            let listeners = self.listeners.read();
            listeners
                .values()
                .filter_map(|listener| match listener {
                    Listener::Query { query, callback } if &query.collection == collection => {
                        Some(Delivery::Query(
                            Arc::clone(callback),
                            Ok(Self::query_snapshot(&collections, query)),
                        ))
                    }
                    Listener::Document { path, callback } if path == document => {
                        Some(Delivery::Document(
                            Arc::clone(callback),
                            Ok(Self::document_snapshot(&collections, path)),
                        ))
                    }
                    _ => None,
                })
                .collect()
        };

        for delivery in deliveries {
            delivery.run();
        }
    }

    fn register(&self, listener: Listener) -> ListenerId {
        let id = ListenerId(self.next_listener_id.fetch_add(1, Ordering::SeqCst));
        self.listeners.write().insert(id, listener);
        id
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn split_document(path: &StorePath) -> Option<(StorePath, DocumentId)> {
    if !path.is_document() {
        return None;
    }
    let id = DocumentId(path.last()?.to_string());
    Some((path.parent()?, id))
}

fn document_parts(path: &StorePath) -> Result<(StorePath, DocumentId)> {
    path.validate_document()?;
    split_document(path).ok_or_else(|| SyncError::InvalidPath(path.to_string()))
}

impl RemoteStore for MemoryStore {
    fn listen_query(&self, query: &Query, listener: QueryListener) -> Result<ListenerId> {
        query.collection.validate_collection()?;
        if let Some(field) = &query.order_by {
            if field.is_empty() {
                return Err(SyncError::InvalidPath(format!(
                    "{}: empty sort field",
                    query.collection
                )));
            }
        }
        self.check_listens()?;

        let _lock = self.write_lock.lock();
        let callback: QueryCallback = Arc::from(listener);
        let id = self.register(Listener::Query {
            query: query.clone(),
            callback: Arc::clone(&callback),
        });
        let initial = Self::query_snapshot(&self.collections.read(), query);
        debug!(?id, collection = %query.collection, "query listener registered");
        callback(Ok(initial));
        Ok(id)
    }

    fn listen_document(
        &self,
        path: &StorePath,
        listener: DocumentListener,
    ) -> Result<ListenerId> {
        path.validate_document()?;
        self.check_listens()?;

        let _lock = self.write_lock.lock();
        let callback: DocumentCallback = Arc::from(listener);
        let id = self.register(Listener::Document {
            path: path.clone(),
            callback: Arc::clone(&callback),
        });
        let initial = Self::document_snapshot(&self.collections.read(), path);
        debug!(?id, document = %path, "document listener registered");
        callback(Ok(initial));
        Ok(id)
    }

    fn unlisten(&self, id: ListenerId) {
        if self.listeners.write().remove(&id).is_some() {
            debug!(?id, "listener removed");
        }
    }

    fn add(&self, collection: &StorePath, fields: Fields) -> Result<DocumentId> {
        collection.validate_collection()?;
        let _lock = self.write_lock.lock();
        self.take_write_fault()?;

        let id = {
            let mut collections = self.collections.write();
            let docs = collections.entry(collection.clone()).or_default();
            let id = self.generate_id(collection, docs);
            docs.insert(id.clone(), fields);
            id
        };

        self.broadcast(collection, &collection.child(id.as_str()));
        Ok(id)
    }

    fn update(&self, document: &StorePath, fields: Fields) -> Result<()> {
        let (collection, id) = document_parts(document)?;
        let _lock = self.write_lock.lock();
        self.take_write_fault()?;

        {
            let mut collections = self.collections.write();
            let existing = collections
                .get_mut(&collection)
                .and_then(|docs| docs.get_mut(&id))
                .ok_or_else(|| SyncError::DocumentNotFound(document.to_string()))?;
            existing.extend(fields);
        }

        self.broadcast(&collection, document);
        Ok(())
    }

    fn set_merge(&self, document: &StorePath, fields: Fields) -> Result<()> {
        let (collection, id) = document_parts(document)?;
        let _lock = self.write_lock.lock();
        self.take_write_fault()?;

        self.collections
            .write()
            .entry(collection.clone())
            .or_default()
            .entry(id)
            .or_default()
            .extend(fields);

        self.broadcast(&collection, document);
        Ok(())
    }

    fn delete(&self, document: &StorePath) -> Result<()> {
        let (collection, id) = document_parts(document)?;
        let _lock = self.write_lock.lock();
        self.take_write_fault()?;

        let removed = self
            .collections
            .write()
            .get_mut(&collection)
            .and_then(|docs| docs.remove(&id))
            .is_some();

        if removed {
            self.broadcast(&collection, document);
        }
        Ok(())
    }
}
