//! Error handling and edge case tests.

use livemirror::{
    CollectionSync, DocumentSync, EventLoop, Fields, LifecycleScope, LiveResource,
    MemoryStore, MutationKind, StorePath, SyncConfig, SyncContext, SyncError,
};
use serde_json::{json, Value};
use std::sync::Arc;

fn fields(value: Value) -> Fields {
    match value {
        Value::Object(map) => map,
        _ => panic!("not an object"),
    }
}

fn context(store: &Arc<MemoryStore>, event_loop: &EventLoop, tenant: &str) -> SyncContext {
    SyncContext::new(
        store.clone(),
        Arc::new(event_loop.handle()),
        SyncConfig::new(tenant),
    )
    .unwrap()
}

// --- Subscription Errors ---

#[test]
fn test_setup_failure_on_bad_path() {
    let store = Arc::new(MemoryStore::new());
    let event_loop = EventLoop::new();
    let ctx = context(&store, &event_loop, "t1");
    let scope = LifecycleScope::new("list");

    // Empty resource name makes a malformed path
    let tasks = CollectionSync::new(&ctx, "", &scope);
    tasks.start_listening(None);

    // Reported synchronously, not returned
    assert!(!tasks.loading());
    assert!(tasks.error().unwrap().starts_with("Invalid path"));
    assert!(tasks.data().is_empty());
    assert!(!tasks.is_listening());
    assert_eq!(store.listener_count(), 0);
    assert_eq!(scope.active_count(), 0);
}

#[test]
fn test_setup_failure_on_rejected_listen() {
    let store = Arc::new(MemoryStore::new());
    let event_loop = EventLoop::new();
    let ctx = context(&store, &event_loop, "t1");
    let scope = LifecycleScope::new("settings");
    let settings = DocumentSync::new(&ctx, "settings", &scope);

    store.reject_listens("quota exceeded");
    settings.start_listening();
    assert_eq!(settings.error().as_deref(), Some("quota exceeded"));
    assert!(!settings.loading());

    // Retrying after the store recovers clears the error
    store.accept_listens();
    settings.start_listening();
    assert_eq!(settings.error(), None);
    assert!(settings.loading());
    event_loop.run_until_idle();
    assert!(!settings.loading());
}

#[test]
fn test_notification_error_keeps_last_data() {
    let store = Arc::new(MemoryStore::new());
    let event_loop = EventLoop::new();
    let ctx = context(&store, &event_loop, "t1");
    let scope = LifecycleScope::new("list");
    let tasks = CollectionSync::new(&ctx, "tasks", &scope);

    tasks.start_listening(None);
    tasks.add(fields(json!({"n": 1}))).unwrap();
    event_loop.run_until_idle();
    assert_eq!(tasks.data().len(), 1);

    let revoked = store.revoke(&ctx.resolver().tenant(), "membership revoked");
    assert_eq!(revoked, 1);
    event_loop.run_until_idle();

    assert_eq!(
        tasks.error().as_deref(),
        Some("Permission denied: membership revoked")
    );
    assert!(!tasks.loading());
    assert_eq!(tasks.data().len(), 1);

    // The store dropped the listener, so the subscription is over too
    assert_eq!(store.listener_count(), 0);
    assert!(!tasks.is_listening());
    assert_eq!(scope.active_count(), 0);

    // Cancelling an errored subscription is still fine
    tasks.stop_listening();
    assert_eq!(scope.teardown(), 0);
}

#[test]
fn test_document_notification_error_keeps_last_data() {
    let store = Arc::new(MemoryStore::new());
    let event_loop = EventLoop::new();
    let ctx = context(&store, &event_loop, "t1");
    let scope = LifecycleScope::new("settings");
    let settings = DocumentSync::new(&ctx, "settings", &scope);

    settings.start_listening();
    settings.update(fields(json!({"theme": "dark"}))).unwrap();
    event_loop.run_until_idle();
    assert_eq!(settings.data()["theme"], json!("dark"));

    assert_eq!(store.revoke(settings.document(), "settings locked"), 1);
    assert!(settings.is_listening());
    event_loop.run_until_idle();

    assert_eq!(
        settings.error().as_deref(),
        Some("Permission denied: settings locked")
    );
    assert!(!settings.loading());
    assert_eq!(settings.data()["theme"], json!("dark"));
    assert!(!settings.is_listening());
    assert_eq!(scope.active_count(), 0);

    // Restarting recovers
    settings.start_listening();
    assert!(settings.loading());
    assert!(settings.data().is_empty());
    event_loop.run_until_idle();
    assert_eq!(settings.error(), None);
    assert_eq!(settings.data()["theme"], json!("dark"));
    assert!(settings.is_listening());
}

#[test]
fn test_loading_never_returns_without_restart() {
    let store = Arc::new(MemoryStore::new());
    let event_loop = EventLoop::new();
    let ctx = context(&store, &event_loop, "t1");
    let scope = LifecycleScope::new("list");
    let tasks = CollectionSync::new(&ctx, "tasks", &scope);

    tasks.start_listening(None);
    event_loop.run_until_idle();
    for i in 0..3 {
        store.fail_next_write("flaky");
        let _ = tasks.add(fields(json!({ "n": i })));
        tasks.add(fields(json!({ "n": i }))).unwrap();
        event_loop.run_until_idle();
        assert!(!tasks.loading());
    }
}

// --- Mutation Errors ---

#[test]
fn test_mutation_error_recorded_and_returned() {
    let store = Arc::new(MemoryStore::new());
    let event_loop = EventLoop::new();
    let ctx = context(&store, &event_loop, "t1");
    let scope = LifecycleScope::new("list");
    let tasks = CollectionSync::new(&ctx, "tasks", &scope);
    tasks.start_listening(None);
    event_loop.run_until_idle();

    store.fail_next_write("network down");
    let err = tasks.add(fields(json!({"n": 1}))).unwrap_err();
    assert!(matches!(err, SyncError::Mutation { op: MutationKind::Add, .. }));
    assert_eq!(tasks.error().as_deref(), Some("Store unavailable: network down"));

    // A later good delivery clears it
    tasks.add(fields(json!({"n": 2}))).unwrap();
    event_loop.run_until_idle();
    assert_eq!(tasks.error(), None);
}

#[test]
fn test_update_unknown_id() {
    let store = Arc::new(MemoryStore::new());
    let event_loop = EventLoop::new();
    let ctx = context(&store, &event_loop, "t1");
    let scope = LifecycleScope::new("list");
    let tasks = CollectionSync::new(&ctx, "tasks", &scope);

    let err = tasks.update("nope", fields(json!({"a": 1}))).unwrap_err();
    assert_eq!(
        err,
        SyncError::Mutation {
            op: MutationKind::Update,
            message: "Document not found: teams/t1/tasks/nope".into()
        }
    );
}

#[test]
fn test_remove_with_empty_id_is_rejected() {
    let store = Arc::new(MemoryStore::new());
    let event_loop = EventLoop::new();
    let ctx = context(&store, &event_loop, "t1");
    let scope = LifecycleScope::new("list");
    let tasks = CollectionSync::new(&ctx, "tasks", &scope);

    let err = tasks.remove("").unwrap_err();
    assert!(matches!(err, SyncError::Mutation { op: MutationKind::Remove, .. }));
    assert!(tasks.error().unwrap().starts_with("Invalid path"));
}

#[test]
fn test_remove_missing_document_succeeds() {
    let store = Arc::new(MemoryStore::new());
    let event_loop = EventLoop::new();
    let ctx = context(&store, &event_loop, "t1");
    let scope = LifecycleScope::new("list");
    let tasks = CollectionSync::new(&ctx, "tasks", &scope);
    assert!(tasks.remove("never-existed").is_ok());
    assert_eq!(tasks.error(), None);
}

#[test]
fn test_document_update_failure() {
    let store = Arc::new(MemoryStore::new());
    let event_loop = EventLoop::new();
    let ctx = context(&store, &event_loop, "t1");
    let scope = LifecycleScope::new("settings");
    let settings = DocumentSync::new(&ctx, "settings", &scope);
    settings.start_listening();
    event_loop.run_until_idle();

    store.fail_next_write("read-only");
    let err = settings.update(fields(json!({"a": 1}))).unwrap_err();
    assert!(matches!(err, SyncError::Mutation { op: MutationKind::Merge, .. }));
    assert!(settings.data().is_empty());
    assert_eq!(settings.error().as_deref(), Some("Store unavailable: read-only"));
    assert!(store.document(settings.document()).is_none());
}

// --- Configuration ---

#[test]
fn test_context_rejects_empty_tenant() {
    let store = Arc::new(MemoryStore::new());
    let event_loop = EventLoop::new();
    let result = SyncContext::new(store, Arc::new(event_loop.handle()), SyncConfig::new(""));
    assert!(matches!(result, Err(SyncError::Config(_))));
}

#[test]
fn test_custom_tenant_collection() {
    let store = Arc::new(MemoryStore::new());
    let config = SyncConfig::from_json_str(
        r#"{"tenant_id": "acme", "tenant_collection": "orgs", "created_field": "createdAt"}"#,
    )
    .unwrap();
    let event_loop = EventLoop::new();
    let ctx = SyncContext::new(store.clone(), Arc::new(event_loop.handle()), config).unwrap();
    let scope = LifecycleScope::new("list");
    let tasks = CollectionSync::new(&ctx, "tasks", &scope);

    let id = tasks.add(fields(json!({}))).unwrap();
    let path = StorePath::new(["orgs", "acme", "tasks", id.as_str()]);
    let doc = store.document(&path).unwrap();
    assert!(doc.contains_key("createdAt"));
    assert!(!doc.contains_key("timestamp"));
}
