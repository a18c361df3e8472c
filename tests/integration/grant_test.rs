//! Integration tests for permission mutations.

mod helpers;

use std::sync::Arc;

use async_trait::async_trait;

use pipehub_auth::{EventPublisher, GrantPermissionHandler, ResolveOptions};
use pipehub_core::error::{AppError, ErrorKind};
use pipehub_core::events::{DomainEvent, PermissionEvent};
use pipehub_core::result::AppResult;
use pipehub_core::traits::EventSink;
use pipehub_database::MemoryAclRepository;
use pipehub_entity::permission::AclPermission::*;
use pipehub_entity::permission::sid::ROLE_USER;
use pipehub_entity::permission::{ALL_PERMISSIONS_MASK, Sid};

use helpers::{TestApp, folder, pipeline, user};

#[tokio::test]
async fn test_second_set_permission_wins_with_single_entry() {
    let mut app = TestApp::new();
    let entity = folder(1, "root");
    let grants = app.engine.grants();

    grants
        .set_permission(&entity, "alice", true, Read.mask())
        .await
        .unwrap();
    grants
        .set_permission(&entity, "alice", true, Write.mask() | NoRead.mask())
        .await
        .unwrap();

    let acl = app.acl_of(&entity).await.unwrap();
    let entries: Vec<_> = acl
        .entries
        .iter()
        .filter(|ace| ace.sid == Sid::principal("alice"))
        .collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].mask, Write.mask() | NoRead.mask());

    let events = app.drain_events();
    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[1],
        PermissionEvent::Granted { sid, mask, .. } if sid == "alice" && *mask == Write.mask() | NoRead.mask()
    ));
}

#[tokio::test]
async fn test_resolution_sees_mutation_through_cache() {
    let app = TestApp::new();
    let entity = folder(1, "root");
    let resolver = app.engine.resolver();

    app.engine
        .grants()
        .set_permission(&entity, ROLE_USER, false, Read.mask() | Execute.mask())
        .await
        .unwrap();
    assert_eq!(
        resolver
            .resolve(&entity, &user("alice"), ResolveOptions::merged())
            .await,
        Read.simple_mask() | Execute.simple_mask()
    );

    app.engine
        .grants()
        .set_permission(&entity, "alice", true, NoExecute.mask())
        .await
        .unwrap();
    assert_eq!(
        resolver
            .resolve(&entity, &user("alice"), ResolveOptions::merged())
            .await,
        Read.simple_mask()
    );

    app.engine.grants().delete_all_permissions(&entity).await.unwrap();
    assert_eq!(
        resolver
            .resolve(&entity, &user("alice"), ResolveOptions::merged())
            .await,
        0
    );
}

#[tokio::test]
async fn test_invalid_mask_is_rejected_before_any_write() {
    let mut app = TestApp::new();
    let entity = folder(1, "root");

    let err = app
        .engine
        .grants()
        .set_permission(&entity, "alice", true, Execute.mask() | NoExecute.mask())
        .await
        .unwrap_err();

    assert!(err.is(ErrorKind::InvalidMask));
    assert!(app.acl_of(&entity).await.is_none());
    assert!(app.drain_events().is_empty());
}

#[tokio::test]
async fn test_lock_unlock_restores_user_role_entries() {
    let app = TestApp::new();
    let grants = app.engine.grants();
    let mut tree = folder(1, "root")
        .with_child(folder(2, "root").with_leaf(pipeline(3, "root")))
        .with_leaf(pipeline(4, "root"));

    grants
        .set_permission(&tree, ROLE_USER, false, Read.mask())
        .await
        .unwrap();
    grants
        .set_permission(&tree.children[0], ROLE_USER, false, NoRead.mask())
        .await
        .unwrap();
    let before_root = app.acl_of(&tree).await.unwrap().entries;
    let before_child = app.acl_of(&tree.children[0]).await.unwrap().entries;

    let written = grants.lock_entity(&mut tree).await.unwrap();
    assert_eq!(written, 4);
    assert!(tree.children[0].leaves[0].locked);

    // Locked content is read-only for ordinary users.
    let mask = app
        .engine
        .resolver()
        .resolve(&tree.leaves[0], &user("alice"), ResolveOptions::extended())
        .await;
    assert!(!pipehub_auth::PermissionMaskService::is_granted(mask, Write));

    let err = grants
        .delete_permission(&tree, ROLE_USER, false)
        .await
        .unwrap_err();
    assert!(err.is(ErrorKind::Locked));

    grants.unlock_entity(&mut tree).await.unwrap();
    grants.unlock_entity(&mut tree.children[0]).await.unwrap();
    assert_eq!(app.acl_of(&tree).await.unwrap().entries, before_root);
    assert_eq!(app.acl_of(&tree.children[0]).await.unwrap().entries, before_child);
}

#[tokio::test]
async fn test_lock_unlock_restores_full_user_role_grant() {
    let app = TestApp::new();
    let grants = app.engine.grants();
    let resolver = app.engine.resolver();
    let mut entity = folder(1, "root");
    let full = Read.mask() | Write.mask() | Execute.mask();

    grants
        .set_permission(&entity, ROLE_USER, false, full)
        .await
        .unwrap();
    grants.lock_entity(&mut entity).await.unwrap();
    assert_eq!(
        resolver
            .resolve(&entity, &user("alice"), ResolveOptions::merged())
            .await,
        Read.simple_mask()
    );

    grants.unlock_entity(&mut entity).await.unwrap();
    let acl = app.acl_of(&entity).await.unwrap();
    assert_eq!(acl.entries.len(), 1);
    assert_eq!(acl.entries[0].sid, Sid::user_role());
    assert_eq!(acl.entries[0].mask, full);
    assert_eq!(
        resolver
            .resolve(&entity, &user("alice"), ResolveOptions::merged())
            .await,
        Read.simple_mask() | Write.simple_mask() | Execute.simple_mask()
    );
}

#[tokio::test]
async fn test_lock_publishes_one_event_per_entity() {
    let mut app = TestApp::new();
    let mut tree = folder(1, "root").with_leaf(pipeline(2, "root"));
    app.engine.grants().lock_entity(&mut tree).await.unwrap();

    let events = app.drain_events();
    assert_eq!(events.len(), 2);
    assert!(
        events
            .iter()
            .all(|e| matches!(e, PermissionEvent::Locked { .. }))
    );
}

#[tokio::test]
async fn test_change_owner_grants_full_access() {
    let app = TestApp::new();
    let entity = folder(1, "root");
    app.engine.grants().change_owner(&entity, "alice").await.unwrap();

    assert!(app.engine.resolver().is_owner(&entity, &user("alice")).await);
    assert_eq!(
        app.engine
            .resolver()
            .resolve(&entity, &user("alice"), ResolveOptions::merged())
            .await,
        ALL_PERMISSIONS_MASK
    );
}

#[tokio::test]
async fn test_delete_sid_removes_entries_everywhere() {
    let mut app = TestApp::new();
    let grants = app.engine.grants().clone();
    for id in 1..=3 {
        grants
            .set_permission(&folder(id, "root"), "LAB", false, Read.mask())
            .await
            .unwrap();
    }
    grants
        .set_permission(&folder(1, "root"), "alice", true, Write.mask())
        .await
        .unwrap();
    app.drain_events();

    let affected = grants.delete_sid("LAB", false).await.unwrap();
    assert_eq!(affected, 3);
    let root = app.acl_of(&folder(1, "root")).await.unwrap();
    assert_eq!(root.entries.len(), 1);
    assert_eq!(root.entries[0].sid, Sid::principal("alice"));

    let events = app.drain_events();
    assert!(matches!(
        events.as_slice(),
        [PermissionEvent::SidDeleted { affected_acls: 3, .. }]
    ));

    let err = grants.delete_sid("LAB", false).await.unwrap_err();
    assert!(err.is(ErrorKind::NotFound));
}

#[tokio::test]
async fn test_concurrent_grants_on_different_entities() {
    let app = TestApp::new();
    let grants = app.engine.grants();
    let (a, b) = (folder(1, "root"), folder(2, "root"));

    let (first, second) = tokio::join!(
        grants.set_permission(&a, "alice", true, Read.mask()),
        grants.set_permission(&b, "bob", true, Write.mask()),
    );
    assert!(first.is_ok() && second.is_ok());
    assert_eq!(app.store.len().await, 2);
}

#[derive(Debug)]
struct OfflineSink;

#[async_trait]
impl EventSink for OfflineSink {
    async fn publish(&self, _event: &DomainEvent) -> AppResult<()> {
        Err(AppError::internal("event bus offline"))
    }
}

#[tokio::test]
async fn test_failing_event_sink_does_not_fail_mutation() {
    let store = Arc::new(MemoryAclRepository::new());
    let grants = GrantPermissionHandler::new(store.clone())
        .with_publisher(EventPublisher::new().with_sink(Arc::new(OfflineSink)));
    let entity = folder(1, "root");

    let acl = grants
        .set_permission(&entity, "alice", true, Read.mask())
        .await
        .unwrap();
    assert_eq!(acl.entries.len(), 1);
    assert_eq!(store.len().await, 1);
}
