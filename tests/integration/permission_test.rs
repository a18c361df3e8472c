//! Integration tests for effective mask resolution.

mod helpers;

use std::sync::Arc;

use pipehub_auth::{PermissionMaskService, ResolveOptions};
use pipehub_core::types::AclId;
use pipehub_database::MemoryQuotaRepository;
use pipehub_entity::entity::{EntityType, SecuredEntity};
use pipehub_entity::permission::AclPermission::*;
use pipehub_entity::permission::sid::{ROLE_ADMIN, ROLE_USER};
use pipehub_entity::permission::{
    ALL_PERMISSIONS_MASK, ALL_PERMISSIONS_MASK_FULL, Acl, ObjectIdentity, Sid,
};
use pipehub_entity::storage::NfsMountStatus;

use helpers::{FailingStore, TestApp, folder, folder_acl, folder_id, pipeline, user, user_in};

#[tokio::test]
async fn test_unresolved_permission_continues_to_parent() {
    let parent = folder_acl(1, "root").with_entry(Sid::user_role(), Read.mask() | Write.mask());
    let child = folder_acl(2, "root")
        .with_parent(folder_id(1))
        .with_entry(Sid::user_role(), Read.mask());
    let app = TestApp::with_acls(vec![parent, child]);

    let entity = folder(2, "root").with_parent(folder_id(1));
    let sids = vec![Sid::authority(ROLE_USER)];
    let mask = app
        .engine
        .resolver()
        .resolve(&entity, &sids, ResolveOptions::merged())
        .await;

    assert_eq!(mask, Read.simple_mask() | Write.simple_mask());
}

#[tokio::test]
async fn test_closer_denial_beats_farther_grant() {
    let parent = folder_acl(1, "root").with_entry(Sid::principal("alice"), Write.mask());
    let child = folder_acl(2, "root")
        .with_parent(folder_id(1))
        .with_entry(Sid::user_role(), NoWrite.mask());
    let app = TestApp::with_acls(vec![parent, child]);

    let mask = app
        .engine
        .resolver()
        .resolve(&folder(2, "root"), &user("alice"), ResolveOptions::extended())
        .await;

    assert!(PermissionMaskService::contains_opposite_mask(mask, Write));
    assert!(!PermissionMaskService::is_granted(mask, Write));
}

#[tokio::test]
async fn test_principal_sid_is_consulted_before_groups() {
    let acl = folder_acl(1, "root")
        .with_entry(Sid::authority("LAB"), NoExecute.mask() | Read.mask())
        .with_entry(Sid::principal("alice"), Execute.mask() | NoRead.mask());
    let app = TestApp::with_acls(vec![acl]);

    let mask = app
        .engine
        .resolver()
        .resolve(
            &folder(1, "root"),
            &user_in("alice", &["LAB"]),
            ResolveOptions::extended(),
        )
        .await;

    assert_eq!(mask, Execute.mask() | NoRead.mask());
}

#[tokio::test]
async fn test_owner_and_admin_always_get_full_mask() {
    let acl = folder_acl(1, "alice")
        .with_entry(Sid::principal("alice"), NoRead.mask() | NoWrite.mask() | NoExecute.mask())
        .with_entry(Sid::admin(), NoRead.mask());
    let app = TestApp::with_acls(vec![acl]);
    let entity = folder(1, "alice");
    let resolver = app.engine.resolver();

    for options in [ResolveOptions::merged(), ResolveOptions::extended()] {
        let expected = PermissionMaskService::full_mask(options.merge);
        assert_eq!(resolver.resolve(&entity, &user("alice"), options).await, expected);
        assert_eq!(
            resolver
                .resolve(&entity, &user_in("bob", &[ROLE_ADMIN]), options)
                .await,
            expected
        );
    }
}

#[tokio::test]
async fn test_read_only_mount_limits_storage_to_read() {
    let identity = ObjectIdentity::new(EntityType::DataStorage, 7);
    let acl = Acl::new(AclId::new(1), identity, Sid::principal("carol"))
        .with_entry(Sid::principal("alice"), Read.mask() | Write.mask() | Execute.mask());
    let app = TestApp::with_acls(vec![acl]);

    let storage = SecuredEntity::new(EntityType::DataStorage, 7, "carol")
        .with_mount_status(NfsMountStatus::ReadOnly);
    let mask = app
        .engine
        .resolver()
        .resolve(&storage, &user("alice"), ResolveOptions::merged())
        .await;
    assert_eq!(mask, Read.simple_mask());

    let active = storage.clone().with_mount_status(NfsMountStatus::Active);
    let mask = app
        .engine
        .resolver()
        .resolve(&active, &user("alice"), ResolveOptions::merged())
        .await;
    assert_eq!(mask, ALL_PERMISSIONS_MASK);
}

#[tokio::test]
async fn test_read_only_storage_without_read_stays_hidden() {
    let identity = ObjectIdentity::new(EntityType::DataStorage, 7);
    let acl = Acl::new(AclId::new(1), identity, Sid::principal("carol"))
        .with_entry(Sid::principal("alice"), Write.mask());
    let app = TestApp::with_acls(vec![acl]);

    let storage = SecuredEntity::new(EntityType::DataStorage, 7, "carol")
        .with_mount_status(NfsMountStatus::ReadOnly);
    let mask = app
        .engine
        .resolver()
        .resolve(&storage, &user("alice"), ResolveOptions::merged())
        .await;
    assert_eq!(mask, 0);
}

#[tokio::test]
async fn test_read_mode_quota_applies_to_storages_only() {
    let app = TestApp::new();
    app.apply_read_mode_quota("alice").await;
    let resolver = app.engine.resolver();

    let storage = SecuredEntity::new(EntityType::DataStorage, 7, "alice");
    assert_eq!(
        resolver
            .resolve(&storage, &user("alice"), ResolveOptions::merged())
            .await,
        Read.simple_mask()
    );

    let own_pipeline = pipeline(8, "alice");
    assert_eq!(
        resolver
            .resolve(&own_pipeline, &user("alice"), ResolveOptions::merged())
            .await,
        ALL_PERMISSIONS_MASK
    );
}

#[tokio::test]
async fn test_unregistered_entity_without_parent_is_invisible() {
    let app = TestApp::new();
    let orphan = pipeline(5, "bob");
    let resolver = app.engine.resolver();

    assert_eq!(
        resolver
            .resolve(&orphan, &user("alice"), ResolveOptions::merged())
            .await,
        0
    );
    assert_eq!(
        resolver
            .resolve(&orphan, &user("bob"), ResolveOptions::extended())
            .await,
        ALL_PERMISSIONS_MASK_FULL
    );
}

#[tokio::test]
async fn test_unregistered_run_inherits_from_parent_acl() {
    let parent = Acl::new(
        AclId::new(1),
        ObjectIdentity::new(EntityType::Pipeline, 3),
        Sid::principal("root"),
    )
    .with_entry(Sid::principal("alice"), Read.mask() | Execute.mask());
    let app = TestApp::with_acls(vec![parent]);

    let run = SecuredEntity::new(EntityType::PipelineRun, 99, "root")
        .with_parent(ObjectIdentity::new(EntityType::Pipeline, 3));
    let mask = app
        .engine
        .resolver()
        .resolve(&run, &user("alice"), ResolveOptions::merged())
        .await;

    assert_eq!(mask, Read.simple_mask() | Execute.simple_mask());
}

#[tokio::test]
async fn test_store_failure_denies_instead_of_failing() {
    let engine = helpers::engine_over(
        Arc::new(FailingStore),
        Arc::new(MemoryQuotaRepository::default()),
    );
    let resolver = engine.resolver();
    let entity = folder(1, "root");

    assert_eq!(
        resolver
            .resolve(&entity, &user("alice"), ResolveOptions::merged())
            .await,
        0
    );
    assert!(!resolver.permission_granted(&entity, Read, &user("alice")).await);

    let other = folder(2, "root");
    let masks = resolver
        .resolve_many(&[&entity, &other], &user("alice"), ResolveOptions::merged())
        .await;
    assert_eq!(masks.len(), 2);
    assert!(masks.values().all(|mask| *mask == 0));

    // Owner and admin decisions need no store access.
    assert_eq!(
        resolver
            .resolve(&entity, &user("root"), ResolveOptions::merged())
            .await,
        ALL_PERMISSIONS_MASK
    );
    assert_eq!(
        resolver
            .resolve(&entity, &user_in("x", &[ROLE_ADMIN]), ResolveOptions::merged())
            .await,
        ALL_PERMISSIONS_MASK
    );
}
