//! Integration tests for permission-aware tree filtering.

mod helpers;

use std::sync::Arc;

use serde::Deserialize;

use pipehub_auth::{EventPublisher, PermissionEngine};
use pipehub_core::config::AppConfig;
use pipehub_database::{MemoryAclRepository, MemoryQuotaRepository};
use pipehub_entity::entity::{EntityType, SecuredEntity};
use pipehub_entity::permission::AclPermission::{self, *};
use pipehub_entity::permission::sid::ROLE_ADMIN;
use pipehub_entity::permission::{ALL_PERMISSIONS_MASK, Acl, ObjectIdentity, Sid};
use pipehub_entity::storage::{AppliedQuota, NfsMountStatus};

use helpers::{FailingStore, TestApp, folder, folder_acl, folder_id, pipeline, user, user_in};

/// Every kept node grants `required` itself or keeps visible content.
fn assert_only_visible(node: &SecuredEntity, required: AclPermission) {
    let granted = node.mask.unwrap_or(0) & required.simple_mask() != 0;
    assert!(
        granted || !node.is_empty(),
        "{:?} kept without permission or content",
        node.identity()
    );
    for leaf in &node.leaves {
        assert!(leaf.mask.unwrap_or(0) & required.simple_mask() != 0);
    }
    for child in &node.children {
        assert_only_visible(child, required);
    }
}

fn library() -> SecuredEntity {
    folder(1, "root")
        .with_child(
            folder(2, "root")
                .with_leaf(pipeline(20, "root"))
                .with_leaf(pipeline(21, "root")),
        )
        .with_child(folder(3, "root").with_child(folder(4, "root")))
        .with_leaf(pipeline(10, "alice"))
}

#[tokio::test]
async fn test_filtered_tree_contains_only_visible_nodes() {
    let acls = vec![
        folder_acl(2, "root").with_entry(Sid::user_role(), Read.mask()),
        Acl::new(
            pipehub_core::types::AclId::new(9),
            ObjectIdentity::new(EntityType::Pipeline, 21),
            Sid::principal("root"),
        )
        .with_entry(Sid::principal("alice"), NoRead.mask()),
    ];
    let app = TestApp::with_acls(acls);

    for required in [Read, Write, Execute] {
        if let Some(tree) = app
            .engine
            .filter()
            .filter_tree(&user("alice"), library(), required)
            .await
            .unwrap()
        {
            assert_only_visible(&tree, required);
        }
    }

    let tree = app
        .engine
        .filter()
        .filter_tree(&user("alice"), library(), Read)
        .await
        .unwrap()
        .unwrap();
    assert!(tree.find(&ObjectIdentity::new(EntityType::Pipeline, 20)).is_some());
    assert!(tree.find(&ObjectIdentity::new(EntityType::Pipeline, 21)).is_none());
    assert!(tree.find(&folder_id(3)).is_none());
    assert_eq!(tree.leaves[0].mask, Some(ALL_PERMISSIONS_MASK));
}

#[tokio::test]
async fn test_admin_sees_everything() {
    let app = TestApp::new();
    let tree = app
        .engine
        .filter()
        .filter_tree(&user_in("ops", &[ROLE_ADMIN]), library(), Write)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(tree.subtree_size(), library().subtree_size());
    assert_eq!(tree.children[1].children[0].mask, Some(ALL_PERMISSIONS_MASK));
}

#[tokio::test]
async fn test_read_mode_quota_hides_storage_from_writers() {
    let app = TestApp::with_acls(vec![
        folder_acl(1, "root").with_entry(Sid::principal("alice"), Read.mask() | Write.mask()),
    ]);
    let tree = folder(1, "root")
        .with_leaf(SecuredEntity::new(EntityType::DataStorage, 5, "root"))
        .with_leaf(
            SecuredEntity::new(EntityType::DataStorage, 6, "root")
                .with_mount_status(NfsMountStatus::ReadOnly),
        );

    let writable = app
        .engine
        .filter()
        .filter_tree(&user("alice"), tree.clone(), Write)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(writable.leaves.len(), 1);

    app.apply_read_mode_quota("alice").await;
    let writable = app
        .engine
        .filter()
        .filter_tree(&user("alice"), tree.clone(), Write)
        .await
        .unwrap()
        .unwrap();
    assert!(writable.leaves.is_empty());

    let readable = app
        .engine
        .filter()
        .filter_tree(&user("alice"), tree, Read)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(readable.leaves.len(), 2);
}

#[tokio::test]
async fn test_store_failure_hides_tree() {
    let engine = helpers::engine_over(
        Arc::new(FailingStore),
        Arc::new(MemoryQuotaRepository::default()),
    );
    let filtered = engine
        .filter()
        .filter_tree(&user("alice"), library(), Read)
        .await
        .unwrap();
    let tree = filtered.unwrap();

    // Only alice's own pipeline survives.
    assert!(tree.children.is_empty());
    assert_eq!(tree.leaves.len(), 1);
    assert_eq!(tree.leaves[0].owner, "alice");
}

#[derive(Debug, Deserialize)]
struct DemoFixture {
    acls: Vec<Acl>,
    tree: SecuredEntity,
    quotas: Vec<AppliedQuota>,
}

fn demo_engine() -> (DemoFixture, PermissionEngine) {
    let raw = std::fs::read_to_string("fixtures/demo.json").expect("demo fixture");
    let fixture: DemoFixture = serde_json::from_str(&raw).expect("valid demo fixture");
    let engine = PermissionEngine::new(
        &AppConfig::default(),
        Arc::new(MemoryAclRepository::with_acls(fixture.acls.clone())),
        Arc::new(MemoryQuotaRepository::new(fixture.quotas.clone())),
        EventPublisher::new(),
    )
    .expect("engine");
    (fixture, engine)
}

#[tokio::test]
async fn test_demo_fixture_read_view() {
    let (fixture, engine) = demo_engine();
    let tree = engine
        .filter()
        .filter_tree(&user("alice"), fixture.tree, Read)
        .await
        .unwrap()
        .unwrap();

    assert!(tree.find(&ObjectIdentity::new(EntityType::Pipeline, 10)).is_none());
    let archive = tree
        .find(&ObjectIdentity::new(EntityType::DataStorage, 21))
        .expect("read-only storage stays readable");
    assert_eq!(archive.mask, Some(Read.simple_mask()));
    assert!(tree.find(&ObjectIdentity::new(EntityType::Configuration, 30)).is_some());
}

#[tokio::test]
async fn test_demo_fixture_write_view() {
    let (fixture, engine) = demo_engine();
    let tree = engine
        .filter()
        .filter_tree(&user("alice"), fixture.tree, Write)
        .await
        .unwrap()
        .unwrap();

    assert_only_visible(&tree, Write);
    let pipeline = tree
        .find(&ObjectIdentity::new(EntityType::Pipeline, 10))
        .expect("writable pipeline");
    assert_eq!(pipeline.mask, Some(Write.simple_mask()));
    assert!(tree.find(&ObjectIdentity::new(EntityType::DataStorage, 21)).is_none());
    assert!(tree.find(&folder_id(3)).is_none());
}
