mod common;

use common::{create_running_tablet, table, wait_running, TestNode};
use tablet_manager::{
    ConsensusMetadata, DataState, DeleteRequest, FaultInjectionOptions, ManagerState, RuntimeState, Superblock,
    TabletId, TabletManagerError, TabletMetadata,
};

#[tokio::test(flavor = "multi_thread")]
async fn restart_reopens_every_tablet() {
    // -- setup --
    let mut node = TestNode::start();
    let first = create_running_tablet(&node, "tablet-1").await;
    let second = create_running_tablet(&node, "tablet-2").await;
    let data_dir = node.manager.lookup_tablet(&first).unwrap().metadata().data_dir();
    let uuid = node.uuid();

    // -- execute --
    node.restart(FaultInjectionOptions::default()).await;
    node.manager.wait_for_all_bootstraps_to_finish().await.unwrap();

    // -- verify --
    assert_eq!(node.uuid(), uuid);
    for tablet_id in [&first, &second].iter() {
        let handle = node.manager.lookup_tablet(tablet_id).unwrap();
        assert_eq!(handle.state(), RuntimeState::Running);
        assert_eq!(handle.data_state(), DataState::Ready);
    }
    assert_eq!(node.manager.lookup_tablet(&first).unwrap().metadata().data_dir(), data_dir);
    assert_eq!(node.manager.num_live_tablets(), 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn tombstone_is_registered_but_not_opened_after_restart() {
    // -- setup --
    let mut node = TestNode::start();
    let tablet_id = create_running_tablet(&node, "tablet-1").await;
    node.manager
        .delete_tablet(&DeleteRequest::new(tablet_id.clone(), DataState::Tombstoned))
        .unwrap();

    // -- execute --
    node.restart(FaultInjectionOptions::default()).await;
    node.manager.wait_for_all_bootstraps_to_finish().await.unwrap();

    // -- verify --
    let handle = node.manager.lookup_tablet(&tablet_id).unwrap();
    assert_eq!(handle.data_state(), DataState::Tombstoned);
    assert_eq!(handle.state(), RuntimeState::NotStarted);
    assert!(handle.runtime().is_none());
    assert!(ConsensusMetadata::exists(node.manager.layout(), &tablet_id));
}

#[tokio::test(flavor = "multi_thread")]
async fn deleted_tablet_stays_gone_after_restart() {
    // -- setup --
    let mut node = TestNode::start();
    let tablet_id = create_running_tablet(&node, "tablet-1").await;
    node.manager
        .delete_tablet(&DeleteRequest::new(tablet_id.clone(), DataState::Deleted))
        .unwrap();

    // -- execute --
    node.restart(FaultInjectionOptions::default()).await;

    // -- verify --
    assert!(node.manager.lookup_tablet(&tablet_id).is_none());
    assert!(node.manager.tablets().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn unfinished_creation_is_deleted_on_startup() {
    // -- setup --
    let mut node = TestNode::start();
    let layout = node.manager.layout().clone();
    let tablet_id = TabletId::new("tablet-half-created");
    let table = table();
    let metadata = TabletMetadata::persist(
        layout.clone(),
        Superblock {
            tablet_id: tablet_id.clone(),
            table_id: table.table_id,
            table_name: table.table_name,
            partition: Default::default(),
            key_bounds: Default::default(),
            data_state: DataState::InitStarted,
            data_root_dir: layout.data_roots()[0].clone(),
            wal_root_dir: layout.wal_roots()[0].clone(),
            hidden: false,
            split_parent_tablet_id: None,
            split_child_tablet_ids: Vec::new(),
            split_op_id: None,
            tombstone_last_logged_op_id: None,
            post_split_compaction_pending: false,
        },
    )
    .unwrap();
    std::fs::create_dir_all(metadata.data_dir()).unwrap();

    // -- execute --
    node.restart(FaultInjectionOptions::default()).await;

    // -- verify --
    assert!(node.manager.lookup_tablet(&tablet_id).is_none());
    assert!(!layout.superblock_path(&tablet_id).exists());
    assert!(!metadata.data_dir().exists());
}

#[tokio::test(flavor = "multi_thread")]
async fn forced_open_failure_is_surfaced() {
    // -- setup --
    let mut node = TestNode::start();
    let tablet_id = create_running_tablet(&node, "tablet-1").await;

    // -- execute --
    node.restart(FaultInjectionOptions {
        force_single_tablet_failure: true,
        ..Default::default()
    })
    .await;
    let result = node.manager.wait_for_all_bootstraps_to_finish().await;

    // -- verify --
    match result {
        Err(TabletManagerError::TabletFailed { tablet_id: failed, .. }) => assert_eq!(failed, tablet_id),
        other => panic!("Expected a failed tablet, got {:?}", other),
    }
    let handle = node.manager.lookup_tablet(&tablet_id).unwrap();
    assert_eq!(handle.state(), RuntimeState::Failed);
    assert!(handle.error().is_some());
}

#[tokio::test(flavor = "multi_thread")]
async fn shutdown_stops_replicas_and_is_idempotent() {
    // -- setup --
    let node = TestNode::start();
    let tablet_id = create_running_tablet(&node, "tablet-1").await;
    let handle = node.manager.lookup_tablet(&tablet_id).unwrap();

    // -- execute --
    node.manager.shutdown().await;
    node.manager.shutdown().await;

    // -- verify --
    assert_eq!(node.manager.state(), ManagerState::Shutdown);
    assert_eq!(handle.state(), RuntimeState::Shutdown);
    assert!(node.manager.lookup_tablet(&tablet_id).is_none());
}

#[tokio::test(flavor = "multi_thread")]
async fn tablets_open_in_the_background_after_init() {
    // -- setup --
    let mut node = TestNode::start();
    let ids: Vec<TabletId> = (0..5).map(|i| TabletId::new(format!("tablet-{}", i))).collect();
    for tablet_id in ids.iter() {
        create_running_tablet(&node, tablet_id.as_str()).await;
    }

    // -- execute --
    node.restart(FaultInjectionOptions::default()).await;

    // -- verify --
    for tablet_id in ids.iter() {
        wait_running(&node.manager, tablet_id).await;
    }
    assert_eq!(node.manager.num_tablets_pending_bootstrap(), 0);
}
