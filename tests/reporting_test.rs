mod common;

use common::{create_logger, create_running_tablet, wait_running, wait_until, TestNode};
use std::sync::Arc;
use tablet_manager::{
    Coordinator, DataState, DeleteRequest, Heartbeater, HeartbeaterConfig, OpId, RuntimeState, ServerRegistration,
    SplitRequest, TabletId,
};
use tokio::time::Duration;

fn heartbeater(node: &TestNode, coordinator: &Arc<Coordinator>, report_limit: usize) -> Arc<Heartbeater> {
    let config = HeartbeaterConfig {
        ts_uuid: node.uuid(),
        registration: ServerRegistration {
            host: "127.0.0.1".into(),
            port: 9100,
        },
        interval: Duration::from_millis(50),
        initial_report_limit: report_limit,
    };
    Heartbeater::new(create_logger(), config, node.manager.clone(), coordinator.clone())
}

#[tokio::test(flavor = "multi_thread")]
async fn first_heartbeat_registers_with_full_report() {
    // -- setup --
    let node = TestNode::start();
    create_running_tablet(&node, "tablet-1").await;
    create_running_tablet(&node, "tablet-2").await;
    let coordinator = Arc::new(Coordinator::new(create_logger()));
    let heartbeater = heartbeater(&node, &coordinator, 100);

    // -- execute --
    let outcome = heartbeater.heartbeat_once().await.unwrap();

    // -- verify --
    assert!(outcome.sent_full_report);
    assert_eq!(outcome.reported, 2);
    assert_eq!(outcome.remaining, 0);
    assert_eq!(outcome.acknowledged, 2);
    assert!(!heartbeater.needs_full_report());
    assert!(coordinator.registration(&node.uuid()).is_some());
    assert_eq!(coordinator.tablet_ids(&node.uuid()).len(), 2);
    assert_eq!(node.manager.num_dirty_tablets(), 0);

    let outcome = heartbeater.heartbeat_once().await.unwrap();
    assert!(!outcome.sent_full_report);
    assert_eq!(outcome.reported, 0);
    assert_eq!(coordinator.last_report_seq(&node.uuid()), Some(outcome.sequence_number));
}

#[tokio::test(flavor = "multi_thread")]
async fn report_limit_spreads_tablets_over_heartbeats() {
    // -- setup --
    let node = TestNode::start();
    for id in ["tablet-1", "tablet-2", "tablet-3"].iter() {
        create_running_tablet(&node, id).await;
    }
    let coordinator = Arc::new(Coordinator::new(create_logger()));
    coordinator.set_report_limit(Some(1));
    let heartbeater = heartbeater(&node, &coordinator, 1);

    // -- execute --
    let mut outcomes = Vec::new();
    for _ in 0..10 {
        let outcome = heartbeater.heartbeat_once().await.unwrap();
        let done = outcome.remaining == 0;
        outcomes.push(outcome);
        if done {
            break;
        }
    }

    // -- verify --
    assert!(outcomes.iter().all(|outcome| outcome.reported <= 1));
    assert_eq!(outcomes.first().unwrap().remaining, 2);
    assert_eq!(outcomes.last().unwrap().remaining, 0);
    assert_eq!(heartbeater.report_limit(), 1);
    assert_eq!(coordinator.tablet_ids(&node.uuid()).len(), 3);
    assert_eq!(node.manager.num_dirty_tablets(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn forgotten_server_registers_again() {
    // -- setup --
    let node = TestNode::start();
    let tablet_id = create_running_tablet(&node, "tablet-1").await;
    let coordinator = Arc::new(Coordinator::new(create_logger()));
    let heartbeater = heartbeater(&node, &coordinator, 100);
    heartbeater.heartbeat_once().await.unwrap();

    // -- execute --
    coordinator.forget_server(&node.uuid());
    let rejected = heartbeater.heartbeat_once().await.unwrap();

    // -- verify --
    assert!(rejected.reregister_requested);
    assert_eq!(rejected.acknowledged, 0);
    assert!(heartbeater.needs_full_report());

    let outcome = heartbeater.heartbeat_once().await.unwrap();
    assert!(outcome.sent_full_report);
    assert!(coordinator.registration(&node.uuid()).is_some());
    assert_eq!(coordinator.tablet_ids(&node.uuid()), vec![tablet_id]);
}

#[tokio::test(flavor = "multi_thread")]
async fn tombstone_reaches_the_coordinator() {
    // -- setup --
    let node = TestNode::start();
    let tablet_id = create_running_tablet(&node, "tablet-1").await;
    let coordinator = Arc::new(Coordinator::new(create_logger()));
    let heartbeater = heartbeater(&node, &coordinator, 100);
    heartbeater.heartbeat_once().await.unwrap();

    // -- execute --
    node.manager
        .delete_tablet(&DeleteRequest::new(tablet_id.clone(), DataState::Tombstoned))
        .unwrap();
    let outcome = heartbeater.heartbeat_once().await.unwrap();

    // -- verify --
    assert!(!outcome.sent_full_report);
    assert_eq!(outcome.reported, 1);
    let reported = coordinator.reported_tablet(&node.uuid(), &tablet_id).unwrap();
    assert_eq!(reported.data_state, DataState::Tombstoned);
    assert_eq!(reported.state, RuntimeState::Shutdown);
}

#[tokio::test(flavor = "multi_thread")]
async fn background_heartbeats_pick_up_new_tablets() {
    // -- setup --
    let node = TestNode::start();
    create_running_tablet(&node, "tablet-1").await;
    let coordinator = Arc::new(Coordinator::new(create_logger()));
    let stopper = heartbeater(&node, &coordinator, 100).start();
    let uuid = node.uuid();
    wait_until(Duration::from_secs(5), || coordinator.tablet_ids(&uuid).len() == 1).await;

    // -- execute --
    create_running_tablet(&node, "tablet-2").await;

    // -- verify --
    wait_until(Duration::from_secs(5), || coordinator.tablet_ids(&uuid).len() == 2).await;
    drop(stopper);
}

#[tokio::test(flavor = "multi_thread")]
async fn split_parent_is_handed_to_coordinator_once_children_run() {
    // -- setup --
    let node = TestNode::start();
    let parent_id = create_running_tablet(&node, "parent").await;
    let coordinator = Arc::new(Coordinator::new(create_logger()));
    assert_eq!(node.manager.cleanup_split_tablets(&*coordinator).await, 0);

    let request = SplitRequest {
        parent_id: parent_id.clone(),
        split_op_id: OpId::new(1, 2),
        child_ids: [TabletId::new("child-a"), TabletId::new("child-b")],
        split_partition_key: b"m".to_vec(),
        split_encoded_key: b"m".to_vec(),
    };
    node.manager.split_tablet(request.clone()).await.unwrap();
    for child_id in request.child_ids.iter() {
        wait_running(&node.manager, child_id).await;
    }

    // -- execute --
    let handed_off = node.manager.cleanup_split_tablets(&*coordinator).await;

    // -- verify --
    assert_eq!(handed_off, 1);
    assert_eq!(coordinator.deleted_not_serving_tablets(), vec![parent_id]);
}

#[tokio::test(flavor = "multi_thread")]
async fn verification_fails_replicas_with_missing_data() {
    // -- setup --
    let node = TestNode::start();
    let healthy = create_running_tablet(&node, "tablet-healthy").await;
    let broken = create_running_tablet(&node, "tablet-broken").await;
    let broken_handle = node.manager.lookup_tablet(&broken).unwrap();
    std::fs::remove_dir_all(broken_handle.metadata().data_dir()).unwrap();

    // -- execute --
    let failed = node.manager.verify_tablet_data().await;

    // -- verify --
    assert_eq!(failed, 1);
    assert_eq!(broken_handle.state(), RuntimeState::Failed);
    assert!(broken_handle.error().unwrap().contains("Data verification failed"));
    assert_eq!(node.manager.lookup_tablet(&healthy).unwrap().state(), RuntimeState::Running);
    assert!(node.manager.registry().is_dirty(&broken));
}
