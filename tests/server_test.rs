mod common;

use common::{create_logger, raft_config, table, wait_running, wait_until, whole_partition};
use std::error::Error;
use std::sync::Arc;
use tablet_manager::{
    shutdown_signal, try_create_tablet_server, BootstrapSource, Coordinator, CoordinatorService, DataState, FsOptions,
    RemoteBootstrapRequest, RuntimeState, TabletId, TabletServer, TabletServerConfig,
};
use tempfile::TempDir;
use tokio::time::Duration;
use tonic::transport::Server;

async fn start_tablet_server(dir: &TempDir, port: u16, coordinator_port: u16) -> Result<TabletServer, Box<dyn Error>> {
    let config = TabletServerConfig {
        info_logger: create_logger(),
        fs: FsOptions::single_root(dir.path()),
        rpc_bind_addr: format!("127.0.0.1:{}", port).parse()?,
        advertised_host: "127.0.0.1".into(),
        coordinator_addr: Some(format!("127.0.0.1:{}", coordinator_port)),
        heartbeat_interval: Duration::from_millis(100),
        options: common::test_options(),
        fault_injection: Default::default(),
    };
    Ok(try_create_tablet_server(config).await?)
}

#[tokio::test(flavor = "multi_thread")]
async fn servers_heartbeat_and_bootstrap_over_grpc() -> Result<(), Box<dyn Error>> {
    // -- setup --
    let coordinator_port = 47100;
    let coordinator = Arc::new(Coordinator::new(create_logger()));
    let (coordinator_shutdown, coordinator_signal) = shutdown_signal();
    let coordinator_service = CoordinatorService::new(create_logger(), coordinator.clone());
    tokio::spawn(
        Server::builder()
            .add_service(coordinator_service.into_server())
            .serve_with_shutdown(format!("127.0.0.1:{}", coordinator_port).parse()?, coordinator_signal),
    );
    tokio::time::sleep(Duration::from_millis(200)).await;

    let (source_dir, destination_dir) = (tempfile::tempdir()?, tempfile::tempdir()?);
    let source = start_tablet_server(&source_dir, 47101, coordinator_port).await?;
    let destination = start_tablet_server(&destination_dir, 47102, coordinator_port).await?;
    let source_uuid = source.manager().local_uuid().to_string();
    let destination_uuid = destination.manager().local_uuid().to_string();
    wait_until(Duration::from_secs(5), || {
        coordinator.registration(&source_uuid).is_some() && coordinator.registration(&destination_uuid).is_some()
    })
    .await;

    // -- execute --
    let tablet_id = TabletId::new("tablet-grpc");
    source.manager().create_new_tablet(
        &table(),
        &tablet_id,
        whole_partition(),
        raft_config(&[&source_uuid, &destination_uuid], 1),
    )?;
    wait_running(source.manager(), &tablet_id).await;

    destination
        .manager()
        .start_remote_bootstrap(RemoteBootstrapRequest {
            tablet_id: tablet_id.clone(),
            source: BootstrapSource {
                peer_uuid: source_uuid.clone(),
                private_addr: "127.0.0.1:47101".into(),
                broadcast_addr: String::new(),
            },
            caller_term: 1,
        })
        .await?;

    // -- verify --
    let handle = destination.manager().lookup_tablet(&tablet_id).unwrap();
    assert_eq!(handle.data_state(), DataState::Ready);
    assert_eq!(handle.state(), RuntimeState::Running);

    wait_until(Duration::from_secs(5), || {
        coordinator.tablet_ids(&source_uuid).contains(&tablet_id)
            && coordinator.tablet_ids(&destination_uuid).contains(&tablet_id)
    })
    .await;
    let reported = coordinator.reported_tablet(&destination_uuid, &tablet_id).unwrap();
    assert_eq!(reported.data_state, DataState::Ready);

    // -- teardown --
    destination.shutdown().await;
    source.shutdown().await;
    coordinator_shutdown.shutdown();
    Ok(())
}
