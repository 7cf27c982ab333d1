use chrono::Utc;
use slog::Drain;
use std::error::Error;
use std::fs::{self, OpenOptions};
use std::net::SocketAddr;
use tablet_manager::{FsOptions, TabletManagerOptions, TabletServerConfig};
use tokio::time::Duration;

/// Usage: `tablet-server <fs_root> <rpc_bind_addr> [coordinator_addr]`
///
/// Logs to stdout, or to a timestamped file under `$TABLET_SERVER_LOG_DIR` when set.
#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let mut args = std::env::args().skip(1);
    let fs_root = args.next().unwrap_or_else(|| "/tmp/tablet-server".to_string());
    let rpc_bind_addr: SocketAddr = args.next().unwrap_or_else(|| "127.0.0.1:9100".to_string()).parse()?;
    let coordinator_addr = args.next();

    let logger = match std::env::var("TABLET_SERVER_LOG_DIR") {
        Ok(dir) => create_root_logger_for_file(&dir)?,
        Err(_) => create_root_logger_for_stdout(),
    };
    let config = TabletServerConfig {
        info_logger: logger.clone(),
        fs: FsOptions::single_root(fs_root),
        rpc_bind_addr,
        advertised_host: rpc_bind_addr.ip().to_string(),
        coordinator_addr,
        heartbeat_interval: Duration::from_secs(1),
        options: TabletManagerOptions::default(),
        fault_injection: Default::default(),
    };

    let server = tablet_manager::try_create_tablet_server(config).await?;
    if let Err(e) = server.manager().wait_for_all_bootstraps_to_finish().await {
        slog::warn!(logger, "Not every tablet opened: {}", e);
    }
    slog::info!(logger, "Tablet server up with {} tablets", server.manager().tablets().len());

    tokio::signal::ctrl_c().await?;
    server.shutdown().await;
    Ok(())
}

fn create_root_logger_for_stdout() -> slog::Logger {
    let decorator = slog_term::TermDecorator::new().build();
    let drain = slog_term::FullFormat::new(decorator).use_file_location().build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    slog::Logger::root(drain, slog::o!())
}

fn create_root_logger_for_file(directory: &str) -> Result<slog::Logger, Box<dyn Error>> {
    fs::create_dir_all(directory)?;
    let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    let log_path = format!("{}/{}_info.log", directory, now);
    let file = OpenOptions::new().create(true).write(true).truncate(true).open(log_path)?;

    let decorator = slog_term::PlainDecorator::new(file);
    let drain = slog_term::FullFormat::new(decorator).build().fuse();
    let drain = slog_async::Async::new(drain).build().fuse();

    Ok(slog::Logger::root(drain, slog::o!()))
}
