use crate::heartbeat::{CoordinatorProxy, HeartbeatError, HeartbeatRequest, ServerRegistration};
use crate::manager::TabletManager;
use crate::util::{stop_signal, Stopper};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::time::Duration;

#[derive(Clone, Debug)]
pub struct HeartbeaterConfig {
    pub ts_uuid: String,
    pub registration: ServerRegistration,
    pub interval: Duration,
    /// Max tablets per report until the coordinator says otherwise.
    pub initial_report_limit: usize,
}

/// What a single heartbeat achieved.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct HeartbeatOutcome {
    pub sequence_number: u64,
    pub sent_full_report: bool,
    pub reported: usize,
    pub remaining: usize,
    pub acknowledged: usize,
    pub reregister_requested: bool,
}

struct HeartbeaterState {
    needs_registration: bool,
    needs_full_report: bool,
    report_limit: usize,
}

/// Periodically tells the coordinator which replicas changed. Sends again right away while
/// dirty replicas are left over, or when the registry triggers it.
pub struct Heartbeater {
    logger: slog::Logger,
    config: HeartbeaterConfig,
    manager: Arc<TabletManager>,
    coordinator: Arc<dyn CoordinatorProxy>,
    state: Mutex<HeartbeaterState>,
}

impl Heartbeater {
    pub fn new(
        logger: slog::Logger,
        config: HeartbeaterConfig,
        manager: Arc<TabletManager>,
        coordinator: Arc<dyn CoordinatorProxy>,
    ) -> Arc<Self> {
        let state = HeartbeaterState {
            needs_registration: true,
            needs_full_report: true,
            report_limit: config.initial_report_limit.max(1),
        };
        Arc::new(Heartbeater {
            logger,
            config,
            manager,
            coordinator,
            state: Mutex::new(state),
        })
    }

    pub fn report_limit(&self) -> usize {
        self.state.lock().report_limit
    }

    pub fn needs_full_report(&self) -> bool {
        self.state.lock().needs_full_report
    }

    pub async fn heartbeat_once(&self) -> Result<HeartbeatOutcome, HeartbeatError> {
        let (needs_registration, needs_full_report, limit) = {
            let state = self.state.lock();
            (state.needs_registration, state.needs_full_report, state.report_limit)
        };

        let registry = self.manager.registry();
        let report = if needs_full_report {
            registry.generate_full_report(limit)
        } else {
            registry.generate_incremental_report(true, limit)
        };
        let mut outcome = HeartbeatOutcome {
            sequence_number: report.sequence_number,
            sent_full_report: !report.is_incremental,
            reported: report.updated_tablets.len() + report.removed_tablet_ids.len(),
            remaining: report.remaining_tablet_count,
            ..Default::default()
        };

        let request = HeartbeatRequest {
            ts_uuid: self.config.ts_uuid.clone(),
            registration: if needs_registration {
                Some(self.config.registration.clone())
            } else {
                None
            },
            tablet_report: Some(report),
            num_live_tablets: self.manager.num_live_tablets(),
            leader_count: self.manager.leader_count(),
        };
        let response = self.coordinator.heartbeat(request).await?;

        if response.needs_reregister {
            slog::info!(self.logger, "Coordinator asked us to re-register");
            let mut state = self.state.lock();
            state.needs_registration = true;
            state.needs_full_report = true;
            outcome.reregister_requested = true;
            drop(state);
            registry.heartbeat_trigger().trigger_asap();
            return Ok(outcome);
        }

        if let Some(ack) = &response.tablet_report_ack {
            let acked = registry.acknowledge_report(ack, outcome.remaining == 0);
            outcome.acknowledged = acked.cleared;
        }

        {
            let mut state = self.state.lock();
            state.needs_registration = false;
            if outcome.sent_full_report && response.tablet_report_ack.is_some() {
                state.needs_full_report = false;
            }
            if response.needs_full_tablet_report {
                state.needs_full_report = true;
            }
            if let Some(new_limit) = response.tablet_report_limit {
                if new_limit != state.report_limit {
                    slog::info!(self.logger, "Tablet report limit now {}", new_limit);
                    state.report_limit = new_limit.max(1);
                }
            }
        }

        if outcome.remaining > 0 {
            registry.heartbeat_trigger().trigger_asap();
        }
        slog::debug!(
            self.logger,
            "Heartbeat with report {}: {} reported, {} acknowledged, {} remaining",
            outcome.sequence_number,
            outcome.reported,
            outcome.acknowledged,
            outcome.remaining
        );
        Ok(outcome)
    }

    /// Runs heartbeats until the returned `Stopper` is dropped.
    pub fn start(self: &Arc<Self>) -> Stopper {
        let (stopper, stop_check) = stop_signal();
        let heartbeater = self.clone();
        tokio::spawn(async move {
            let trigger = heartbeater.manager.registry().heartbeat_trigger().clone();
            while !stop_check.should_stop() {
                if let Err(e) = heartbeater.heartbeat_once().await {
                    slog::warn!(heartbeater.logger, "Heartbeat failed: {}", e);
                }
                tokio::select! {
                    _ = tokio::time::sleep(heartbeater.config.interval) => {},
                    _ = trigger.triggered() => {},
                    _ = stop_check.stopped() => {},
                }
            }
            slog::info!(heartbeater.logger, "Heartbeater stopped");
        });
        stopper
    }
}
