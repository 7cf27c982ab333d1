use std::sync::Arc;
use tokio::sync::Notify;

/// Asks the heartbeater to send a heartbeat now rather than at its next tick.
#[derive(Clone, Default)]
pub struct HeartbeatTrigger {
    notify: Arc<Notify>,
}

impl HeartbeatTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger_asap(&self) {
        self.notify.notify_one();
    }

    pub async fn triggered(&self) {
        self.notify.notified().await;
    }
}
