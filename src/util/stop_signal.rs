use tokio::sync::watch;

/// Owner side of a stop signal. Dropping it asks every paired `StopCheck` to stop.
pub struct Stopper {
    tx: watch::Sender<bool>,
}

/// Task side of a stop signal. Can be polled or awaited.
#[derive(Clone)]
pub struct StopCheck {
    rx: watch::Receiver<bool>,
}

impl Stopper {
    pub fn stop(&self) {
        // No receivers left means nobody is listening, which is fine.
        let _ = self.tx.send(true);
    }
}

impl Drop for Stopper {
    fn drop(&mut self) {
        self.stop();
    }
}

impl StopCheck {
    pub fn should_stop(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once stop is requested or the `Stopper` is gone.
    pub async fn stopped(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

pub fn new() -> (Stopper, StopCheck) {
    let (tx, rx) = watch::channel(false);
    (Stopper { tx }, StopCheck { rx })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Duration;

    #[test]
    fn drop_signals_stop() {
        let (stopper, check) = new();
        let other = check.clone();
        assert!(!check.should_stop());

        drop(stopper);
        assert!(check.should_stop());
        assert!(other.should_stop());
    }

    #[tokio::test]
    async fn stopped_wakes_a_waiting_task() {
        // -- setup --
        let (stopper, check) = new();
        let waiter = tokio::spawn(async move { check.stopped().await });

        // -- execute --
        tokio::time::sleep(Duration::from_millis(10)).await;
        stopper.stop();

        // -- verify --
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("stop should wake the waiter")
            .unwrap();
    }
}
