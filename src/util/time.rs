use tokio::time::{Duration, Instant};

#[async_trait::async_trait]
pub trait Clock: Clone + Send + Sync {
    fn now(&self) -> Instant;
    async fn sleep_until(&self, deadline: Instant);

    async fn sleep(&self, duration: Duration) {
        let deadline = self.now() + duration;
        self.sleep_until(deadline).await;
    }
}

#[derive(Copy, Clone, Debug, Default)]
pub struct RealClock;

#[async_trait::async_trait]
impl Clock for RealClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    async fn sleep_until(&self, deadline: Instant) {
        tokio::time::sleep_until(deadline).await;
    }
}

#[cfg(test)]
pub(crate) use mock::mocked_clock;


#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_sleep_returns_once_advanced() {
        let (clock, controller) = mocked_clock();
        let start = clock.now();

        let mut sleeper = {
            let clock = clock.clone();
            tokio::spawn(async move { clock.sleep(Duration::from_secs(10)).await })
        };

        controller.advance(Duration::from_secs(4));
        let early = tokio::time::timeout(Duration::from_millis(50), &mut sleeper).await;
        assert!(early.is_err());

        controller.advance(Duration::from_secs(6));
        sleeper.await.unwrap();
        assert_eq!(clock.now() - start, Duration::from_secs(10));
    }
}
