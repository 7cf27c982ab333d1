use crate::api::{InvokerOptions, TabletId};
use crate::invoker::selection::{select_target, Selected};
use crate::invoker::{FollowerTracker, ReplicaLocation, TabletLocations, TargetSelection};
use crate::util::Clock;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::time::{Duration, Instant};

/// Why a single attempt failed, as reported by the replica (or the transport).
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum AttemptError {
    #[error("Replica {ts_uuid} is not the leader (leader hint {leader_hint:?})")]
    NotLeader {
        ts_uuid: String,
        leader_hint: Option<String>,
    },
    #[error("Tablet not found on {0}")]
    TabletNotFound(String),
    /// Worth retrying elsewhere, e.g. a network failure.
    #[error("{0}")]
    Retryable(String),
    /// Retrying cannot help.
    #[error("{0}")]
    Fatal(String),
}

#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum InvokerError {
    #[error("Tablet lookup failed: {0}")]
    Lookup(String),
    #[error("No local replica of tablet {0}")]
    NoLocalReplica(TabletId),
    #[error("Local replica is not the leader, try {leader_hint:?}")]
    Redirect { leader_hint: Option<String> },
    #[error("Every replica of tablet {0} recently refused the request")]
    NoReplicaAvailable(TabletId),
    #[error("Deadline exceeded before the first attempt")]
    TimedOut,
    #[error(transparent)]
    Attempt(AttemptError),
}

/// Routing cache of the caller.
#[async_trait::async_trait]
pub trait MetaCache: Send + Sync {
    /// With `refresh`, cached routing info for the tablet is dropped and fetched again.
    async fn lookup(&self, tablet_id: &TabletId, refresh: bool) -> Result<TabletLocations, InvokerError>;
}

/// The request being routed. Called once per attempt.
#[async_trait::async_trait]
pub trait TabletRpc: Send {
    type Output: Send;

    /// `attempt` starts at 1.
    async fn send(&mut self, target: &ReplicaLocation, attempt: u32) -> Result<Self::Output, AttemptError>;
}

/// Sends a `TabletRpc` to a replica of its tablet, retrying against better targets until it
/// succeeds or the attempt budget runs out. The last failure is returned as is.
pub struct TabletInvoker<C: Clock> {
    logger: slog::Logger,
    options: InvokerOptions,
    clock: C,
    meta_cache: Arc<dyn MetaCache>,
    /// Last replica that answered, and when, per tablet. Bounded by `max_remembered_tablets`.
    last_success: Mutex<HashMap<TabletId, (String, Instant)>>,
}

impl<C: Clock> TabletInvoker<C> {
    pub fn new(logger: slog::Logger, options: InvokerOptions, clock: C, meta_cache: Arc<dyn MetaCache>) -> Self {
        TabletInvoker {
            logger,
            options,
            clock,
            meta_cache,
            last_success: Mutex::new(HashMap::new()),
        }
    }

    pub async fn invoke<R: TabletRpc>(
        &self,
        tablet_id: &TabletId,
        selection: TargetSelection,
        rpc: &mut R,
    ) -> Result<R::Output, InvokerError> {
        let deadline = self.options.deadline.map(|budget| self.clock.now() + budget);
        let mut followers = FollowerTracker::new(self.options.follower_expiry, self.options.max_remembered_followers);
        let mut last_error: Option<InvokerError> = None;
        let mut refresh = false;
        let mut leader_hint: Option<String> = None;

        for attempt in 1..=self.options.max_attempts.max(1) {
            if let Some(deadline) = deadline {
                if self.clock.now() >= deadline {
                    break;
                }
            }

            let mut locations = self.meta_cache.lookup(tablet_id, refresh).await?;
            if refresh {
                followers.clear();
                refresh = false;
            }
            if let Some(hint) = leader_hint.take() {
                if locations.replica(&hint).is_some() {
                    locations.leader_uuid = Some(hint);
                }
            }

            let preferred = self.last_success.lock().get(tablet_id).map(|(ts_uuid, _)| ts_uuid.clone());
            let now = self.clock.now();
            let mut selected = select_target(selection, &locations, &followers, preferred.as_deref(), now);
            if selected == Selected::NoneAvailable && followers.len() > 0 {
                // Everyone refused recently. Start over from fresh routing info.
                locations = self.meta_cache.lookup(tablet_id, true).await?;
                followers.clear();
                selected = select_target(selection, &locations, &followers, preferred.as_deref(), now);
            }
            let target = match selected {
                Selected::Target(target) => target,
                Selected::NoLocalReplica => return Err(InvokerError::NoLocalReplica(tablet_id.clone())),
                Selected::NoneAvailable => {
                    slog::debug!(self.logger, "No usable replica on attempt {}", attempt; "TabletId" => %tablet_id);
                    last_error = Some(InvokerError::NoReplicaAvailable(tablet_id.clone()));
                    refresh = true;
                    self.backoff(attempt).await;
                    continue;
                }
            };

            match rpc.send(&target, attempt).await {
                Ok(output) => {
                    self.remember_success(tablet_id, target.ts_uuid);
                    return Ok(output);
                }
                Err(AttemptError::NotLeader { ts_uuid, leader_hint: hint }) => {
                    if selection == TargetSelection::LocalOnly {
                        return Err(InvokerError::Redirect { leader_hint: hint });
                    }
                    followers.mark(&ts_uuid, "not leader".into(), now);
                    match &hint {
                        Some(hinted) if !followers.is_follower(hinted, now) => leader_hint = Some(hinted.clone()),
                        _ => refresh = true,
                    }
                    last_error = Some(InvokerError::Attempt(AttemptError::NotLeader {
                        ts_uuid,
                        leader_hint: hint,
                    }));
                }
                Err(AttemptError::TabletNotFound(ts_uuid)) => {
                    followers.mark(&ts_uuid, "tablet not found".into(), now);
                    refresh = true;
                    last_error = Some(InvokerError::Attempt(AttemptError::TabletNotFound(ts_uuid)));
                }
                Err(AttemptError::Retryable(message)) => {
                    followers.mark(&target.ts_uuid, message.clone(), now);
                    last_error = Some(InvokerError::Attempt(AttemptError::Retryable(message)));
                }
                Err(e @ AttemptError::Fatal(_)) => return Err(InvokerError::Attempt(e)),
            }

            slog::debug!(
                self.logger,
                "Attempt {} against {} failed: {:?}", attempt, target.ts_uuid, last_error;
                "TabletId" => %tablet_id
            );
            if attempt < self.options.max_attempts {
                self.backoff(attempt).await;
            }
        }

        Err(last_error.unwrap_or(InvokerError::TimedOut))
    }

    fn remember_success(&self, tablet_id: &TabletId, ts_uuid: String) {
        let mut last_success = self.last_success.lock();
        last_success.insert(tablet_id.clone(), (ts_uuid, self.clock.now()));
        if last_success.len() <= self.options.max_remembered_tablets.max(1) {
            return;
        }
        // Forget the tablet that went longest without a success.
        let stalest = last_success
            .iter()
            .filter(|(id, _)| *id != tablet_id)
            .min_by_key(|(_, (_, at))| *at)
            .map(|(id, _)| id.clone());
        if let Some(stalest) = stalest {
            last_success.remove(&stalest);
        }
    }

    /// Exponential delay with jitter, capped.
    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let base = self.options.backoff_base.saturating_mul(1 << exponent);
        let capped = base.min(self.options.backoff_cap);
        let millis = capped.as_millis() as u64;
        if millis == 0 {
            return capped;
        }
        let jitter = rand::thread_rng().gen_range(0..=millis / 2);
        Duration::from_millis(millis / 2 + jitter)
    }

    async fn backoff(&self, attempt: u32) {
        let delay = self.backoff_delay(attempt);
        if delay > Duration::from_millis(0) {
            self.clock.sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::mocked_clock;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeMetaCache {
        locations: Mutex<TabletLocations>,
        refreshes: AtomicUsize,
    }

    impl FakeMetaCache {
        fn new(leader: &str) -> Arc<Self> {
            Arc::new(FakeMetaCache {
                locations: Mutex::new(TabletLocations {
                    tablet_id: TabletId::new("t1"),
                    leader_uuid: Some(leader.into()),
                    replicas: ["ts-1", "ts-2", "ts-3"]
                        .iter()
                        .map(|uuid| ReplicaLocation {
                            ts_uuid: uuid.to_string(),
                            is_local: *uuid == "ts-1",
                        })
                        .collect(),
                }),
                refreshes: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl MetaCache for FakeMetaCache {
        async fn lookup(&self, _tablet_id: &TabletId, refresh: bool) -> Result<TabletLocations, InvokerError> {
            if refresh {
                self.refreshes.fetch_add(1, Ordering::SeqCst);
            }
            Ok(self.locations.lock().clone())
        }
    }

    /// Answers attempts from a script and records who was asked.
    struct ScriptedRpc {
        replies: VecDeque<Result<&'static str, AttemptError>>,
        targets: Vec<String>,
    }

    impl ScriptedRpc {
        fn new(replies: Vec<Result<&'static str, AttemptError>>) -> Self {
            ScriptedRpc {
                replies: replies.into(),
                targets: Vec::new(),
            }
        }
    }

    #[async_trait::async_trait]
    impl TabletRpc for ScriptedRpc {
        type Output = &'static str;

        async fn send(&mut self, target: &ReplicaLocation, _attempt: u32) -> Result<Self::Output, AttemptError> {
            self.targets.push(target.ts_uuid.clone());
            self.replies
                .pop_front()
                .unwrap_or_else(|| Err(AttemptError::Retryable("script exhausted".into())))
        }
    }

    fn options() -> InvokerOptions {
        InvokerOptions {
            max_attempts: 4,
            deadline: None,
            backoff_base: Duration::from_millis(0),
            backoff_cap: Duration::from_millis(0),
            follower_expiry: Duration::from_secs(10),
            max_remembered_followers: 8,
            max_remembered_tablets: 2,
        }
    }

    fn logger() -> slog::Logger {
        slog::Logger::root(slog::Discard, slog::o!())
    }

    #[tokio::test]
    async fn follows_leader_hint() {
        // -- setup --
        let (clock, _controller) = mocked_clock();
        let invoker = TabletInvoker::new(logger(), options(), clock, FakeMetaCache::new("ts-2"));
        let mut rpc = ScriptedRpc::new(vec![
            Err(AttemptError::NotLeader {
                ts_uuid: "ts-2".into(),
                leader_hint: Some("ts-3".into()),
            }),
            Ok("written"),
        ]);

        // -- execute --
        let result = invoker
            .invoke(&TabletId::new("t1"), TargetSelection::LeaderOnly, &mut rpc)
            .await;

        // -- verify --
        assert_eq!(result, Ok("written"));
        assert_eq!(rpc.targets, vec!["ts-2".to_string(), "ts-3".to_string()]);
    }

    #[tokio::test]
    async fn tablet_not_found_refreshes_routes() {
        let (clock, _controller) = mocked_clock();
        let meta_cache = FakeMetaCache::new("ts-2");
        let invoker = TabletInvoker::new(logger(), options(), clock, meta_cache.clone());
        let mut rpc = ScriptedRpc::new(vec![Err(AttemptError::TabletNotFound("ts-2".into())), Ok("read")]);

        let result = invoker
            .invoke(&TabletId::new("t1"), TargetSelection::LeaderOnly, &mut rpc)
            .await;

        assert_eq!(result, Ok("read"));
        assert_eq!(meta_cache.refreshes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_attempts_return_last_error() {
        // -- setup --
        let (clock, _controller) = mocked_clock();
        let invoker = TabletInvoker::new(logger(), options(), clock, FakeMetaCache::new("ts-1"));
        let mut rpc = ScriptedRpc::new(vec![
            Err(AttemptError::Retryable("connection refused".into())),
            Err(AttemptError::Retryable("connection reset".into())),
            Err(AttemptError::Retryable("broken pipe".into())),
            Err(AttemptError::Retryable("timed out".into())),
        ]);

        // -- execute --
        let result = invoker
            .invoke(&TabletId::new("t1"), TargetSelection::ConsistentPrefix, &mut rpc)
            .await;

        // -- verify --
        assert_eq!(rpc.targets.len(), 4);
        assert_eq!(
            result,
            Err(InvokerError::Attempt(AttemptError::Retryable("timed out".into())))
        );
    }

    #[tokio::test]
    async fn fatal_error_stops_immediately() {
        let (clock, _controller) = mocked_clock();
        let invoker = TabletInvoker::new(logger(), options(), clock, FakeMetaCache::new("ts-1"));
        let mut rpc = ScriptedRpc::new(vec![Err(AttemptError::Fatal("bad request".into()))]);

        let result = invoker
            .invoke(&TabletId::new("t1"), TargetSelection::LeaderOnly, &mut rpc)
            .await;

        assert_eq!(rpc.targets.len(), 1);
        assert_eq!(result, Err(InvokerError::Attempt(AttemptError::Fatal("bad request".into()))));
    }

    #[tokio::test]
    async fn local_only_surfaces_redirect() {
        let (clock, _controller) = mocked_clock();
        let invoker = TabletInvoker::new(logger(), options(), clock, FakeMetaCache::new("ts-2"));
        let mut rpc = ScriptedRpc::new(vec![Err(AttemptError::NotLeader {
            ts_uuid: "ts-1".into(),
            leader_hint: Some("ts-2".into()),
        })]);

        let result = invoker
            .invoke(&TabletId::new("t1"), TargetSelection::LocalOnly, &mut rpc)
            .await;

        assert_eq!(rpc.targets, vec!["ts-1".to_string()]);
        assert_eq!(
            result,
            Err(InvokerError::Redirect {
                leader_hint: Some("ts-2".into())
            })
        );
    }

    #[tokio::test]
    async fn consistent_prefix_sticks_to_last_success() {
        // -- setup --
        let (clock, _controller) = mocked_clock();
        let invoker = TabletInvoker::new(logger(), options(), clock, FakeMetaCache::new("ts-1"));
        let tablet_id = TabletId::new("t1");
        let mut first = ScriptedRpc::new(vec![Err(AttemptError::Retryable("down".into())), Ok("a")]);
        invoker
            .invoke(&tablet_id, TargetSelection::ConsistentPrefix, &mut first)
            .await
            .unwrap();
        let answered = first.targets[1].clone();
        assert_ne!(answered, "ts-1");

        // -- execute --
        let mut second = ScriptedRpc::new(vec![Ok("b")]);
        invoker
            .invoke(&tablet_id, TargetSelection::ConsistentPrefix, &mut second)
            .await
            .unwrap();

        // -- verify --
        assert_eq!(second.targets, vec![answered]);
    }

    #[tokio::test]
    async fn deadline_bounds_backoff() {
        // -- setup --
        let (clock, controller) = mocked_clock();
        let mut options = options();
        options.max_attempts = 100;
        options.deadline = Some(Duration::from_secs(1));
        options.backoff_base = Duration::from_millis(400);
        options.backoff_cap = Duration::from_millis(400);
        let invoker = Arc::new(TabletInvoker::new(logger(), options, clock, FakeMetaCache::new("ts-1")));

        // -- execute --
        let task = {
            let invoker = invoker.clone();
            tokio::spawn(async move {
                let mut rpc = ScriptedRpc::new(Vec::new());
                let result = invoker
                    .invoke(&TabletId::new("t1"), TargetSelection::LeaderOnly, &mut rpc)
                    .await;
                (result, rpc.targets.len())
            })
        };
        for _ in 0..20 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            controller.advance(Duration::from_millis(400));
        }

        // -- verify --
        let (result, attempts) = task.await.unwrap();
        assert!(attempts < 100);
        assert!(matches!(result, Err(InvokerError::Attempt(AttemptError::Retryable(_)))));
    }

    #[tokio::test]
    async fn preferred_replicas_are_remembered_for_a_bounded_set_of_tablets() {
        // -- setup --
        let (clock, _controller) = mocked_clock();
        let invoker = TabletInvoker::new(logger(), options(), clock, FakeMetaCache::new("ts-2"));

        // -- execute --
        for tablet in ["t1", "t2", "t3"].iter() {
            let mut rpc = ScriptedRpc::new(vec![Ok("read")]);
            invoker
                .invoke(&TabletId::new(*tablet), TargetSelection::ConsistentPrefix, &mut rpc)
                .await
                .unwrap();
        }

        // -- verify --
        let last_success = invoker.last_success.lock();
        assert_eq!(last_success.len(), 2);
        assert!(last_success.contains_key(&TabletId::new("t3")));
    }
}
