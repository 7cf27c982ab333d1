use crate::api::TabletId;
use crate::invoker::FollowerTracker;
use rand::seq::SliceRandom;
use tokio::time::Instant;

/// How an invocation chooses which replica to send an attempt to.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TargetSelection {
    /// Must reach the current leader.
    LeaderOnly,
    /// Any replica will do. Ones that answered before are preferred.
    ConsistentPrefix,
    /// Only the replica co-located with the caller. A redirect is the answer when it can't serve.
    LocalOnly,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplicaLocation {
    pub ts_uuid: String,
    pub is_local: bool,
}

/// Routing information for one tablet, as known by the caller's cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TabletLocations {
    pub tablet_id: TabletId,
    pub leader_uuid: Option<String>,
    pub replicas: Vec<ReplicaLocation>,
}

impl TabletLocations {
    pub fn replica(&self, ts_uuid: &str) -> Option<&ReplicaLocation> {
        self.replicas.iter().find(|replica| replica.ts_uuid == ts_uuid)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(super) enum Selected {
    Target(ReplicaLocation),
    /// Every candidate recently rejected us.
    NoneAvailable,
    NoLocalReplica,
}

pub(super) fn select_target(
    selection: TargetSelection,
    locations: &TabletLocations,
    followers: &FollowerTracker,
    preferred: Option<&str>,
    now: Instant,
) -> Selected {
    let usable = |replica: &&ReplicaLocation| !followers.is_follower(&replica.ts_uuid, now);

    match selection {
        TargetSelection::LocalOnly => match locations.replicas.iter().find(|replica| replica.is_local) {
            Some(local) => Selected::Target(local.clone()),
            None => Selected::NoLocalReplica,
        },
        TargetSelection::LeaderOnly => {
            let leader = locations
                .leader_uuid
                .as_deref()
                .and_then(|uuid| locations.replica(uuid))
                .filter(usable);
            if let Some(leader) = leader {
                return Selected::Target(leader.clone());
            }
            // Leader unknown or just refused: probe someone else, they may know better.
            pick_random(locations.replicas.iter().filter(usable).collect())
        }
        TargetSelection::ConsistentPrefix => {
            if let Some(replica) = preferred.and_then(|uuid| locations.replica(uuid)).filter(usable) {
                return Selected::Target(replica.clone());
            }
            if let Some(local) = locations.replicas.iter().filter(usable).find(|replica| replica.is_local) {
                return Selected::Target(local.clone());
            }
            pick_random(locations.replicas.iter().filter(usable).collect())
        }
    }
}

fn pick_random(candidates: Vec<&ReplicaLocation>) -> Selected {
    match candidates.choose(&mut rand::thread_rng()) {
        Some(replica) => Selected::Target((*replica).clone()),
        None => Selected::NoneAvailable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::Duration;

    fn locations(leader: Option<&str>) -> TabletLocations {
        TabletLocations {
            tablet_id: TabletId::new("t1"),
            leader_uuid: leader.map(String::from),
            replicas: vec![
                ReplicaLocation {
                    ts_uuid: "ts-1".into(),
                    is_local: false,
                },
                ReplicaLocation {
                    ts_uuid: "ts-2".into(),
                    is_local: true,
                },
                ReplicaLocation {
                    ts_uuid: "ts-3".into(),
                    is_local: false,
                },
            ],
        }
    }

    fn target(uuid: &str, is_local: bool) -> Selected {
        Selected::Target(ReplicaLocation {
            ts_uuid: uuid.into(),
            is_local,
        })
    }

    fn tracker() -> FollowerTracker {
        FollowerTracker::new(Duration::from_secs(10), 8)
    }

    #[test]
    fn leader_only_targets_leader() {
        let now = Instant::now();

        let selected = select_target(TargetSelection::LeaderOnly, &locations(Some("ts-3")), &tracker(), None, now);

        assert_eq!(selected, target("ts-3", false));
    }

    #[test]
    fn leader_only_skips_recent_follower() {
        // -- setup --
        let now = Instant::now();
        let mut followers = tracker();
        followers.mark("ts-1", String::new(), now);
        followers.mark("ts-3", String::new(), now);

        // -- execute --
        let selected = select_target(TargetSelection::LeaderOnly, &locations(Some("ts-3")), &followers, None, now);

        // -- verify --
        assert_eq!(selected, target("ts-2", true));

        followers.mark("ts-2", String::new(), now);
        let selected = select_target(TargetSelection::LeaderOnly, &locations(Some("ts-3")), &followers, None, now);
        assert_eq!(selected, Selected::NoneAvailable);
    }

    #[test]
    fn consistent_prefix_prefers_previous_then_local() {
        let now = Instant::now();

        let selected = select_target(
            TargetSelection::ConsistentPrefix,
            &locations(None),
            &tracker(),
            Some("ts-3"),
            now,
        );
        assert_eq!(selected, target("ts-3", false));

        let selected = select_target(TargetSelection::ConsistentPrefix, &locations(None), &tracker(), None, now);
        assert_eq!(selected, target("ts-2", true));
    }

    #[test]
    fn local_only_needs_local_replica() {
        let now = Instant::now();
        let mut remote_only = locations(Some("ts-1"));
        remote_only.replicas.retain(|replica| !replica.is_local);

        assert_eq!(
            select_target(TargetSelection::LocalOnly, &locations(Some("ts-1")), &tracker(), None, now),
            target("ts-2", true)
        );
        assert_eq!(
            select_target(TargetSelection::LocalOnly, &remote_only, &tracker(), None, now),
            Selected::NoLocalReplica
        );
    }
}
