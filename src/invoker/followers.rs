use std::collections::HashMap;
use tokio::time::{Duration, Instant};

/// Replicas that recently refused a request as followers, skipped until they expire or fresh
/// routing information arrives.
pub struct FollowerTracker {
    expiry: Duration,
    max_entries: usize,
    followers: HashMap<String, (Instant, String)>,
}

impl FollowerTracker {
    pub fn new(expiry: Duration, max_entries: usize) -> Self {
        FollowerTracker {
            expiry,
            max_entries: max_entries.max(1),
            followers: HashMap::new(),
        }
    }

    /// Remembers `ts_uuid` with the reason it was rejected. The oldest entry goes when full.
    pub fn mark(&mut self, ts_uuid: &str, reason: String, now: Instant) {
        if !self.followers.contains_key(ts_uuid) && self.followers.len() >= self.max_entries {
            let oldest = self
                .followers
                .iter()
                .min_by_key(|(_, (marked_at, _))| *marked_at)
                .map(|(uuid, _)| uuid.clone());
            if let Some(oldest) = oldest {
                self.followers.remove(&oldest);
            }
        }
        self.followers.insert(ts_uuid.to_string(), (now, reason));
    }

    pub fn is_follower(&self, ts_uuid: &str, now: Instant) -> bool {
        match self.followers.get(ts_uuid) {
            Some((marked_at, _)) => now.saturating_duration_since(*marked_at) < self.expiry,
            None => false,
        }
    }

    pub fn reason(&self, ts_uuid: &str) -> Option<&str> {
        self.followers.get(ts_uuid).map(|(_, reason)| reason.as_str())
    }

    pub fn len(&self) -> usize {
        self.followers.len()
    }

    /// Fresh consensus info makes every remembered rejection stale.
    pub fn clear(&mut self) {
        self.followers.clear();
    }
}
