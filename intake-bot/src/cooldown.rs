//! Per-user cooldown registries.
//!
//! The bot keeps three of these, one per abuse domain:
//!
//! - **button**: ignores rapid repeated clicks on the start button
//! - **message**: sends the "already active" / "on cooldown" notices at most
//!   once per window
//! - **report**: blocks starting a new report after a submission
//!
//! Each registry owns its own map; they never share storage. An entry is a
//! user ID mapped to the instant its cooldown ends. An entry whose expiry has
//! passed is treated as absent and is removed by the cleanup sweep.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Expiring set of user IDs.
#[derive(Debug)]
pub struct CooldownRegistry {
    name: &'static str,
    duration: Duration,
    entries: DashMap<String, Instant>,
}

impl CooldownRegistry {
    /// Create a registry whose entries last `duration`.
    pub fn new(name: &'static str, duration: Duration) -> Self {
        Self {
            name,
            duration,
            entries: DashMap::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Report whether the user is on cooldown, starting one if not.
    ///
    /// The lookup and the insert happen under the same entry lock, so two
    /// concurrent callers for one user can't both get `false`.
    pub fn check_and_set(&self, user_id: &str) -> bool {
        let now = Instant::now();
        let expires_at = now + self.duration;

        match self.entries.entry(user_id.to_string()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() > now {
                    return true;
                }
                entry.insert(expires_at);
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(expires_at);
                false
            }
        }
    }

    /// Start (or restart) a cooldown for the user.
    pub fn set(&self, user_id: &str) {
        self.entries
            .insert(user_id.to_string(), Instant::now() + self.duration);
    }

    /// Check without recording.
    pub fn is_active(&self, user_id: &str) -> bool {
        self.remaining(user_id).is_some()
    }

    /// Time left on the user's cooldown, if any.
    pub fn remaining(&self, user_id: &str) -> Option<Duration> {
        let expires_at = *self.entries.get(user_id)?;
        let now = Instant::now();
        (expires_at > now).then(|| expires_at - now)
    }

    /// Drop every entry that expired at or before `now`. Returns how many went.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, expires_at| {
            let keep = *expires_at > now;
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Number of stored entries, expired or not.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn test_check_and_set_blocks_until_expiry() {
        let cooldown = CooldownRegistry::new("button", Duration::from_secs(5));

        assert!(!cooldown.check_and_set("user1"));
        assert!(cooldown.check_and_set("user1"));
        assert!(cooldown.is_active("user1"));

        tokio::time::advance(Duration::from_secs(5)).await;

        assert!(!cooldown.is_active("user1"));
        assert!(!cooldown.check_and_set("user1"));
        assert!(cooldown.is_active("user1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_users_are_independent() {
        let cooldown = CooldownRegistry::new("message", Duration::from_secs(30));

        assert!(!cooldown.check_and_set("a"));
        assert!(!cooldown.check_and_set("b"));
        assert!(cooldown.check_and_set("a"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_counts_down() {
        let cooldown = CooldownRegistry::new("report", Duration::from_secs(60));
        cooldown.set("user1");

        tokio::time::advance(Duration::from_secs(20)).await;

        assert_eq!(cooldown.remaining("user1"), Some(Duration::from_secs(40)));
        assert_eq!(cooldown.remaining("nobody"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired_keeps_live_entries() {
        let cooldown = CooldownRegistry::new("button", Duration::from_secs(10));
        cooldown.set("old");

        tokio::time::advance(Duration::from_secs(6)).await;
        cooldown.set("new");

        tokio::time::advance(Duration::from_secs(5)).await;

        assert_eq!(cooldown.purge_expired(Instant::now()), 1);
        assert_eq!(cooldown.len(), 1);
        assert!(cooldown.is_active("new"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_duration_never_blocks() {
        let cooldown = CooldownRegistry::new("button", Duration::ZERO);

        assert!(!cooldown.check_and_set("user1"));
        assert!(!cooldown.check_and_set("user1"));
        assert!(!cooldown.is_active("user1"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_check_and_set_admits_one() {
        let cooldown = Arc::new(CooldownRegistry::new("button", Duration::from_secs(60)));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let cooldown = cooldown.clone();
                tokio::spawn(async move { cooldown.check_and_set("user1") })
            })
            .collect();

        let mut admitted = 0;
        for handle in handles {
            if !handle.await.unwrap() {
                admitted += 1;
            }
        }

        assert_eq!(admitted, 1);
    }
}
