use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

use crate::{
    constants::{ENGAGE_MAX_PER_HOUR, ENGAGE_MAX_PER_MINUTE},
    db::Store,
    error::{AppError, Result},
    models::EngagementAction,
    utils::validate_handle,
};

const MINUTE: Duration = Duration::from_secs(60);
const HOUR: Duration = Duration::from_secs(3600);
/// Calls between sweeps of wallets whose whole window has expired.
const SWEEP_EVERY: usize = 256;

#[derive(Debug, Default)]
struct Windows {
    hits: HashMap<String, VecDeque<Instant>>,
    calls_since_sweep: usize,
}

impl Windows {
    fn sweep(&mut self, now: Instant) {
        self.hits.retain(|_, hits| {
            hits.back()
                .is_some_and(|at| now.saturating_duration_since(*at) < HOUR)
        });
        self.calls_since_sweep = 0;
    }
}

/// Per-wallet sliding-window counters kept in process memory.
#[derive(Debug, Default)]
pub struct EngagementLimiter {
    recent: Mutex<Windows>,
}

impl EngagementLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an attempt for `wallet` and returns false when it exceeds either window.
    pub fn check_and_record(&self, wallet: &str) -> bool {
        let now = Instant::now();
        let key = wallet.trim().to_ascii_lowercase();
        let mut recent = self
            .recent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        recent.calls_since_sweep += 1;
        if recent.calls_since_sweep >= SWEEP_EVERY {
            recent.sweep(now);
        }

        let hits = recent.hits.entry(key).or_default();

        while hits
            .front()
            .is_some_and(|at| now.saturating_duration_since(*at) >= HOUR)
        {
            hits.pop_front();
        }
        let last_minute = hits
            .iter()
            .filter(|at| now.saturating_duration_since(**at) < MINUTE)
            .count();

        if last_minute >= ENGAGE_MAX_PER_MINUTE || hits.len() >= ENGAGE_MAX_PER_HOUR {
            return false;
        }
        hits.push_back(now);
        true
    }

    #[cfg(test)]
    fn tracked_wallets(&self) -> usize {
        self.recent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .hits
            .len()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EngagementReceipt {
    pub creator_handle: String,
    pub action: EngagementAction,
    pub points_awarded: i32,
    pub duplicate: bool,
    pub total_points: i64,
}

/// Turns engagements with whitelisted creators into points.
pub struct EngagementService {
    store: Arc<dyn Store>,
    limiter: Arc<EngagementLimiter>,
}

impl EngagementService {
    pub fn new(store: Arc<dyn Store>, limiter: Arc<EngagementLimiter>) -> Self {
        Self { store, limiter }
    }

    pub async fn record(
        &self,
        user_address: &str,
        creator_handle: &str,
        action: EngagementAction,
    ) -> Result<EngagementReceipt> {
        let handle = validate_handle(creator_handle)?;
        if !self.limiter.check_and_record(user_address) {
            tracing::warn!("Engagement rate limit hit for {}", user_address);
            return Err(AppError::RateLimitExceeded);
        }

        let entry = self
            .store
            .get_entry(&handle)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("@{} is not a whitelisted creator", handle)))?;

        let points = entry.points.saturating_mul(action.weight());
        let recorded = self
            .store
            .record_engagement(user_address, &handle, action.as_str(), points)
            .await?;
        let total_points = self.store.total_engagement_points(user_address).await?;

        let (points_awarded, duplicate) = match recorded {
            Some(engagement) => {
                tracing::info!(
                    "{} earned {} points for {} on @{}",
                    user_address,
                    engagement.points,
                    engagement.action,
                    handle
                );
                (engagement.points, false)
            }
            None => (0, true),
        };

        Ok(EngagementReceipt {
            creator_handle: handle,
            action,
            points_awarded,
            duplicate,
            total_points,
        })
    }

    pub async fn total_points(&self, user_address: &str) -> Result<i64> {
        self.store.total_engagement_points(user_address).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;

    #[tokio::test(start_paused = true)]
    async fn limiter_caps_per_minute_then_recovers() {
        let limiter = EngagementLimiter::new();
        for _ in 0..ENGAGE_MAX_PER_MINUTE {
            assert!(limiter.check_and_record("0xAbc"));
        }
        assert!(!limiter.check_and_record("0xabc"));
        // Other wallets are tracked separately.
        assert!(limiter.check_and_record("0xdef"));

        tokio::time::advance(MINUTE).await;
        assert!(limiter.check_and_record("0xabc"));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_wallets_are_forgotten() {
        let limiter = EngagementLimiter::new();
        for i in 0..10 {
            assert!(limiter.check_and_record(&format!("0xidle{}", i)));
        }
        assert_eq!(limiter.tracked_wallets(), 10);

        tokio::time::advance(HOUR).await;
        for _ in 0..SWEEP_EVERY {
            limiter.check_and_record("0xactive");
        }
        assert_eq!(limiter.tracked_wallets(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn limiter_caps_per_hour() {
        let limiter = EngagementLimiter::new();
        let mut allowed = 0;
        for _ in 0..(ENGAGE_MAX_PER_HOUR + 20) {
            if limiter.check_and_record("0xabc") {
                allowed += 1;
            }
            tokio::time::advance(Duration::from_secs(7)).await;
        }
        assert_eq!(allowed, ENGAGE_MAX_PER_HOUR);
    }

    #[tokio::test]
    async fn engagement_awards_weighted_points_once() {
        let store = Arc::new(MemoryStore::with_handles(&["alice"]));
        let service = EngagementService::new(store, Arc::new(EngagementLimiter::new()));

        let first = service
            .record("0xUser", "@Alice", EngagementAction::Follow)
            .await
            .unwrap();
        assert_eq!(first.creator_handle, "alice");
        assert_eq!(first.points_awarded, 30);
        assert!(!first.duplicate);

        let again = service
            .record("0xuser", "alice", EngagementAction::Follow)
            .await
            .unwrap();
        assert!(again.duplicate);
        assert_eq!(again.points_awarded, 0);
        assert_eq!(again.total_points, 30);

        let like = service
            .record("0xuser", "alice", EngagementAction::Like)
            .await
            .unwrap();
        assert_eq!(like.total_points, 40);
    }

    #[tokio::test]
    async fn engagement_with_unknown_creator_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let service = EngagementService::new(store, Arc::new(EngagementLimiter::new()));
        let result = service
            .record("0xuser", "nobody", EngagementAction::Like)
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
