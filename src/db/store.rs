use async_trait::async_trait;

use crate::{
    error::{AppError, Result},
    models::{CachedProfile, Engagement, NewWhitelistEntry, Profile, WhitelistEntry},
};

/// Whitelisted creators, always read in ascending handle order.
#[async_trait]
pub trait WhitelistStore: Send + Sync {
    async fn count_entries(&self) -> Result<i64>;

    async fn list_entries(&self, offset: i64, limit: i64) -> Result<Vec<WhitelistEntry>>;

    async fn get_entry(&self, handle: &str) -> Result<Option<WhitelistEntry>>;

    /// Fails with `AppError::Conflict` when the handle is already whitelisted.
    async fn insert_entry(&self, entry: &NewWhitelistEntry) -> Result<WhitelistEntry>;

    async fn remove_entry(&self, handle: &str) -> Result<bool>;

    async fn set_onboarded(&self, handle: &str, onboarded: bool)
        -> Result<Option<WhitelistEntry>>;
}

/// Cached external profiles keyed by normalized handle.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get_profile(&self, handle: &str) -> Result<Option<CachedProfile>>;

    /// Insert or overwrite every field; `refreshed_at` is set to now.
    async fn upsert_profile(&self, profile: &Profile) -> Result<CachedProfile>;

    async fn get_profiles(&self, handles: &[String]) -> Result<Vec<CachedProfile>>;
}

#[async_trait]
pub trait EngagementStore: Send + Sync {
    /// Returns `None` when this (user, creator, action) was already recorded.
    async fn record_engagement(
        &self,
        user_address: &str,
        creator_handle: &str,
        action: &str,
        points: i32,
    ) -> Result<Option<Engagement>>;

    async fn total_engagement_points(&self, user_address: &str) -> Result<i64>;
}

#[async_trait]
pub trait Store: WhitelistStore + ProfileStore + EngagementStore {
    async fn ping(&self) -> bool;
}

/// Stand-in used when no database is configured or reachable.
/// Reads come back empty; writes are rejected.
#[derive(Debug, Clone, Default)]
pub struct UnavailableStore;

fn rejected<T>() -> Result<T> {
    Err(AppError::StoreUnavailable(
        "Creator store is not connected".to_string(),
    ))
}

#[async_trait]
impl WhitelistStore for UnavailableStore {
    async fn count_entries(&self) -> Result<i64> {
        Ok(0)
    }

    async fn list_entries(&self, _offset: i64, _limit: i64) -> Result<Vec<WhitelistEntry>> {
        Ok(Vec::new())
    }

    async fn get_entry(&self, _handle: &str) -> Result<Option<WhitelistEntry>> {
        Ok(None)
    }

    async fn insert_entry(&self, _entry: &NewWhitelistEntry) -> Result<WhitelistEntry> {
        rejected()
    }

    async fn remove_entry(&self, _handle: &str) -> Result<bool> {
        rejected()
    }

    async fn set_onboarded(
        &self,
        _handle: &str,
        _onboarded: bool,
    ) -> Result<Option<WhitelistEntry>> {
        rejected()
    }
}

#[async_trait]
impl ProfileStore for UnavailableStore {
    async fn get_profile(&self, _handle: &str) -> Result<Option<CachedProfile>> {
        Ok(None)
    }

    async fn upsert_profile(&self, _profile: &Profile) -> Result<CachedProfile> {
        rejected()
    }

    async fn get_profiles(&self, _handles: &[String]) -> Result<Vec<CachedProfile>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl EngagementStore for UnavailableStore {
    async fn record_engagement(
        &self,
        _user_address: &str,
        _creator_handle: &str,
        _action: &str,
        _points: i32,
    ) -> Result<Option<Engagement>> {
        rejected()
    }

    async fn total_engagement_points(&self, _user_address: &str) -> Result<i64> {
        Ok(0)
    }
}

#[async_trait]
impl Store for UnavailableStore {
    async fn ping(&self) -> bool {
        false
    }
}
