//! In-memory store used by unit and router tests.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::store::{EngagementStore, ProfileStore, Store, WhitelistStore};
use crate::{
    error::{AppError, Result},
    models::{
        CachedProfile, CreatorCategory, Engagement, NewWhitelistEntry, Profile, WhitelistEntry,
    },
};

#[derive(Default)]
pub struct MemoryStore {
    whitelist: Mutex<BTreeMap<String, WhitelistEntry>>,
    profiles: Mutex<HashMap<String, CachedProfile>>,
    engagements: Mutex<Vec<Engagement>>,
    offline: AtomicBool,
    upserts: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handles(handles: &[&str]) -> Self {
        let store = Self::new();
        {
            let mut whitelist = store.whitelist.lock().unwrap();
            for handle in handles {
                whitelist.insert(
                    handle.to_string(),
                    WhitelistEntry {
                        handle: handle.to_string(),
                        category: CreatorCategory::Crypto,
                        points: 10,
                        onboarded: false,
                        added_by: None,
                        created_at: Utc::now(),
                    },
                );
            }
        }
        store
    }

    /// Makes every subsequent call fail as if the database went away.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn cached_handles(&self) -> Vec<String> {
        let mut handles: Vec<String> = self.profiles.lock().unwrap().keys().cloned().collect();
        handles.sort();
        handles
    }

    pub fn insert_cached(&self, profile: CachedProfile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.handle.clone(), profile);
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::StoreUnavailable("memory store offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl WhitelistStore for MemoryStore {
    async fn count_entries(&self) -> Result<i64> {
        self.check_online()?;
        Ok(self.whitelist.lock().unwrap().len() as i64)
    }

    async fn list_entries(&self, offset: i64, limit: i64) -> Result<Vec<WhitelistEntry>> {
        self.check_online()?;
        Ok(self
            .whitelist
            .lock()
            .unwrap()
            .values()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn get_entry(&self, handle: &str) -> Result<Option<WhitelistEntry>> {
        self.check_online()?;
        Ok(self.whitelist.lock().unwrap().get(handle).cloned())
    }

    async fn insert_entry(&self, entry: &NewWhitelistEntry) -> Result<WhitelistEntry> {
        self.check_online()?;
        let mut whitelist = self.whitelist.lock().unwrap();
        if whitelist.contains_key(&entry.handle) {
            return Err(AppError::Conflict(format!(
                "Creator @{} is already whitelisted",
                entry.handle
            )));
        }
        let stored = WhitelistEntry {
            handle: entry.handle.clone(),
            category: entry.category,
            points: entry.points,
            onboarded: entry.onboarded,
            added_by: entry.added_by.clone(),
            created_at: Utc::now(),
        };
        whitelist.insert(entry.handle.clone(), stored.clone());
        Ok(stored)
    }

    async fn remove_entry(&self, handle: &str) -> Result<bool> {
        self.check_online()?;
        Ok(self.whitelist.lock().unwrap().remove(handle).is_some())
    }

    async fn set_onboarded(
        &self,
        handle: &str,
        onboarded: bool,
    ) -> Result<Option<WhitelistEntry>> {
        self.check_online()?;
        let mut whitelist = self.whitelist.lock().unwrap();
        Ok(whitelist.get_mut(handle).map(|entry| {
            entry.onboarded = onboarded;
            entry.clone()
        }))
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, handle: &str) -> Result<Option<CachedProfile>> {
        self.check_online()?;
        Ok(self.profiles.lock().unwrap().get(handle).cloned())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<CachedProfile> {
        self.check_online()?;
        let cached = CachedProfile {
            twitter_id: profile.twitter_id.clone(),
            handle: profile.handle.clone(),
            name: profile.name.clone(),
            description: profile.description.clone(),
            avatar_url: profile.avatar_url.clone(),
            refreshed_at: Utc::now(),
        };
        self.profiles
            .lock()
            .unwrap()
            .insert(cached.handle.clone(), cached.clone());
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(cached)
    }

    async fn get_profiles(&self, handles: &[String]) -> Result<Vec<CachedProfile>> {
        self.check_online()?;
        let profiles = self.profiles.lock().unwrap();
        Ok(handles
            .iter()
            .filter_map(|handle| profiles.get(handle).cloned())
            .collect())
    }
}

#[async_trait]
impl EngagementStore for MemoryStore {
    async fn record_engagement(
        &self,
        user_address: &str,
        creator_handle: &str,
        action: &str,
        points: i32,
    ) -> Result<Option<Engagement>> {
        self.check_online()?;
        let user_address = user_address.to_ascii_lowercase();
        let mut engagements = self.engagements.lock().unwrap();
        let duplicate = engagements.iter().any(|e| {
            e.user_address == user_address
                && e.creator_handle == creator_handle
                && e.action == action
        });
        if duplicate {
            return Ok(None);
        }
        let engagement = Engagement {
            user_address,
            creator_handle: creator_handle.to_string(),
            action: action.to_string(),
            points,
            created_at: Utc::now(),
        };
        engagements.push(engagement.clone());
        Ok(Some(engagement))
    }

    async fn total_engagement_points(&self, user_address: &str) -> Result<i64> {
        self.check_online()?;
        let user_address = user_address.to_ascii_lowercase();
        Ok(self
            .engagements
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.user_address == user_address)
            .map(|e| e.points as i64)
            .sum())
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> bool {
        !self.offline.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integrations::fake::sample_profile;

    #[tokio::test]
    async fn repeated_upsert_converges_to_one_record() {
        let store = MemoryStore::new();
        let profile = sample_profile("alice");

        let first = store.upsert_profile(&profile).await.unwrap();
        let second = store.upsert_profile(&profile).await.unwrap();

        assert_eq!(store.cached_handles(), vec!["alice"]);
        assert_eq!(first.profile(), second.profile());
        assert!(second.refreshed_at >= first.refreshed_at);

        let stored = store.get_profile("alice").await.unwrap().unwrap();
        assert_eq!(stored.profile(), profile);
        assert_eq!(stored.refreshed_at, second.refreshed_at);
    }

    #[tokio::test]
    async fn upsert_overwrites_every_field() {
        let store = MemoryStore::new();
        store.upsert_profile(&sample_profile("alice")).await.unwrap();

        let renamed = Profile {
            name: "Alice Renamed".to_string(),
            description: None,
            avatar_url: None,
            ..sample_profile("alice")
        };
        store.upsert_profile(&renamed).await.unwrap();

        let stored = store.get_profile("alice").await.unwrap().unwrap();
        assert_eq!(stored.profile(), renamed);
    }
}
