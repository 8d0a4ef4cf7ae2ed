use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    db::{ProfileStore, Store},
    error::Result,
    integrations::ProfileSource,
    models::{CachedProfile, Profile},
    services::rate_limiter::RateLimiter,
    utils::normalize_handle,
};

/// Result of resolving a handle. Only `Fetched` needs to be written back to the cache.
#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Cached(CachedProfile),
    Fetched(Profile),
    /// The rate limiter denied the external call.
    RateLimited,
    /// The external API failed, returned a non-success status or a bad payload.
    Unavailable,
}

impl FetchOutcome {
    pub fn into_profile(self) -> Option<Profile> {
        match self {
            FetchOutcome::Cached(cached) => Some(cached.profile()),
            FetchOutcome::Fetched(profile) => Some(profile),
            FetchOutcome::RateLimited | FetchOutcome::Unavailable => None,
        }
    }
}

/// Cache-first profile resolution with a rate-limited fallback to the external API.
pub struct ProfileFetcher {
    store: Arc<dyn Store>,
    source: Arc<dyn ProfileSource>,
    limiter: Arc<RateLimiter>,
    max_age: Option<Duration>,
}

impl ProfileFetcher {
    pub fn new(
        store: Arc<dyn Store>,
        source: Arc<dyn ProfileSource>,
        limiter: Arc<RateLimiter>,
        max_age: Option<Duration>,
    ) -> Self {
        Self {
            store,
            source,
            limiter,
            max_age,
        }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    fn is_stale(&self, cached: &CachedProfile) -> bool {
        let Some(max_age) = self.max_age else {
            return false;
        };
        let age = Utc::now().signed_duration_since(cached.refreshed_at);
        age.to_std().map(|age| age > max_age).unwrap_or(false)
    }

    /// Resolves `handle` (a leading `@` is ignored). Store read errors propagate;
    /// every external failure is logged and collapsed into `Unavailable`.
    pub async fn fetch_profile(&self, handle: &str) -> Result<FetchOutcome> {
        let handle = normalize_handle(handle);

        if let Some(cached) = self.store.get_profile(&handle).await? {
            if !self.is_stale(&cached) {
                return Ok(FetchOutcome::Cached(cached));
            }
            tracing::debug!("Cached profile for @{} is stale, refetching", handle);
        }

        if !self.limiter.can_make_api_call() {
            tracing::debug!("Rate limited while fetching @{}", handle);
            return Ok(FetchOutcome::RateLimited);
        }

        match self.source.lookup(&handle).await {
            Ok(profile) => Ok(FetchOutcome::Fetched(profile)),
            Err(e) => {
                tracing::warn!("Profile lookup for @{} failed: {}", handle, e);
                Ok(FetchOutcome::Unavailable)
            }
        }
    }

    /// Fetches and writes a freshly fetched profile back to the cache.
    pub async fn fetch_and_cache(&self, handle: &str) -> Result<FetchOutcome> {
        let outcome = self.fetch_profile(handle).await?;
        if let FetchOutcome::Fetched(profile) = &outcome {
            self.store.upsert_profile(profile).await?;
        }
        Ok(outcome)
    }
}
