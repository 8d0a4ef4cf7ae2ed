use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use crate::{constants::TWITTER_USER_FIELDS, models::Profile};

#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("profile API not configured")]
    NotConfigured,

    #[error("profile API returned HTTP {0}")]
    Status(u16),

    #[error("profile API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed profile payload: {0}")]
    Malformed(String),
}

/// Anything that can resolve a normalized handle to public profile attributes.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn lookup(&self, handle: &str) -> Result<Profile, LookupError>;
}

#[derive(Debug, Deserialize)]
struct UserEnvelope {
    data: Option<TwitterUser>,
    #[serde(default)]
    errors: Vec<TwitterApiError>,
}

#[derive(Debug, Deserialize)]
struct TwitterUser {
    id: String,
    name: String,
    username: String,
    description: Option<String>,
    profile_image_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TwitterApiError {
    title: Option<String>,
    detail: Option<String>,
}

/// Twitter API v2 user lookup (`/users/by/username/{handle}`) with bearer auth.
#[derive(Clone, Debug)]
pub struct TwitterClient {
    base_url: String,
    bearer_token: Option<String>,
    client: Client,
}

impl TwitterClient {
    pub fn new(
        base_url: String,
        bearer_token: Option<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url,
            bearer_token,
            client,
        })
    }

    pub fn is_configured(&self) -> bool {
        !self.base_url.trim().is_empty() && self.bearer_token.is_some()
    }

    fn user_url(&self, handle: &str) -> Result<Url, LookupError> {
        let mut url = Url::parse(self.base_url.trim_end_matches('/'))
            .map_err(|e| LookupError::Malformed(format!("base url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| LookupError::Malformed("base url cannot carry a path".into()))?
            .pop_if_empty()
            .extend(["users", "by", "username", handle]);
        url.query_pairs_mut()
            .append_pair("user.fields", TWITTER_USER_FIELDS);
        Ok(url)
    }
}

fn profile_from_payload(handle: &str, payload: UserEnvelope) -> Result<Profile, LookupError> {
    let Some(user) = payload.data else {
        let reason = payload
            .errors
            .first()
            .and_then(|e| e.detail.clone().or_else(|| e.title.clone()))
            .unwrap_or_else(|| "missing data".to_string());
        return Err(LookupError::Malformed(reason));
    };

    if user.id.trim().is_empty() {
        return Err(LookupError::Malformed("empty user id".into()));
    }

    if !user.username.eq_ignore_ascii_case(handle) {
        tracing::debug!(
            "Lookup for @{} answered as @{}; caching under the requested handle",
            handle,
            user.username
        );
    }

    // Keyed by the requested handle so cache lookups stay stable across casing changes.
    Ok(Profile {
        twitter_id: user.id,
        handle: handle.to_string(),
        name: user.name,
        description: user.description.filter(|d| !d.trim().is_empty()),
        avatar_url: user.profile_image_url,
    })
}

#[async_trait]
impl ProfileSource for TwitterClient {
    async fn lookup(&self, handle: &str) -> Result<Profile, LookupError> {
        let Some(token) = self.bearer_token.as_deref() else {
            return Err(LookupError::NotConfigured);
        };

        let url = self.user_url(handle)?;
        tracing::debug!("Fetching Twitter profile for @{}", handle);

        let resp = self.client.get(url).bearer_auth(token).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(LookupError::Status(status.as_u16()));
        }

        let payload: UserEnvelope = resp
            .json()
            .await
            .map_err(|e| LookupError::Malformed(e.to_string()))?;
        profile_from_payload(handle, payload)
    }
}
