use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

// ==================== WHITELIST ====================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CreatorCategory {
    Crypto,
    Sports,
    Politics,
    Entertainment,
    #[default]
    Other,
}

impl CreatorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            CreatorCategory::Crypto => "crypto",
            CreatorCategory::Sports => "sports",
            CreatorCategory::Politics => "politics",
            CreatorCategory::Entertainment => "entertainment",
            CreatorCategory::Other => "other",
        }
    }
}

impl FromStr for CreatorCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crypto" => Ok(CreatorCategory::Crypto),
            "sports" => Ok(CreatorCategory::Sports),
            "politics" => Ok(CreatorCategory::Politics),
            "entertainment" => Ok(CreatorCategory::Entertainment),
            "other" => Ok(CreatorCategory::Other),
            other => Err(format!("Unknown creator category: {}", other)),
        }
    }
}

impl fmt::Display for CreatorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhitelistEntry {
    pub handle: String,
    pub category: CreatorCategory,
    pub points: i32,
    pub onboarded: bool,
    pub added_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Raw `creator_whitelist` row; category is stored as text.
#[derive(Debug, FromRow)]
pub struct WhitelistRow {
    pub handle: String,
    pub category: String,
    pub points: i32,
    pub onboarded: bool,
    pub added_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<WhitelistRow> for WhitelistEntry {
    fn from(row: WhitelistRow) -> Self {
        let category = row.category.parse().unwrap_or_else(|_| {
            tracing::warn!(
                "Unknown category '{}' for creator {}, treating as other",
                row.category,
                row.handle
            );
            CreatorCategory::Other
        });
        Self {
            handle: row.handle,
            category,
            points: row.points,
            onboarded: row.onboarded,
            added_by: row.added_by,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewWhitelistEntry {
    pub handle: String,
    pub category: CreatorCategory,
    pub points: i32,
    pub onboarded: bool,
    pub added_by: Option<String>,
}

// ==================== PROFILE CACHE ====================
/// Profile attributes as returned by the external profile API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub twitter_id: String,
    pub handle: String,
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct CachedProfile {
    pub twitter_id: String,
    pub handle: String,
    pub name: String,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub refreshed_at: DateTime<Utc>,
}

impl CachedProfile {
    pub fn profile(&self) -> Profile {
        Profile {
            twitter_id: self.twitter_id.clone(),
            handle: self.handle.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            avatar_url: self.avatar_url.clone(),
        }
    }
}

/// Directory row: a whitelisted creator plus its cached profile, if any.
#[derive(Debug, Clone, Serialize)]
pub struct CreatorListing {
    #[serde(flatten)]
    pub entry: WhitelistEntry,
    pub profile: Option<CachedProfile>,
}

// ==================== ENGAGEMENT ====================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngagementAction {
    Like,
    Retweet,
    Reply,
    Follow,
}

impl EngagementAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            EngagementAction::Like => "like",
            EngagementAction::Retweet => "retweet",
            EngagementAction::Reply => "reply",
            EngagementAction::Follow => "follow",
        }
    }

    /// Multiplier applied to the creator's point value.
    pub fn weight(&self) -> i32 {
        match self {
            EngagementAction::Like => 1,
            EngagementAction::Retweet => 2,
            EngagementAction::Reply => 2,
            EngagementAction::Follow => 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Engagement {
    pub user_address: String,
    pub creator_handle: String,
    pub action: String,
    pub points: i32,
    pub created_at: DateTime<Utc>,
}

// ==================== API ENVELOPES ====================
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub page: i32,
    pub limit: i32,
    pub total: i64,
}
