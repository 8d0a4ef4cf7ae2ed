use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    error::{AppError, Result},
    models::*,
};

#[cfg(test)]
pub mod memory;
pub mod store;

pub use store::{EngagementStore, ProfileStore, Store, UnavailableStore, WhitelistStore};

#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    pub async fn new(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

// ==================== WHITELIST QUERIES ====================
#[async_trait]
impl WhitelistStore for Database {
    async fn count_entries(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM creator_whitelist")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_entries(&self, offset: i64, limit: i64) -> Result<Vec<WhitelistEntry>> {
        let rows = sqlx::query_as::<_, WhitelistRow>(
            "SELECT handle, category, points, onboarded, added_by, created_at
             FROM creator_whitelist
             ORDER BY handle ASC
             LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(WhitelistEntry::from).collect())
    }

    async fn get_entry(&self, handle: &str) -> Result<Option<WhitelistEntry>> {
        let row = sqlx::query_as::<_, WhitelistRow>(
            "SELECT handle, category, points, onboarded, added_by, created_at
             FROM creator_whitelist WHERE handle = $1",
        )
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(WhitelistEntry::from))
    }

    async fn insert_entry(&self, entry: &NewWhitelistEntry) -> Result<WhitelistEntry> {
        let row = sqlx::query_as::<_, WhitelistRow>(
            r#"
            INSERT INTO creator_whitelist (handle, category, points, onboarded, added_by)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (handle) DO NOTHING
            RETURNING handle, category, points, onboarded, added_by, created_at
            "#,
        )
        .bind(&entry.handle)
        .bind(entry.category.as_str())
        .bind(entry.points)
        .bind(entry.onboarded)
        .bind(&entry.added_by)
        .fetch_optional(&self.pool)
        .await?;

        row.map(WhitelistEntry::from).ok_or_else(|| {
            AppError::Conflict(format!("Creator @{} is already whitelisted", entry.handle))
        })
    }

    async fn remove_entry(&self, handle: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM creator_whitelist WHERE handle = $1")
            .bind(handle)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn set_onboarded(
        &self,
        handle: &str,
        onboarded: bool,
    ) -> Result<Option<WhitelistEntry>> {
        let row = sqlx::query_as::<_, WhitelistRow>(
            "UPDATE creator_whitelist SET onboarded = $1 WHERE handle = $2
             RETURNING handle, category, points, onboarded, added_by, created_at",
        )
        .bind(onboarded)
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(WhitelistEntry::from))
    }
}

// ==================== PROFILE CACHE QUERIES ====================
#[async_trait]
impl ProfileStore for Database {
    async fn get_profile(&self, handle: &str) -> Result<Option<CachedProfile>> {
        let profile = sqlx::query_as::<_, CachedProfile>(
            "SELECT twitter_id, handle, name, description, avatar_url, refreshed_at
             FROM twitter_profiles WHERE handle = $1",
        )
        .bind(handle)
        .fetch_optional(&self.pool)
        .await?;
        Ok(profile)
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<CachedProfile> {
        let cached = sqlx::query_as::<_, CachedProfile>(
            r#"
            INSERT INTO twitter_profiles
                (handle, twitter_id, name, description, avatar_url, refreshed_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            ON CONFLICT (handle) DO UPDATE
            SET twitter_id   = EXCLUDED.twitter_id,
                name         = EXCLUDED.name,
                description  = EXCLUDED.description,
                avatar_url   = EXCLUDED.avatar_url,
                refreshed_at = NOW()
            RETURNING twitter_id, handle, name, description, avatar_url, refreshed_at
            "#,
        )
        .bind(&profile.handle)
        .bind(&profile.twitter_id)
        .bind(&profile.name)
        .bind(&profile.description)
        .bind(&profile.avatar_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(cached)
    }

    async fn get_profiles(&self, handles: &[String]) -> Result<Vec<CachedProfile>> {
        if handles.is_empty() {
            return Ok(Vec::new());
        }
        let profiles = sqlx::query_as::<_, CachedProfile>(
            "SELECT twitter_id, handle, name, description, avatar_url, refreshed_at
             FROM twitter_profiles WHERE handle = ANY($1)",
        )
        .bind(handles.to_vec())
        .fetch_all(&self.pool)
        .await?;
        Ok(profiles)
    }
}

// ==================== ENGAGEMENT QUERIES ====================
#[async_trait]
impl EngagementStore for Database {
    async fn record_engagement(
        &self,
        user_address: &str,
        creator_handle: &str,
        action: &str,
        points: i32,
    ) -> Result<Option<Engagement>> {
        let engagement = sqlx::query_as::<_, Engagement>(
            r#"
            INSERT INTO creator_engagements (user_address, creator_handle, action, points)
            VALUES (LOWER($1), $2, $3, $4)
            ON CONFLICT (user_address, creator_handle, action) DO NOTHING
            RETURNING user_address, creator_handle, action, points, created_at
            "#,
        )
        .bind(user_address)
        .bind(creator_handle)
        .bind(action)
        .bind(points)
        .fetch_optional(&self.pool)
        .await?;
        Ok(engagement)
    }

    async fn total_engagement_points(&self, user_address: &str) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(points), 0)::BIGINT FROM creator_engagements
             WHERE user_address = LOWER($1)",
        )
        .bind(user_address)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }
}

#[async_trait]
impl Store for Database {
    async fn ping(&self) -> bool {
        self.pool.acquire().await.is_ok()
    }
}
