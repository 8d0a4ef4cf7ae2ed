use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::constants::{
    DEFAULT_AUTH_DOMAIN, DEFAULT_AUTH_MESSAGE_MAX_AGE_SECS, DEFAULT_JWT_MAX_SESSION_HOURS,
    DEFAULT_CREATOR_BATCH_COOLDOWN_SECS, DEFAULT_CREATOR_BATCH_SIZE,
    DEFAULT_TWITTER_API_BASE_URL, DEFAULT_TWITTER_MIN_CALL_INTERVAL_MS,
    DEFAULT_TWITTER_REQUEST_TIMEOUT_SECS,
};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    // Server
    pub host: String,
    pub port: u16,
    pub environment: String,

    // Database (optional: without it the service runs against the unavailable store)
    pub database_url: Option<String>,
    pub database_max_connections: u32,

    // JWT
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
    pub jwt_max_session_hours: u64,

    // Wallet sign-in messages must name this domain and be recent
    pub auth_domain: String,
    pub auth_message_max_age_secs: u64,

    // Admin wallets, compared case-insensitively
    pub admin_wallets: Vec<String>,

    // Twitter / X
    pub twitter_bearer_token: Option<String>,
    pub twitter_api_base_url: String,
    pub twitter_min_call_interval_ms: u64,
    pub twitter_request_timeout_secs: u64,

    // Creator refresh
    pub creator_batch_size: i64,
    pub creator_batch_cooldown_secs: u64,
    pub profile_cache_max_age_secs: Option<u64>,
    pub enable_creator_refresh_loop: bool,

    // CORS
    pub cors_allowed_origins: String,
}

fn env_flag(name: &str) -> bool {
    env::var(name)
        .map(|v| {
            let normalized = v.trim().to_ascii_lowercase();
            normalized == "1" || normalized == "true" || normalized == "yes" || normalized == "on"
        })
        .unwrap_or(false)
}

fn parse_wallet_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_ascii_lowercase())
        .collect()
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            database_url: env::var("DATABASE_URL")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            database_max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()?,

            jwt_secret: env::var("JWT_SECRET")?,
            jwt_expiry_hours: env::var("JWT_EXPIRY_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()?,
            jwt_max_session_hours: env::var("JWT_MAX_SESSION_HOURS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_JWT_MAX_SESSION_HOURS),

            auth_domain: env::var("AUTH_DOMAIN")
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| DEFAULT_AUTH_DOMAIN.to_string()),
            auth_message_max_age_secs: env::var("AUTH_MESSAGE_MAX_AGE_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_AUTH_MESSAGE_MAX_AGE_SECS),

            admin_wallets: parse_wallet_list(&env::var("ADMIN_WALLETS").unwrap_or_default()),

            twitter_bearer_token: env::var("TWITTER_BEARER_TOKEN")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            twitter_api_base_url: env::var("TWITTER_API_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_TWITTER_API_BASE_URL.to_string()),
            twitter_min_call_interval_ms: env::var("TWITTER_MIN_CALL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TWITTER_MIN_CALL_INTERVAL_MS),
            twitter_request_timeout_secs: env::var("TWITTER_REQUEST_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TWITTER_REQUEST_TIMEOUT_SECS),

            creator_batch_size: env::var("CREATOR_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CREATOR_BATCH_SIZE),
            creator_batch_cooldown_secs: env::var("CREATOR_BATCH_COOLDOWN_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_CREATOR_BATCH_COOLDOWN_SECS),
            profile_cache_max_age_secs: env::var("PROFILE_CACHE_MAX_AGE_SECS")
                .ok()
                .and_then(|s| s.parse().ok()),
            enable_creator_refresh_loop: env_flag("ENABLE_CREATOR_REFRESH_LOOP"),

            cors_allowed_origins: env::var("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string()),
        })
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jwt_secret.trim().is_empty() {
            anyhow::bail!("JWT_SECRET is empty");
        }
        if self.jwt_max_session_hours < self.jwt_expiry_hours {
            anyhow::bail!("JWT_MAX_SESSION_HOURS must be >= JWT_EXPIRY_HOURS");
        }
        if self.creator_batch_size <= 0 {
            anyhow::bail!("CREATOR_BATCH_SIZE must be > 0");
        }
        url::Url::parse(&self.twitter_api_base_url)
            .map_err(|e| anyhow::anyhow!("TWITTER_API_BASE_URL is invalid: {}", e))?;

        if self.auth_domain == DEFAULT_AUTH_DOMAIN {
            tracing::warn!("AUTH_DOMAIN not set; sign-in messages must name \"localhost\"");
        }
        if self.database_url.is_none() {
            tracing::warn!("DATABASE_URL not set; creator store will be unavailable");
        }
        if self.twitter_bearer_token.is_none() {
            tracing::warn!("TWITTER_BEARER_TOKEN not set; profile lookups are disabled");
        }
        if self.admin_wallets.is_empty() {
            tracing::warn!("ADMIN_WALLETS is empty; admin endpoints will reject every caller");
        }
        if self.jwt_secret.contains("super_secret") {
            tracing::warn!("Detected dev credentials in config");
        }
        if self.twitter_min_call_interval_ms == 0 {
            tracing::warn!("TWITTER_MIN_CALL_INTERVAL_MS is 0; outbound calls are not throttled");
        }
        if self.cors_allowed_origins.trim().is_empty() {
            tracing::warn!("CORS_ALLOWED_ORIGINS is empty; requests may be blocked");
        }

        Ok(())
    }

    pub fn is_admin(&self, address: &str) -> bool {
        let address = address.trim();
        self.admin_wallets
            .iter()
            .any(|admin| admin.eq_ignore_ascii_case(address))
    }

    pub fn twitter_min_call_interval(&self) -> Duration {
        Duration::from_millis(self.twitter_min_call_interval_ms)
    }

    pub fn twitter_request_timeout(&self) -> Duration {
        Duration::from_secs(self.twitter_request_timeout_secs)
    }

    pub fn creator_batch_cooldown(&self) -> Duration {
        Duration::from_secs(self.creator_batch_cooldown_secs)
    }

    pub fn profile_cache_max_age(&self) -> Option<Duration> {
        self.profile_cache_max_age_secs.map(Duration::from_secs)
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Config {
            host: "127.0.0.1".to_string(),
            port: 3000,
            environment: "test".to_string(),
            database_url: None,
            database_max_connections: 1,
            jwt_secret: "test_secret".to_string(),
            jwt_expiry_hours: 24,
            jwt_max_session_hours: DEFAULT_JWT_MAX_SESSION_HOURS,
            auth_domain: "creators.test".to_string(),
            auth_message_max_age_secs: DEFAULT_AUTH_MESSAGE_MAX_AGE_SECS,
            admin_wallets: vec!["0xadmin00000000000000000000000000000000001".to_string()],
            twitter_bearer_token: None,
            twitter_api_base_url: DEFAULT_TWITTER_API_BASE_URL.to_string(),
            twitter_min_call_interval_ms: DEFAULT_TWITTER_MIN_CALL_INTERVAL_MS,
            twitter_request_timeout_secs: DEFAULT_TWITTER_REQUEST_TIMEOUT_SECS,
            creator_batch_size: DEFAULT_CREATOR_BATCH_SIZE,
            creator_batch_cooldown_secs: DEFAULT_CREATOR_BATCH_COOLDOWN_SECS,
            profile_cache_max_age_secs: None,
            enable_creator_refresh_loop: false,
            cors_allowed_origins: "*".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_list_is_trimmed_and_lowercased() {
        let wallets = parse_wallet_list(" 0xABC ,,0xdef, ");
        assert_eq!(wallets, vec!["0xabc".to_string(), "0xdef".to_string()]);
    }

    #[test]
    fn admin_match_is_case_insensitive() {
        let config = Config::for_tests();
        assert!(config.is_admin("0xADMIN00000000000000000000000000000000001"));
        assert!(!config.is_admin("0xadmin0000000000000000000000000000000000"));
        assert!(!config.is_admin(""));
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let mut config = Config::for_tests();
        config.creator_batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_twitter_url() {
        let mut config = Config::for_tests();
        config.twitter_api_base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }
}
