/// Application constants

// API version
pub const API_VERSION: &str = "v1";

// Wallet sign-in
pub const DEFAULT_AUTH_DOMAIN: &str = "localhost";
pub const DEFAULT_AUTH_MESSAGE_MAX_AGE_SECS: u64 = 300;
pub const AUTH_MESSAGE_MAX_CLOCK_SKEW_SECS: i64 = 60;
pub const DEFAULT_JWT_MAX_SESSION_HOURS: u64 = 168;

// Twitter / X profile API
pub const DEFAULT_TWITTER_API_BASE_URL: &str = "https://api.twitter.com/2";
pub const TWITTER_USER_FIELDS: &str = "description,profile_image_url";
pub const DEFAULT_TWITTER_MIN_CALL_INTERVAL_MS: u64 = 3_000;
pub const DEFAULT_TWITTER_REQUEST_TIMEOUT_SECS: u64 = 10;

// Creator whitelist refresh
pub const DEFAULT_CREATOR_BATCH_SIZE: i64 = 5;
pub const DEFAULT_CREATOR_BATCH_COOLDOWN_SECS: u64 = 60;
pub const CREATOR_HANDLE_MAX_LEN: usize = 15;

// Engagement rate limits (per wallet)
pub const ENGAGE_MAX_PER_MINUTE: usize = 10;
pub const ENGAGE_MAX_PER_HOUR: usize = 100;

// Directory paging
pub const CREATORS_PAGE_DEFAULT_LIMIT: i32 = 20;
pub const CREATORS_PAGE_MAX_LIMIT: i32 = 100;
