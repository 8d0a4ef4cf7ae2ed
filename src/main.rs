use axum::http::HeaderValue;
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod constants;
mod crypto;
mod db;
mod error;
mod integrations;
mod models;
mod services;
mod utils;

use config::Config;
use constants::API_VERSION;
use db::{Database, Store, UnavailableStore};
use integrations::TwitterClient;
use services::{CreatorRefresher, EngagementLimiter, EngagementService, ProfileFetcher, RateLimiter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "creator_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    config.validate()?;

    tracing::info!("Starting creator backend");
    tracing::info!("Environment: {}", config.environment);
    tracing::info!("API Version: {}", API_VERSION);

    let store = connect_store(&config).await;

    let twitter = TwitterClient::new(
        config.twitter_api_base_url.clone(),
        config.twitter_bearer_token.clone(),
        config.twitter_request_timeout(),
    )?;
    if !twitter.is_configured() {
        tracing::warn!("TWITTER_BEARER_TOKEN not set; profile lookups will be skipped");
    }

    let limiter = Arc::new(RateLimiter::new(config.twitter_min_call_interval()));
    let fetcher = Arc::new(ProfileFetcher::new(
        store.clone(),
        Arc::new(twitter),
        limiter,
        config.profile_cache_max_age(),
    ));
    let refresher = Arc::new(CreatorRefresher::new(
        store.clone(),
        fetcher,
        config.creator_batch_size,
        config.creator_batch_cooldown(),
    ));
    let engagement = Arc::new(EngagementService::new(
        store.clone(),
        Arc::new(EngagementLimiter::new()),
    ));

    let app_state = api::AppState {
        store,
        refresher: refresher.clone(),
        engagement,
        config: config.clone(),
    };

    // Build router
    let app = build_router(app_state);

    // Start background services
    tokio::spawn(services::start_background_services(
        refresher,
        config.clone(),
    ));

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Postgres when configured and reachable, otherwise the unavailable store.
async fn connect_store(config: &Config) -> Arc<dyn Store> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set; running without a creator store");
        return Arc::new(UnavailableStore);
    };

    let db = match Database::new(url, config.database_max_connections).await {
        Ok(db) => db,
        Err(e) => {
            tracing::error!("Failed to connect to database: {}", e);
            return Arc::new(UnavailableStore);
        }
    };

    tracing::info!("Running database migrations...");
    if let Err(e) = db.run_migrations().await {
        tracing::error!("Failed to run migrations: {}", e);
        return Arc::new(UnavailableStore);
    }

    Arc::new(db)
}

fn build_router(state: api::AppState) -> Router {
    // CORS configuration
    let cors = cors_from_config(&state.config);

    Router::new()
        // Health check
        .route("/health", get(api::health::health_check))
        // Authentication
        .route("/api/v1/auth/connect", post(api::auth::connect_wallet))
        .route("/api/v1/auth/refresh", post(api::auth::refresh_token))
        // Admin: creator refresh
        .route(
            "/api/v1/admin/creators/refresh",
            post(api::admin::run_refresh).get(api::admin::refresh_status),
        )
        // Admin: whitelist
        .route("/api/v1/admin/creators", post(api::admin::add_creator))
        .route(
            "/api/v1/admin/creators/{handle}",
            delete(api::admin::remove_creator),
        )
        .route(
            "/api/v1/admin/creators/{handle}/onboarding",
            put(api::admin::set_onboarding),
        )
        .route(
            "/api/v1/admin/creators/{handle}/fetch",
            post(api::admin::fetch_creator),
        )
        // Public directory
        .route("/api/v1/creators", get(api::creators::list_creators))
        .route(
            "/api/v1/creators/{handle}",
            get(api::creators::get_creator_profile),
        )
        // Engagement
        .route("/api/v1/engage", post(api::engage::engage))
        .route("/api/v1/engage/points", get(api::engage::get_points))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_from_config(config: &Config) -> CorsLayer {
    let raw = config.cors_allowed_origins.trim();
    if raw.is_empty() || raw == "*" {
        return CorsLayer::very_permissive();
    }

    let allowed: Vec<HeaderValue> = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<HeaderValue>().ok())
        .collect();

    if allowed.is_empty() {
        tracing::warn!("No valid CORS origins parsed; falling back to permissive");
        return CorsLayer::very_permissive();
    }

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

