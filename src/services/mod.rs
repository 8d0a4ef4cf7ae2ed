// All service modules
pub mod creator_refresher;
pub mod engagement;
pub mod profile_fetcher;
pub mod rate_limiter;

// Re-export for convenience
pub use creator_refresher::{BatchResult, BatchStatus, CreatorRefresher, PublicBatchStatus};
pub use engagement::{EngagementLimiter, EngagementService};
pub use profile_fetcher::{FetchOutcome, ProfileFetcher};
pub use rate_limiter::RateLimiter;

use crate::config::Config;
use std::sync::Arc;

/// Start all background services
pub async fn start_background_services(refresher: Arc<CreatorRefresher>, config: Config) {
    tracing::info!("Starting background services...");

    if config.enable_creator_refresh_loop {
        let every = config.creator_batch_cooldown();
        tracing::info!("Creator refresh loop enabled (every {:?})", every);
        refresher.start(every).await;
    } else {
        tracing::info!("Creator refresh loop disabled; waiting for admin triggers");
    }

    tracing::info!("All background services started successfully");
}
