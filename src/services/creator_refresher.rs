use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::{
    db::{ProfileStore, Store, WhitelistStore},
    error::Result,
    services::profile_fetcher::{FetchOutcome, ProfileFetcher},
};

/// Floor for the in-process ticker's sleep.
const MIN_TICK: Duration = Duration::from_millis(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    AlreadyRunning,
    Cooldown,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchResult {
    pub processed: u32,
    pub remaining: Option<i64>,
    pub next_batch_time: Option<DateTime<Utc>>,
    pub time_until_next_batch_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<SkipReason>,
    pub error: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchStatus {
    pub is_running: bool,
    pub last_batch_time: Option<DateTime<Utc>>,
    pub next_batch_time: Option<DateTime<Utc>>,
    pub time_until_next_batch_ms: u64,
    pub cursor: i64,
}

/// Reduced status for callers outside the admin allow-list.
#[derive(Debug, Clone, Serialize)]
pub struct PublicBatchStatus {
    pub refresh_in_progress: bool,
    pub next_refresh: Option<DateTime<Utc>>,
}

impl From<BatchStatus> for PublicBatchStatus {
    fn from(status: BatchStatus) -> Self {
        Self {
            refresh_in_progress: status.is_running,
            next_refresh: status.next_batch_time,
        }
    }
}

#[derive(Debug, Default)]
struct BatchState {
    cursor: i64,
    last_batch_started: Option<Instant>,
    last_batch_at: Option<DateTime<Utc>>,
}

struct PageOutcome {
    processed: u32,
    remaining: i64,
    next_cursor: i64,
}

/// Clears the running flag on every exit path.
struct RunningGuard<'a>(&'a AtomicBool);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Walks the creator whitelist one page per invocation, caching missing profiles.
///
/// State lives in memory only: a restart starts again from the first handle.
pub struct CreatorRefresher {
    store: Arc<dyn Store>,
    fetcher: Arc<ProfileFetcher>,
    page_size: i64,
    cooldown: Duration,
    running: AtomicBool,
    state: Mutex<BatchState>,
}

impl CreatorRefresher {
    pub fn new(
        store: Arc<dyn Store>,
        fetcher: Arc<ProfileFetcher>,
        page_size: i64,
        cooldown: Duration,
    ) -> Self {
        Self {
            store,
            fetcher,
            page_size: page_size.max(1),
            cooldown,
            running: AtomicBool::new(false),
            state: Mutex::new(BatchState::default()),
        }
    }

    pub fn fetcher(&self) -> &Arc<ProfileFetcher> {
        &self.fetcher
    }

    fn state(&self) -> MutexGuard<'_, BatchState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn cooldown_chrono(&self) -> chrono::Duration {
        chrono::Duration::from_std(self.cooldown).unwrap_or_else(|_| chrono::Duration::zero())
    }

    fn time_until_next_batch(state: &BatchState, cooldown: Duration) -> Duration {
        match state.last_batch_started {
            None => Duration::ZERO,
            Some(started) => cooldown.saturating_sub(started.elapsed()),
        }
    }

    fn skipped(&self, reason: SkipReason) -> BatchResult {
        let state = self.state();
        let wait = Self::time_until_next_batch(&state, self.cooldown);
        BatchResult {
            processed: 0,
            remaining: None,
            next_batch_time: state.last_batch_at.map(|at| at + self.cooldown_chrono()),
            time_until_next_batch_ms: wait.as_millis() as u64,
            skipped: Some(reason),
            error: false,
        }
    }

    /// Runs one batch unless one is already running or the cooldown since the
    /// previous batch start has not elapsed.
    pub async fn run_batch(&self) -> BatchResult {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!("Creator refresh already running, skipping");
            return self.skipped(SkipReason::AlreadyRunning);
        }
        let _guard = RunningGuard(&self.running);

        let cursor = {
            let state = self.state();
            if !Self::time_until_next_batch(&state, self.cooldown).is_zero() {
                drop(state);
                tracing::debug!("Creator refresh cooling down, skipping");
                return self.skipped(SkipReason::Cooldown);
            }
            state.cursor
        };

        let started = Instant::now();
        let started_at = Utc::now();
        let outcome = self.process_page(cursor).await;

        let mut state = self.state();
        state.last_batch_started = Some(started);
        state.last_batch_at = Some(started_at);
        let next_batch_time = Some(started_at + self.cooldown_chrono());

        match outcome {
            Ok(page) => {
                state.cursor = page.next_cursor;
                tracing::info!(
                    "Creator refresh batch done: processed={} remaining={} cursor={}",
                    page.processed,
                    page.remaining,
                    page.next_cursor
                );
                BatchResult {
                    processed: page.processed,
                    remaining: Some(page.remaining),
                    next_batch_time,
                    time_until_next_batch_ms: self.cooldown.as_millis() as u64,
                    skipped: None,
                    error: false,
                }
            }
            Err(e) => {
                tracing::error!("Creator refresh batch failed: {}", e);
                BatchResult {
                    processed: 0,
                    remaining: None,
                    next_batch_time,
                    time_until_next_batch_ms: self.cooldown.as_millis() as u64,
                    skipped: None,
                    error: true,
                }
            }
        }
    }

    async fn process_page(&self, cursor: i64) -> Result<PageOutcome> {
        let total = self.store.count_entries().await?;
        if total == 0 {
            return Ok(PageOutcome {
                processed: 0,
                remaining: 0,
                next_cursor: 0,
            });
        }

        let entries = self.store.list_entries(cursor, self.page_size).await?;
        if entries.is_empty() {
            tracing::info!("Creator refresh reached end of whitelist, wrapping cursor");
            return Ok(PageOutcome {
                processed: 0,
                remaining: total,
                next_cursor: 0,
            });
        }

        let mut processed = 0u32;
        for (attempted, entry) in entries.iter().enumerate() {
            match self.fetcher.fetch_profile(&entry.handle).await? {
                FetchOutcome::Fetched(profile) => {
                    self.store.upsert_profile(&profile).await?;
                    processed += 1;
                }
                FetchOutcome::Cached(_) => processed += 1,
                FetchOutcome::RateLimited => {
                    // Later entries in this page wait for the next revolution.
                    tracing::info!(
                        "Rate limited at @{} after {} of {} entries",
                        entry.handle,
                        attempted,
                        entries.len()
                    );
                    break;
                }
                FetchOutcome::Unavailable => {}
            }
        }

        let advanced = cursor + entries.len() as i64;
        let remaining = (total - advanced).max(0);
        let next_cursor = if advanced >= total { 0 } else { advanced };

        Ok(PageOutcome {
            processed,
            remaining,
            next_cursor,
        })
    }

    /// Snapshot of the scheduler state; never waits on a running batch.
    pub fn status(&self) -> BatchStatus {
        let state = self.state();
        let wait = Self::time_until_next_batch(&state, self.cooldown);
        BatchStatus {
            is_running: self.running.load(Ordering::Acquire),
            last_batch_time: state.last_batch_at,
            next_batch_time: state.last_batch_at.map(|at| at + self.cooldown_chrono()),
            time_until_next_batch_ms: wait.as_millis() as u64,
            cursor: state.cursor,
        }
    }

    /// Optional in-process trigger. Each wake calls `run_batch`, then sleeps
    /// until the later of `every` since the wake and the end of the cooldown,
    /// so no wake lands inside the cooldown of the batch it just started.
    pub async fn start(self: Arc<Self>, every: Duration) {
        tokio::spawn(async move {
            loop {
                let woke = Instant::now();

                let result = self.run_batch().await;
                if result.error {
                    tracing::error!("Scheduled creator refresh failed");
                }

                let until_ready = {
                    let state = self.state();
                    Self::time_until_next_batch(&state, self.cooldown)
                };
                let wait = until_ready
                    .max(every.saturating_sub(woke.elapsed()))
                    .max(MIN_TICK);
                sleep(wait).await;
            }
        });
    }
}
