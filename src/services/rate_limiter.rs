use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

/// Global gate enforcing a minimum interval between outbound profile API calls.
///
/// No queueing and no backoff: a denied caller decides for itself whether to
/// skip, retry later or give up.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_call: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_call: Mutex::new(None),
        }
    }

    /// Returns true when a call may be made now, and records it as made.
    /// The first call ever is always permitted.
    pub fn can_make_api_call(&self) -> bool {
        let now = Instant::now();
        let mut last_call = self
            .last_call
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let permitted = match *last_call {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
        };
        if permitted {
            Self::record_call(&mut last_call, now);
        }
        permitted
    }

    /// Runs under the same lock as the check, so two callers cannot both pass.
    fn record_call(last_call: &mut Option<Instant>, now: Instant) {
        *last_call = Some(now);
    }

    /// Zero when a call would be permitted right now.
    pub fn time_until_next_call(&self) -> Duration {
        let last_call = self
            .last_call
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        match *last_call {
            None => Duration::ZERO,
            Some(last) => self
                .min_interval
                .saturating_sub(Instant::now().saturating_duration_since(last)),
        }
    }
}
