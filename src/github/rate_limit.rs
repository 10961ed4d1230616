//! Shared rate-limit gate.
//!
//! GitHub reports the remaining quota and its reset time (unix seconds) on
//! every response. All requests made through one `GitHubClient` pass a single
//! `RateLimitGate`: once any response reports an exhausted quota, the gate
//! closes until the reset time and every task waits on that same deadline.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub const REMAINING_HEADER: &str = "x-ratelimit-remaining";
pub const RESET_HEADER: &str = "x-ratelimit-reset";

/// Added on top of the reset time before requests resume.
const RESET_BUFFER: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Default)]
pub struct RateLimitGate {
    /// Reset time (unix seconds) of the most recent exhausted quota.
    reset_at: Arc<Mutex<Option<i64>>>,
}

impl RateLimitGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the quota reported by a response. Returns the reset time when
    /// the quota is exhausted.
    ///
    /// The gate only moves forward: a stale reset from a slower response
    /// never reopens it early.
    pub async fn observe(&self, headers: &HeaderMap) -> Option<i64> {
        if !is_exhausted(headers) {
            return None;
        }
        let reset = reset_time(headers).unwrap_or_else(|| Utc::now().timestamp());

        let mut reset_at = self.reset_at.lock().await;
        let closed_until = reset_at.map_or(reset, |current| current.max(reset));
        *reset_at = Some(closed_until);
        debug!(reset = closed_until, "rate limit exhausted, gate closed");
        Some(closed_until)
    }

    /// Wait until the gate is open. Returns immediately when no exhausted
    /// quota has been seen or its reset time has passed.
    pub async fn wait(&self) {
        loop {
            let Some(reset) = *self.reset_at.lock().await else {
                return;
            };
            let delay = sleep_duration(reset, Utc::now());
            if delay.is_zero() {
                return;
            }
            warn!(
                wait_secs = delay.as_secs_f64(),
                reset, "rate limit reached, waiting for reset"
            );
            // Loop in case another response pushed the reset further out meanwhile.
            tokio::time::sleep(delay).await;
        }
    }

    #[cfg(test)]
    pub async fn reset_at(&self) -> Option<i64> {
        *self.reset_at.lock().await
    }
}

/// `max(0, reset - now + 1s)`.
pub fn sleep_duration(reset: i64, now: DateTime<Utc>) -> Duration {
    let reopen_ms = reset
        .saturating_mul(1000)
        .saturating_add(RESET_BUFFER.as_millis() as i64);
    let wait_ms = reopen_ms.saturating_sub(now.timestamp_millis());
    Duration::from_millis(wait_ms.max(0) as u64)
}

/// True when the response reports zero remaining requests.
/// A missing or unparseable header counts as quota left.
pub fn is_exhausted(headers: &HeaderMap) -> bool {
    header_i64(headers, REMAINING_HEADER) == Some(0)
}

pub fn reset_time(headers: &HeaderMap) -> Option<i64> {
    header_i64(headers, RESET_HEADER)
}

fn header_i64(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok())
}
