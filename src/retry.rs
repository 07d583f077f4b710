//! Fixed-delay retry policy shared by page and media fetches.
//!
//! [`RetryPolicy::run`] drives any fallible async operation:
//!
//! - up to `max_attempts` calls, stopping at the first success
//! - a failure the predicate rejects is returned immediately
//! - between attempts a fixed delay, plus optional random jitter
//! - the cancellation token is checked before every attempt and raced
//!   against every delay
//!
//! ```text
//! attempt 1 ──fail──▶ sleep(delay) ──▶ attempt 2 ──fail──▶ sleep(delay) ──▶ attempt 3 ──▶ give up
//! ```

use rand::{Rng, rng};
use std::fmt;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Marker returned through `E: From<Cancelled>` when the run is cancelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    jitter: Duration,
}

impl Default for RetryPolicy {
    /// Three attempts, two seconds apart.
    fn default() -> Self {
        Self::new(3, Duration::from_secs(2))
    }
}

impl RetryPolicy {
    /// A policy making at most `max_attempts` calls (at least one).
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            jitter: Duration::ZERO,
        }
    }

    /// Add up to `jitter` of random extra wait to each delay.
    pub fn with_jitter(mut self, jitter: Duration) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn next_delay(&self) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        if jitter_ms == 0 {
            return self.delay;
        }
        self.delay + Duration::from_millis(rng().random_range(0..=jitter_ms))
    }

    /// Run `op` under this policy.
    ///
    /// `op` receives the 1-based attempt number. `retryable` decides whether
    /// a failure is worth another attempt. The last failure is returned once
    /// the budget is spent.
    pub async fn run<T, E, F, Fut, P>(
        &self,
        cancel: &CancellationToken,
        retryable: P,
        mut op: F,
    ) -> Result<T, E>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        P: Fn(&E) -> bool,
        E: From<Cancelled> + fmt::Display,
    {
        let total_t0 = Instant::now();
        let mut attempt = 0u32;

        loop {
            if cancel.is_cancelled() {
                return Err(Cancelled.into());
            }
            attempt += 1;

            let e = match op(attempt).await {
                Ok(value) => {
                    debug!(attempt, "attempt succeeded");
                    return Ok(value);
                }
                Err(e) => e,
            };

            if attempt >= self.max_attempts || !retryable(&e) {
                warn!(
                    attempt,
                    max = self.max_attempts,
                    elapsed_ms_total = total_t0.elapsed().as_millis() as u64,
                    error = %e,
                    "giving up"
                );
                return Err(e);
            }

            let delay = self.next_delay();
            warn!(
                attempt,
                max = self.max_attempts,
                ?delay,
                error = %e,
                "attempt failed; retrying"
            );
            tokio::select! {
                _ = sleep(delay) => {}
                _ = cancel.cancelled() => return Err(Cancelled.into()),
            }
        }
    }
}
