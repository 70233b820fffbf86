//! Generic poll-until-state primitive with backoff.
//!
//! Long-running provider operations (snapshot creation in particular) are
//! asynchronous on the provider side: a create call returns immediately and
//! the resource moves through intermediate states until it reaches a terminal
//! one. [`StateWaiter`] drives that protocol: it repeatedly invokes a refresh
//! closure, sleeps between polls, observes cancellation, and enforces an
//! upper bound on total wait time.

use crate::cancellation::CancellationToken;
use crate::ec2::Ec2Error;
use rand::Rng;
use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Environment variable overriding the delay between polls, in seconds.
pub const POLL_DELAY_ENV: &str = "SNAPFLOW_POLL_DELAY_SECONDS";

/// Environment variable overriding the total wait cap, in seconds.
pub const MAX_WAIT_ENV: &str = "SNAPFLOW_MAX_WAIT_SECONDS";

const DEFAULT_POLL_DELAY: Duration = Duration::from_secs(2);
const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(600);

/// Backoff strategy for the delay between polls.
#[derive(Debug, Clone, Copy)]
pub enum BackoffStrategy {
    /// Constant delay between polls.
    Constant(Duration),
    /// Linear increase: delay * attempt.
    Linear(Duration),
    /// Exponential: delay * 2^attempt.
    Exponential(Duration),
}

impl BackoffStrategy {
    /// Calculates the delay for a given attempt (1-indexed).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Constant(d) => *d,
            Self::Linear(d) => *d * attempt,
            Self::Exponential(d) => *d * 2u32.pow(attempt.saturating_sub(1).min(16)),
        }
    }
}

/// Jitter strategy for adding randomness to poll delays.
#[derive(Debug, Clone, Copy)]
pub enum JitterStrategy {
    /// No jitter.
    None,
    /// Full jitter: [0, delay].
    Full,
    /// Equal jitter: [delay/2, delay].
    Equal,
}

impl JitterStrategy {
    /// Applies jitter to a delay.
    #[must_use]
    pub fn apply(&self, delay: Duration) -> Duration {
        let mut rng = rand::thread_rng();

        match self {
            Self::None => delay,
            Self::Full => {
                let millis = delay.as_millis() as u64;
                Duration::from_millis(rng.gen_range(0..=millis))
            }
            Self::Equal => {
                let millis = delay.as_millis() as u64;
                let half = millis / 2;
                Duration::from_millis(half + rng.gen_range(0..=half))
            }
        }
    }
}

/// Error produced by a wait.
#[derive(Debug, Error)]
pub enum WaitError {
    /// A status query failed or returned no matching record.
    #[error("status query failed: {0}")]
    Refresh(#[from] Ec2Error),

    /// The resource reached a state that is neither pending nor the target.
    #[error("unexpected state '{state}'")]
    UnexpectedState {
        /// The state the resource reported.
        state: String,
    },

    /// The total wait cap was exceeded before the target state was reached.
    #[error("timed out after {}s waiting for target state", waited.as_secs())]
    TimedOut {
        /// How long the waiter polled before giving up.
        waited: Duration,
    },

    /// Cancellation was requested while waiting.
    #[error("wait cancelled: {reason}")]
    Cancelled {
        /// The cancellation reason.
        reason: String,
    },
}

/// Drives one asynchronous provider operation to its terminal state.
///
/// The waiter owns the polling policy (interval, backoff, total cap); the
/// caller supplies a refresh closure that performs one status query and
/// a cancellation token that is checked before every query.
#[derive(Debug, Clone)]
pub struct StateWaiter {
    pending: Vec<String>,
    target: String,
    backoff: BackoffStrategy,
    jitter: JitterStrategy,
    max_wait: Duration,
}

impl StateWaiter {
    /// Creates a waiter with the default polling policy (2s constant delay,
    /// 10 minute cap).
    #[must_use]
    pub fn new(pending: Vec<String>, target: impl Into<String>) -> Self {
        Self {
            pending,
            target: target.into(),
            backoff: BackoffStrategy::Constant(DEFAULT_POLL_DELAY),
            jitter: JitterStrategy::None,
            max_wait: DEFAULT_MAX_WAIT,
        }
    }

    /// Creates a waiter honoring the `SNAPFLOW_POLL_DELAY_SECONDS` and
    /// `SNAPFLOW_MAX_WAIT_SECONDS` environment overrides.
    ///
    /// Unparsable values are reported and ignored.
    #[must_use]
    pub fn from_env(pending: Vec<String>, target: impl Into<String>) -> Self {
        let mut waiter = Self::new(pending, target);

        if let Some(delay) = read_env_seconds(POLL_DELAY_ENV) {
            waiter.backoff = BackoffStrategy::Constant(delay);
        }
        if let Some(max_wait) = read_env_seconds(MAX_WAIT_ENV) {
            waiter.max_wait = max_wait;
        }

        waiter
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, backoff: BackoffStrategy) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, jitter: JitterStrategy) -> Self {
        self.jitter = jitter;
        self
    }

    /// Sets the cap on total wait time.
    #[must_use]
    pub fn with_max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Polls `refresh` until the target state is reached.
    ///
    /// One refresh call performs one status query and returns the refreshed
    /// value together with its current state string. The loop:
    ///
    /// - checks the cancellation token before every query and unwinds
    ///   promptly when it fires;
    /// - treats a refresh error as immediately fatal;
    /// - returns the refreshed value once the target state is reached;
    /// - fails on a state that is neither pending nor the target;
    /// - fails once total elapsed time exceeds the cap.
    pub async fn wait_for_state<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut refresh: F,
    ) -> Result<T, WaitError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<(T, String), Ec2Error>>,
    {
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(WaitError::Cancelled {
                    reason: cancel
                        .reason()
                        .unwrap_or_else(|| "cancellation requested".to_string()),
                });
            }

            let waited = started.elapsed();
            if waited > self.max_wait {
                return Err(WaitError::TimedOut { waited });
            }

            attempt += 1;
            let (value, state) = refresh().await?;

            if state == self.target {
                debug!(target_state = %self.target, attempt, "wait complete");
                return Ok(value);
            }

            if !self.pending.iter().any(|p| *p == state) {
                return Err(WaitError::UnexpectedState { state });
            }

            debug!(current_state = %state, attempt, "still waiting");
            tokio::time::sleep(self.jitter.apply(self.backoff.delay(attempt))).await;
        }
    }
}

fn read_env_seconds(var: &str) -> Option<Duration> {
    let raw = std::env::var(var).ok()?;
    match raw.parse::<u64>() {
        Ok(secs) => Some(Duration::from_secs(secs)),
        Err(_) => {
            warn!(var, value = %raw, "ignoring unparsable duration override");
            None
        }
    }
}
