//! Bounded polling against asynchronous upstream jobs.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How one poll attempt should be treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    /// Terminal: stop polling and hand the value back.
    Ready,
    /// Still running. The upstream may ask for a longer wait than the policy's backoff.
    Pending { backoff_hint: Option<Duration> },
}

/// Whether the first check waits for the backoff or runs immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FirstAttempt {
    Delayed,
    Immediate,
}

/// Fixed-backoff retry budget.
///
/// At most `max_attempts` checks run, so the worst-case wait is
/// `backoff * max_attempts`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundedRetry {
    backoff: Duration,
    max_attempts: u32,
    first_attempt: FirstAttempt,
}

/// Result of a [`BoundedRetry::poll`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome<T> {
    Ready { value: T, attempts: u32 },
    /// Budget spent while still pending; holds the last observed value, if any.
    Exhausted { last: Option<T>, attempts: u32 },
    Cancelled { attempts: u32 },
}

impl BoundedRetry {
    pub fn new(backoff: Duration, max_attempts: u32) -> Self {
        Self {
            backoff,
            max_attempts,
            first_attempt: FirstAttempt::Delayed,
        }
    }

    pub fn first_attempt(mut self, first_attempt: FirstAttempt) -> Self {
        self.first_attempt = first_attempt;
        self
    }

    pub fn backoff(&self) -> Duration {
        self.backoff
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn worst_case_wait(&self) -> Duration {
        self.backoff.saturating_mul(self.max_attempts)
    }

    /// Run `check` until `classify` reports [`PollStep::Ready`] or the budget is spent.
    pub async fn poll<T, F, Fut, C>(&self, check: F, classify: C) -> PollOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = T>,
        C: Fn(&T) -> PollStep,
    {
        self.poll_until_cancelled(&CancellationToken::new(), check, classify)
            .await
    }

    /// Like [`BoundedRetry::poll`], stopping early once `cancel` fires.
    pub async fn poll_until_cancelled<T, F, Fut, C>(
        &self,
        cancel: &CancellationToken,
        mut check: F,
        classify: C,
    ) -> PollOutcome<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = T>,
        C: Fn(&T) -> PollStep,
    {
        let mut attempts = 0;
        let mut last = None;
        let mut wait = match self.first_attempt {
            FirstAttempt::Delayed => Some(self.backoff),
            FirstAttempt::Immediate => None,
        };

        while attempts < self.max_attempts {
            if let Some(delay) = wait {
                debug!(
                    attempt = attempts + 1,
                    delay_ms = delay.as_millis() as u64,
                    "waiting before next poll"
                );
                tokio::select! {
                    _ = cancel.cancelled() => return PollOutcome::Cancelled { attempts },
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            if cancel.is_cancelled() {
                return PollOutcome::Cancelled { attempts };
            }

            let value = check().await;
            attempts += 1;

            match classify(&value) {
                PollStep::Ready => return PollOutcome::Ready { value, attempts },
                PollStep::Pending { backoff_hint } => {
                    let hinted = backoff_hint.unwrap_or_default();
                    wait = Some(hinted.max(self.backoff));
                    last = Some(value);
                }
            }
        }

        PollOutcome::Exhausted { last, attempts }
    }
}
